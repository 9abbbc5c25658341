//! Catalog records and the JSON views built from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Strongest tobacco rating
pub const MAX_STRENGTH: u8 = 10;

/// Heat resistance and smokiness grade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    #[default]
    #[serde(rename = "-")]
    Unrated,
    Low,
    Middle,
    High,
}

/// Dominant taste of a mix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TasteType {
    #[default]
    #[serde(rename = "-")]
    Unspecified,
    Fruit,
    Gastro,
    Sweet,
    Grass,
    Fresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manufacturer {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tobacco {
    pub id: Uuid,
    pub manufacturer_id: Uuid,
    pub taste: String,
    pub description: String,
    pub image: Option<String>,
    pub strength: u8,
    pub resistance: Grade,
    pub smokiness: Grade,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bowl {
    pub id: Uuid,
    pub kind: String,
    pub description: String,
    pub how_to: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasteCategory {
    pub id: Uuid,
    pub name: String,
}

/// Share of one tobacco in a mix, in percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixPortion {
    #[serde(rename = "tobacco")]
    pub tobacco_id: Uuid,
    pub weight: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mix {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub banner: Option<String>,
    pub created: DateTime<Utc>,
    pub taste_type: TasteType,
    pub categories: Vec<Uuid>,
    pub goods: Vec<MixPortion>,
    pub bowl_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
}

// Views

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturerView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image: Option<String>,
}

impl From<&Manufacturer> for ManufacturerView {
    fn from(m: &Manufacturer) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
            description: m.description.clone(),
            image: m.image.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TobaccoParams {
    pub strength: u8,
    pub resistance: Grade,
    pub smokiness: Grade,
}

/// Tobacco as listed; the detail view also carries `description`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TobaccoView {
    pub id: Uuid,
    pub taste: String,
    pub image: Option<String>,
    /// Manufacturer name
    pub manufacturer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub params: TobaccoParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BowlView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub how_to: String,
    pub image: Option<String>,
}

impl From<&Bowl> for BowlView {
    fn from(b: &Bowl) -> Self {
        Self {
            id: b.id,
            kind: b.kind.clone(),
            description: b.description.clone(),
            how_to: b.how_to.clone(),
            image: b.image.clone(),
        }
    }
}

/// Tobacco line inside a mix view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixGood {
    pub id: Uuid,
    pub taste: String,
    pub manufacturer: String,
    pub image: Option<String>,
    pub weight: u8,
}

/// Bowl summary inside a mix view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixBowl {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub banner: Option<String>,
    pub created: DateTime<Utc>,
    pub taste_type: TasteType,
    pub likes_count: u64,
    /// Whether the caller liked this mix; false for anonymous callers
    pub is_liked: bool,
    pub is_favorited: bool,
    pub categories: Vec<TasteCategory>,
    pub goods: Vec<MixGood>,
    pub bowl: Option<MixBowl>,
    pub author: Option<Uuid>,
}

/// Result of a like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: u64,
}

/// Body of a successful delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    pub id: Uuid,
    pub deleted: bool,
}

impl Deleted {
    pub fn new(id: Uuid) -> Self {
        Self { id, deleted: true }
    }
}

/// Result of a favorite toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteState {
    pub favorited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturerOption {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BowlOption {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Choices offered by the mix builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionOptions {
    pub manufacturers: Vec<ManufacturerOption>,
    pub bowls: Vec<BowlOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TobaccoOption {
    pub id: Uuid,
    pub taste: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grade_wire_names() {
        assert_eq!(serde_json::to_value(Grade::Unrated).unwrap(), json!("-"));
        assert_eq!(serde_json::to_value(Grade::Middle).unwrap(), json!("middle"));
        let parsed: Grade = serde_json::from_value(json!("high")).unwrap();
        assert_eq!(parsed, Grade::High);
    }

    #[test]
    fn test_taste_type_wire_names() {
        assert_eq!(serde_json::to_value(TasteType::default()).unwrap(), json!("-"));
        let parsed: TasteType = serde_json::from_value(json!("gastro")).unwrap();
        assert_eq!(parsed, TasteType::Gastro);
        assert!(serde_json::from_value::<TasteType>(json!("salty")).is_err());
    }

    #[test]
    fn test_tobacco_list_view_omits_description() {
        let view = TobaccoView {
            id: Uuid::nil(),
            taste: "Mango".into(),
            image: None,
            manufacturer: "Darkside".into(),
            description: None,
            params: TobaccoParams {
                strength: 7,
                resistance: Grade::High,
                smokiness: Grade::Unrated,
            },
        };
        let value = serde_json::to_value(&view).unwrap();
        assert!(value.get("description").is_none());
        assert_eq!(value["params"], json!({"strength": 7, "resistance": "high", "smokiness": "-"}));
    }

    #[test]
    fn test_bowl_view_uses_type_key() {
        let view = BowlOption {
            id: Uuid::nil(),
            kind: "Phunnel".into(),
        };
        assert_eq!(serde_json::to_value(&view).unwrap()["type"], "Phunnel");
    }
}
