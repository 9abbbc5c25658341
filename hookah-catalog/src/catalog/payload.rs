//! Create, replace and patch payloads and their field checks
//!
//! Shape checks live here. A patch is merged onto the current record first,
//! so the merged payload goes through the same checks as a create. Checks
//! that need the store (referenced rows exist, names are unique) are added
//! by [`CatalogStore`](super::CatalogStore) into the same [`FieldErrors`]
//! before anything is written.

use serde::Deserialize;
use uuid::Uuid;

use super::model::{Grade, MixPortion, TasteType, MAX_STRENGTH};
use crate::error::{Error, Result};
use crate::error::FieldErrors;

/// Longest accepted name or taste
pub const MAX_NAME_CHARS: usize = 200;

/// Fewest taste categories a mix may have
pub const MIN_MIX_CATEGORIES: usize = 2;

/// Upper bound for a single portion and for the whole mix, in percent
pub const MAX_MIX_WEIGHT: u32 = 100;

const BLANK: &str = "This field may not be blank.";

fn check_name(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, BLANK);
    } else if value.chars().count() > MAX_NAME_CHARS {
        errors.add(
            field,
            format!("Ensure this field has no more than {MAX_NAME_CHARS} characters."),
        );
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewManufacturer {
    pub name: String,
    pub description: String,
    pub image: Option<String>,
}

impl NewManufacturer {
    pub fn check(&self, errors: &mut FieldErrors) {
        check_name(errors, "name", &self.name);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewTobacco {
    pub manufacturer: Option<Uuid>,
    pub taste: String,
    pub description: String,
    pub image: Option<String>,
    /// Wider than the stored `u8` so out-of-range input reaches [`check`](Self::check)
    pub strength: i64,
    pub resistance: Grade,
    pub smokiness: Grade,
}

impl NewTobacco {
    pub fn check(&self, errors: &mut FieldErrors) {
        check_name(errors, "taste", &self.taste);
        if self.manufacturer.is_none() {
            errors.add("manufacturer", "This field is required.");
        }
        if !(0..=i64::from(MAX_STRENGTH)).contains(&self.strength) {
            errors.add(
                "strength",
                format!("Ensure this value is between 0 and {MAX_STRENGTH}."),
            );
        }
    }

    /// Strength as stored; only valid after a clean [`check`](Self::check)
    pub(crate) fn stored_strength(&self) -> Result<u8> {
        u8::try_from(self.strength)
            .ok()
            .filter(|s| *s <= MAX_STRENGTH)
            .ok_or_else(|| field_error("strength", "Strength is out of range."))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewBowl {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub how_to: String,
    pub image: Option<String>,
}

impl NewBowl {
    pub fn check(&self, errors: &mut FieldErrors) {
        check_name(errors, "type", &self.kind);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewTasteCategory {
    pub name: String,
}

impl NewTasteCategory {
    pub fn check(&self, errors: &mut FieldErrors) {
        check_name(errors, "name", &self.name);
    }
}

/// One tobacco of a new mix, in percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NewPortion {
    pub tobacco: Uuid,
    pub weight: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewMix {
    pub name: String,
    pub description: String,
    pub banner: Option<String>,
    pub taste_type: TasteType,
    pub categories: Vec<Uuid>,
    pub goods: Vec<NewPortion>,
    pub bowl: Option<Uuid>,
}

impl NewMix {
    pub fn check(&self, errors: &mut FieldErrors) {
        check_name(errors, "name", &self.name);

        let mut categories = self.categories.clone();
        categories.sort_unstable();
        categories.dedup();
        if categories.len() != self.categories.len() {
            errors.add("categories", "Taste categories must not repeat.");
        }
        if categories.len() < MIN_MIX_CATEGORIES {
            errors.add(
                "categories",
                format!("Select at least {MIN_MIX_CATEGORIES} taste categories."),
            );
        }

        let mut tobaccos: Vec<Uuid> = self.goods.iter().map(|g| g.tobacco).collect();
        tobaccos.sort_unstable();
        tobaccos.dedup();
        if tobaccos.len() != self.goods.len() {
            errors.add("goods", "Each tobacco may appear only once.");
        }
        if self
            .goods
            .iter()
            .any(|g| !(1..=i64::from(MAX_MIX_WEIGHT)).contains(&g.weight))
        {
            errors.add(
                "goods",
                format!("Each weight must be between 1 and {MAX_MIX_WEIGHT}."),
            );
        }
        let total: i64 = self.goods.iter().map(|g| g.weight.max(0)).sum();
        if total > i64::from(MAX_MIX_WEIGHT) {
            errors.add(
                "goods",
                format!("Weights add up to {total}%, the maximum is {MAX_MIX_WEIGHT}%."),
            );
        }
    }

    /// Portions as stored; only valid after a clean [`check`](Self::check)
    pub(crate) fn portions(&self) -> Result<Vec<MixPortion>> {
        self.goods
            .iter()
            .map(|g| {
                let weight = u8::try_from(g.weight)
                    .map_err(|_| field_error("goods", "Weight is out of range."))?;
                Ok(MixPortion {
                    tobacco_id: g.tobacco,
                    weight,
                })
            })
            .collect()
    }
}

fn field_error(field: &str, message: &str) -> Error {
    let mut errors = FieldErrors::new();
    errors.add(field, message);
    Error::Validation(errors)
}

// Partial updates. Absent fields keep their current value.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ManufacturerPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl ManufacturerPatch {
    pub fn apply(self, current: NewManufacturer) -> NewManufacturer {
        NewManufacturer {
            name: self.name.unwrap_or(current.name),
            description: self.description.unwrap_or(current.description),
            image: self.image.or(current.image),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TobaccoPatch {
    pub manufacturer: Option<Uuid>,
    pub taste: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub strength: Option<i64>,
    pub resistance: Option<Grade>,
    pub smokiness: Option<Grade>,
}

impl TobaccoPatch {
    pub fn apply(self, current: NewTobacco) -> NewTobacco {
        NewTobacco {
            manufacturer: self.manufacturer.or(current.manufacturer),
            taste: self.taste.unwrap_or(current.taste),
            description: self.description.unwrap_or(current.description),
            image: self.image.or(current.image),
            strength: self.strength.unwrap_or(current.strength),
            resistance: self.resistance.unwrap_or(current.resistance),
            smokiness: self.smokiness.unwrap_or(current.smokiness),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BowlPatch {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    pub how_to: Option<String>,
    pub image: Option<String>,
}

impl BowlPatch {
    pub fn apply(self, current: NewBowl) -> NewBowl {
        NewBowl {
            kind: self.kind.unwrap_or(current.kind),
            description: self.description.unwrap_or(current.description),
            how_to: self.how_to.unwrap_or(current.how_to),
            image: self.image.or(current.image),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TasteCategoryPatch {
    pub name: Option<String>,
}

impl TasteCategoryPatch {
    pub fn apply(self, current: NewTasteCategory) -> NewTasteCategory {
        NewTasteCategory {
            name: self.name.unwrap_or(current.name),
        }
    }
}
