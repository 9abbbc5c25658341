//! In-memory catalog storage
//!
//! All tables live behind one [`tokio::sync::RwLock`]. A listing holds a
//! read guard plus the ordered ids of its rows, so the count and every page
//! taken from it agree, and views are built only for the rows a page
//! returns.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use uuid::Uuid;

use super::model::{
    Bowl, BowlOption, BowlView, Deleted, FavoriteState, Grade, LikeState, Manufacturer,
    ManufacturerOption, ManufacturerView, Mix, MixBowl, MixGood, MixView, SelectionOptions,
    TasteCategory, TasteType, Tobacco, TobaccoOption, TobaccoParams, TobaccoView,
};
use super::payload::{
    BowlPatch, ManufacturerPatch, NewBowl, NewManufacturer, NewMix, NewPortion,
    NewTasteCategory, NewTobacco, TasteCategoryPatch, TobaccoPatch,
};
use crate::error::{Error, FieldErrors, Result};
use crate::pagination::PageSource;

#[derive(Debug, Default)]
struct Tables {
    manufacturers: HashMap<Uuid, Manufacturer>,
    tobaccos: HashMap<Uuid, Tobacco>,
    bowls: HashMap<Uuid, Bowl>,
    categories: HashMap<Uuid, TasteCategory>,
    mixes: HashMap<Uuid, Mix>,
    /// mix id to the users who liked it
    likes: HashMap<Uuid, HashSet<Uuid>>,
    /// mix id to the users who favorited it
    favorites: HashMap<Uuid, HashSet<Uuid>>,
}

impl Tables {
    fn manufacturer_name(&self, id: &Uuid) -> String {
        self.manufacturers
            .get(id)
            .map(|m| m.name.clone())
            .unwrap_or_default()
    }

    fn tobacco_view(&self, tobacco: &Tobacco, detailed: bool) -> TobaccoView {
        TobaccoView {
            id: tobacco.id,
            taste: tobacco.taste.clone(),
            image: tobacco.image.clone(),
            manufacturer: self.manufacturer_name(&tobacco.manufacturer_id),
            description: detailed.then(|| tobacco.description.clone()),
            params: TobaccoParams {
                strength: tobacco.strength,
                resistance: tobacco.resistance,
                smokiness: tobacco.smokiness,
            },
        }
    }

    fn likes_count(&self, mix_id: &Uuid) -> u64 {
        self.likes.get(mix_id).map_or(0, |users| users.len() as u64)
    }

    fn mix_view(&self, mix: &Mix, viewer: Option<Uuid>) -> MixView {
        let marked = |table: &HashMap<Uuid, HashSet<Uuid>>| {
            viewer.is_some_and(|user| table.get(&mix.id).is_some_and(|users| users.contains(&user)))
        };

        MixView {
            id: mix.id,
            name: mix.name.clone(),
            description: mix.description.clone(),
            banner: mix.banner.clone(),
            created: mix.created,
            taste_type: mix.taste_type,
            likes_count: self.likes_count(&mix.id),
            is_liked: marked(&self.likes),
            is_favorited: marked(&self.favorites),
            categories: mix
                .categories
                .iter()
                .filter_map(|id| self.categories.get(id).cloned())
                .collect(),
            goods: mix
                .goods
                .iter()
                .filter_map(|portion| {
                    self.tobaccos.get(&portion.tobacco_id).map(|t| MixGood {
                        id: t.id,
                        taste: t.taste.clone(),
                        manufacturer: self.manufacturer_name(&t.manufacturer_id),
                        image: t.image.clone(),
                        weight: portion.weight,
                    })
                })
                .collect(),
            bowl: mix
                .bowl_id
                .and_then(|id| self.bowls.get(&id))
                .map(|b| MixBowl {
                    id: b.id,
                    kind: b.kind.clone(),
                    description: b.description.clone(),
                    image: b.image.clone(),
                }),
            author: mix.author_id,
        }
    }

    fn mix(&self, id: Uuid) -> Result<&Mix> {
        self.mixes.get(&id).ok_or_else(|| Error::not_found("Mix", id))
    }

    // Orderings

    fn manufacturer_ids(&self) -> Vec<Uuid> {
        let mut rows: Vec<&Manufacturer> = self.manufacturers.values().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        rows.into_iter().map(|m| m.id).collect()
    }

    /// Tobaccos in creation order that pass `keep`
    fn tobacco_ids(&self, keep: impl Fn(&Tobacco) -> bool) -> Vec<Uuid> {
        let mut rows: Vec<&Tobacco> = self.tobaccos.values().filter(|t| keep(t)).collect();
        rows.sort_by_key(|t| (t.created, t.id));
        rows.into_iter().map(|t| t.id).collect()
    }

    fn bowl_ids(&self) -> Vec<Uuid> {
        let mut rows: Vec<&Bowl> = self.bowls.values().collect();
        rows.sort_by(|a, b| a.kind.cmp(&b.kind).then(a.id.cmp(&b.id)));
        rows.into_iter().map(|b| b.id).collect()
    }

    fn category_ids(&self) -> Vec<Uuid> {
        let mut rows: Vec<&TasteCategory> = self.categories.values().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        rows.into_iter().map(|c| c.id).collect()
    }

    fn mix_ids(&self) -> Vec<Uuid> {
        let mut rows: Vec<&Mix> = self.mixes.values().collect();
        rows.sort_by_key(|m| (m.created, m.id));
        rows.into_iter().map(|m| m.id).collect()
    }

    // Writes shared by create, replace and patch

    fn check_tobacco(&self, new: &NewTobacco) -> Result<(Uuid, u8)> {
        let mut errors = FieldErrors::new();
        new.check(&mut errors);
        if let Some(id) = new.manufacturer {
            if !self.manufacturers.contains_key(&id) {
                errors.add("manufacturer", format!("Manufacturer {id} does not exist."));
            }
        }
        errors.into_result()?;
        let manufacturer_id = new
            .manufacturer
            .ok_or_else(|| Error::BadRequest("manufacturer is required".into()))?;
        Ok((manufacturer_id, new.stored_strength()?))
    }

    /// Trimmed category name, unless another category (not `except`) has it
    fn check_category(&self, new: &NewTasteCategory, except: Option<Uuid>) -> Result<String> {
        let mut errors = FieldErrors::new();
        new.check(&mut errors);
        errors.into_result()?;

        let name = new.name.trim().to_owned();
        let folded = name.to_lowercase();
        if self
            .categories
            .values()
            .any(|c| Some(c.id) != except && c.name.to_lowercase() == folded)
        {
            return Err(Error::Conflict(format!(
                "Taste category '{name}' already exists"
            )));
        }
        Ok(name)
    }

    fn replace_manufacturer(&mut self, id: Uuid, new: NewManufacturer) -> Result<ManufacturerView> {
        let mut errors = FieldErrors::new();
        new.check(&mut errors);
        let manufacturer = self
            .manufacturers
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Manufacturer", id))?;
        errors.into_result()?;

        manufacturer.name = new.name.trim().to_owned();
        manufacturer.description = new.description;
        manufacturer.image = new.image;
        Ok(ManufacturerView::from(&*manufacturer))
    }

    fn replace_tobacco(&mut self, id: Uuid, new: NewTobacco) -> Result<TobaccoView> {
        if !self.tobaccos.contains_key(&id) {
            return Err(Error::not_found("Tobacco", id));
        }
        let (manufacturer_id, strength) = self.check_tobacco(&new)?;
        let tobacco = self
            .tobaccos
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Tobacco", id))?;

        tobacco.manufacturer_id = manufacturer_id;
        tobacco.taste = new.taste.trim().to_owned();
        tobacco.description = new.description;
        tobacco.image = new.image;
        tobacco.strength = strength;
        tobacco.resistance = new.resistance;
        tobacco.smokiness = new.smokiness;
        let tobacco = tobacco.clone();
        Ok(self.tobacco_view(&tobacco, true))
    }

    fn replace_bowl(&mut self, id: Uuid, new: NewBowl) -> Result<BowlView> {
        let mut errors = FieldErrors::new();
        new.check(&mut errors);
        let bowl = self
            .bowls
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Bowl", id))?;
        errors.into_result()?;

        bowl.kind = new.kind.trim().to_owned();
        bowl.description = new.description;
        bowl.how_to = new.how_to;
        bowl.image = new.image;
        Ok(BowlView::from(&*bowl))
    }

    fn replace_category(&mut self, id: Uuid, new: NewTasteCategory) -> Result<TasteCategory> {
        if !self.categories.contains_key(&id) {
            return Err(Error::not_found("Taste category", id));
        }
        let name = self.check_category(&new, Some(id))?;
        let category = self
            .categories
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Taste category", id))?;
        category.name = name;
        Ok(category.clone())
    }

    /// Drop mix portions that point at removed tobaccos
    fn drop_portions(&mut self, removed: &HashSet<Uuid>) {
        for mix in self.mixes.values_mut() {
            mix.goods.retain(|portion| !removed.contains(&portion.tobacco_id));
        }
    }
}

impl From<&Manufacturer> for NewManufacturer {
    fn from(m: &Manufacturer) -> Self {
        Self {
            name: m.name.clone(),
            description: m.description.clone(),
            image: m.image.clone(),
        }
    }
}

impl From<&Tobacco> for NewTobacco {
    fn from(t: &Tobacco) -> Self {
        Self {
            manufacturer: Some(t.manufacturer_id),
            taste: t.taste.clone(),
            description: t.description.clone(),
            image: t.image.clone(),
            strength: i64::from(t.strength),
            resistance: t.resistance,
            smokiness: t.smokiness,
        }
    }
}

impl From<&Bowl> for NewBowl {
    fn from(b: &Bowl) -> Self {
        Self {
            kind: b.kind.clone(),
            description: b.description.clone(),
            how_to: b.how_to.clone(),
            image: b.image.clone(),
        }
    }
}

impl From<&TasteCategory> for NewTasteCategory {
    fn from(c: &TasteCategory) -> Self {
        Self {
            name: c.name.clone(),
        }
    }
}

fn matches_search(tobacco: &Tobacco, needle: &str) -> bool {
    tobacco.taste.to_lowercase().contains(needle)
        || tobacco.description.to_lowercase().contains(needle)
}

/// Flip `user` in the set for `mix_id`; true when the mark was added
fn toggle(table: &mut HashMap<Uuid, HashSet<Uuid>>, mix_id: Uuid, user: Uuid) -> bool {
    let users = table.entry(mix_id).or_default();
    if users.remove(&user) {
        if users.is_empty() {
            table.remove(&mix_id);
        }
        false
    } else {
        users.insert(user);
        true
    }
}

// Row renderers for listings

fn render_manufacturer(tables: &Tables, id: &Uuid, _: Option<Uuid>) -> Option<ManufacturerView> {
    tables.manufacturers.get(id).map(ManufacturerView::from)
}

fn render_tobacco(tables: &Tables, id: &Uuid, _: Option<Uuid>) -> Option<TobaccoView> {
    tables.tobaccos.get(id).map(|t| tables.tobacco_view(t, false))
}

fn render_tobacco_option(tables: &Tables, id: &Uuid, _: Option<Uuid>) -> Option<TobaccoOption> {
    tables.tobaccos.get(id).map(|t| TobaccoOption {
        id: t.id,
        taste: t.taste.clone(),
    })
}

fn render_bowl(tables: &Tables, id: &Uuid, _: Option<Uuid>) -> Option<BowlView> {
    tables.bowls.get(id).map(BowlView::from)
}

fn render_category(tables: &Tables, id: &Uuid, _: Option<Uuid>) -> Option<TasteCategory> {
    tables.categories.get(id).cloned()
}

fn render_mix(tables: &Tables, id: &Uuid, viewer: Option<Uuid>) -> Option<MixView> {
    tables.mixes.get(id).map(|m| tables.mix_view(m, viewer))
}

type Render<V> = fn(&Tables, &Uuid, Option<Uuid>) -> Option<V>;

/// Ordered rows of one list query.
///
/// Holds the store's read lock until dropped. Views are rendered on demand,
/// so paging through it builds only the rows of the requested page.
pub struct Listing<V> {
    tables: OwnedRwLockReadGuard<Tables>,
    ids: Vec<Uuid>,
    viewer: Option<Uuid>,
    render: Render<V>,
}

impl<V> Listing<V> {
    fn new(
        tables: OwnedRwLockReadGuard<Tables>,
        ids: Vec<Uuid>,
        viewer: Option<Uuid>,
        render: Render<V>,
    ) -> Self {
        Self {
            tables,
            ids,
            viewer,
            render,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Render every row
    pub fn to_vec(&self) -> Vec<V> {
        self.render_all(&self.ids)
    }

    fn render_all(&self, ids: &[Uuid]) -> Vec<V> {
        ids.iter()
            .filter_map(|id| (self.render)(&self.tables, id, self.viewer))
            .collect()
    }
}

impl<V> std::fmt::Debug for Listing<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listing")
            .field("rows", &self.ids.len())
            .field("viewer", &self.viewer)
            .finish_non_exhaustive()
    }
}

impl<V: Send> PageSource for Listing<V> {
    type Item = V;

    async fn count(&self) -> Result<u64> {
        Ok(self.ids.len() as u64)
    }

    async fn fetch_range(&self, offset: u64, limit: u64) -> Result<Vec<V>> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(self.ids.len());
        let end = start
            .saturating_add(usize::try_from(limit).unwrap_or(usize::MAX))
            .min(self.ids.len());
        Ok(self.render_all(&self.ids[start..end]))
    }
}

/// Shared handle to the catalog tables
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    tables: Arc<RwLock<Tables>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn snapshot(&self) -> OwnedRwLockReadGuard<Tables> {
        Arc::clone(&self.tables).read_owned().await
    }

    // Manufacturers

    pub async fn manufacturers(&self) -> Listing<ManufacturerView> {
        let tables = self.snapshot().await;
        let ids = tables.manufacturer_ids();
        Listing::new(tables, ids, None, render_manufacturer)
    }

    pub async fn manufacturer(&self, id: Uuid) -> Result<ManufacturerView> {
        let tables = self.tables.read().await;
        tables
            .manufacturers
            .get(&id)
            .map(ManufacturerView::from)
            .ok_or_else(|| Error::not_found("Manufacturer", id))
    }

    pub async fn create_manufacturer(&self, new: NewManufacturer) -> Result<ManufacturerView> {
        let mut errors = FieldErrors::new();
        new.check(&mut errors);
        errors.into_result()?;

        let manufacturer = Manufacturer {
            id: Uuid::now_v7(),
            name: new.name.trim().to_owned(),
            description: new.description,
            image: new.image,
        };
        let view = ManufacturerView::from(&manufacturer);
        self.tables
            .write()
            .await
            .manufacturers
            .insert(manufacturer.id, manufacturer);
        tracing::info!(manufacturer_id = %view.id, "manufacturer created");
        Ok(view)
    }

    pub async fn update_manufacturer(
        &self,
        id: Uuid,
        new: NewManufacturer,
    ) -> Result<ManufacturerView> {
        let view = self.tables.write().await.replace_manufacturer(id, new)?;
        tracing::info!(manufacturer_id = %id, "manufacturer updated");
        Ok(view)
    }

    pub async fn patch_manufacturer(
        &self,
        id: Uuid,
        patch: ManufacturerPatch,
    ) -> Result<ManufacturerView> {
        let mut tables = self.tables.write().await;
        let current = tables
            .manufacturers
            .get(&id)
            .map(NewManufacturer::from)
            .ok_or_else(|| Error::not_found("Manufacturer", id))?;
        let view = tables.replace_manufacturer(id, patch.apply(current))?;
        tracing::info!(manufacturer_id = %id, "manufacturer patched");
        Ok(view)
    }

    /// Remove a manufacturer with its tobaccos and their mix portions
    pub async fn delete_manufacturer(&self, id: Uuid) -> Result<Deleted> {
        let mut tables = self.tables.write().await;
        tables
            .manufacturers
            .remove(&id)
            .ok_or_else(|| Error::not_found("Manufacturer", id))?;

        let removed: HashSet<Uuid> = tables
            .tobaccos
            .values()
            .filter(|t| t.manufacturer_id == id)
            .map(|t| t.id)
            .collect();
        tables.tobaccos.retain(|tobacco_id, _| !removed.contains(tobacco_id));
        tables.drop_portions(&removed);

        tracing::info!(manufacturer_id = %id, tobaccos = removed.len(), "manufacturer deleted");
        Ok(Deleted::new(id))
    }

    // Tobaccos

    /// Tobaccos in creation order, optionally filtered by a case-insensitive
    /// substring of taste or description
    pub async fn tobaccos(&self, search: Option<&str>) -> Listing<TobaccoView> {
        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let tables = self.snapshot().await;
        let ids = tables.tobacco_ids(|t| {
            needle
                .as_deref()
                .map_or(true, |n| matches_search(t, n))
        });
        Listing::new(tables, ids, None, render_tobacco)
    }

    pub async fn tobacco(&self, id: Uuid) -> Result<TobaccoView> {
        let tables = self.tables.read().await;
        tables
            .tobaccos
            .get(&id)
            .map(|t| tables.tobacco_view(t, true))
            .ok_or_else(|| Error::not_found("Tobacco", id))
    }

    /// `{id, taste}` of one manufacturer's tobaccos; 404 for an unknown manufacturer
    pub async fn tobaccos_by_manufacturer(
        &self,
        manufacturer_id: Uuid,
    ) -> Result<Listing<TobaccoOption>> {
        let tables = self.snapshot().await;
        if !tables.manufacturers.contains_key(&manufacturer_id) {
            return Err(Error::not_found("Manufacturer", manufacturer_id));
        }
        let ids = tables.tobacco_ids(|t| t.manufacturer_id == manufacturer_id);
        Ok(Listing::new(tables, ids, None, render_tobacco_option))
    }

    pub async fn create_tobacco(&self, new: NewTobacco) -> Result<TobaccoView> {
        let mut tables = self.tables.write().await;
        let (manufacturer_id, strength) = tables.check_tobacco(&new)?;

        let tobacco = Tobacco {
            id: Uuid::now_v7(),
            manufacturer_id,
            taste: new.taste.trim().to_owned(),
            description: new.description,
            image: new.image,
            strength,
            resistance: new.resistance,
            smokiness: new.smokiness,
            created: Utc::now(),
        };
        let view = tables.tobacco_view(&tobacco, true);
        tables.tobaccos.insert(tobacco.id, tobacco);
        tracing::info!(tobacco_id = %view.id, "tobacco created");
        Ok(view)
    }

    pub async fn update_tobacco(&self, id: Uuid, new: NewTobacco) -> Result<TobaccoView> {
        let view = self.tables.write().await.replace_tobacco(id, new)?;
        tracing::info!(tobacco_id = %id, "tobacco updated");
        Ok(view)
    }

    pub async fn patch_tobacco(&self, id: Uuid, patch: TobaccoPatch) -> Result<TobaccoView> {
        let mut tables = self.tables.write().await;
        let current = tables
            .tobaccos
            .get(&id)
            .map(NewTobacco::from)
            .ok_or_else(|| Error::not_found("Tobacco", id))?;
        let view = tables.replace_tobacco(id, patch.apply(current))?;
        tracing::info!(tobacco_id = %id, "tobacco patched");
        Ok(view)
    }

    /// Remove a tobacco and its portions in mixes
    pub async fn delete_tobacco(&self, id: Uuid) -> Result<Deleted> {
        let mut tables = self.tables.write().await;
        tables
            .tobaccos
            .remove(&id)
            .ok_or_else(|| Error::not_found("Tobacco", id))?;
        tables.drop_portions(&HashSet::from([id]));
        tracing::info!(tobacco_id = %id, "tobacco deleted");
        Ok(Deleted::new(id))
    }

    // Bowls

    pub async fn bowls(&self) -> Listing<BowlView> {
        let tables = self.snapshot().await;
        let ids = tables.bowl_ids();
        Listing::new(tables, ids, None, render_bowl)
    }

    pub async fn bowl(&self, id: Uuid) -> Result<BowlView> {
        let tables = self.tables.read().await;
        tables
            .bowls
            .get(&id)
            .map(BowlView::from)
            .ok_or_else(|| Error::not_found("Bowl", id))
    }

    pub async fn create_bowl(&self, new: NewBowl) -> Result<BowlView> {
        let mut errors = FieldErrors::new();
        new.check(&mut errors);
        errors.into_result()?;

        let bowl = Bowl {
            id: Uuid::now_v7(),
            kind: new.kind.trim().to_owned(),
            description: new.description,
            how_to: new.how_to,
            image: new.image,
        };
        let view = BowlView::from(&bowl);
        self.tables.write().await.bowls.insert(bowl.id, bowl);
        tracing::info!(bowl_id = %view.id, "bowl created");
        Ok(view)
    }

    pub async fn update_bowl(&self, id: Uuid, new: NewBowl) -> Result<BowlView> {
        let view = self.tables.write().await.replace_bowl(id, new)?;
        tracing::info!(bowl_id = %id, "bowl updated");
        Ok(view)
    }

    pub async fn patch_bowl(&self, id: Uuid, patch: BowlPatch) -> Result<BowlView> {
        let mut tables = self.tables.write().await;
        let current = tables
            .bowls
            .get(&id)
            .map(NewBowl::from)
            .ok_or_else(|| Error::not_found("Bowl", id))?;
        let view = tables.replace_bowl(id, patch.apply(current))?;
        tracing::info!(bowl_id = %id, "bowl patched");
        Ok(view)
    }

    /// Remove a bowl; mixes that used it keep existing without a bowl
    pub async fn delete_bowl(&self, id: Uuid) -> Result<Deleted> {
        let mut tables = self.tables.write().await;
        tables
            .bowls
            .remove(&id)
            .ok_or_else(|| Error::not_found("Bowl", id))?;
        for mix in tables.mixes.values_mut() {
            if mix.bowl_id == Some(id) {
                mix.bowl_id = None;
            }
        }
        tracing::info!(bowl_id = %id, "bowl deleted");
        Ok(Deleted::new(id))
    }

    // Taste categories

    pub async fn taste_categories(&self) -> Listing<TasteCategory> {
        let tables = self.snapshot().await;
        let ids = tables.category_ids();
        Listing::new(tables, ids, None, render_category)
    }

    pub async fn taste_category(&self, id: Uuid) -> Result<TasteCategory> {
        let tables = self.tables.read().await;
        tables
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found("Taste category", id))
    }

    /// Names are unique ignoring case; a duplicate is a 409
    pub async fn create_taste_category(&self, new: NewTasteCategory) -> Result<TasteCategory> {
        let mut tables = self.tables.write().await;
        let name = tables.check_category(&new, None)?;

        let category = TasteCategory {
            id: Uuid::now_v7(),
            name,
        };
        tables.categories.insert(category.id, category.clone());
        tracing::info!(category_id = %category.id, "taste category created");
        Ok(category)
    }

    pub async fn update_taste_category(
        &self,
        id: Uuid,
        new: NewTasteCategory,
    ) -> Result<TasteCategory> {
        let category = self.tables.write().await.replace_category(id, new)?;
        tracing::info!(category_id = %id, "taste category updated");
        Ok(category)
    }

    pub async fn patch_taste_category(
        &self,
        id: Uuid,
        patch: TasteCategoryPatch,
    ) -> Result<TasteCategory> {
        let mut tables = self.tables.write().await;
        let current = tables
            .categories
            .get(&id)
            .map(NewTasteCategory::from)
            .ok_or_else(|| Error::not_found("Taste category", id))?;
        let category = tables.replace_category(id, patch.apply(current))?;
        tracing::info!(category_id = %id, "taste category patched");
        Ok(category)
    }

    /// Remove a category and unlink it from every mix
    pub async fn delete_taste_category(&self, id: Uuid) -> Result<Deleted> {
        let mut tables = self.tables.write().await;
        tables
            .categories
            .remove(&id)
            .ok_or_else(|| Error::not_found("Taste category", id))?;
        for mix in tables.mixes.values_mut() {
            mix.categories.retain(|category| *category != id);
        }
        tracing::info!(category_id = %id, "taste category deleted");
        Ok(Deleted::new(id))
    }

    // Mixes

    /// Mixes in creation order, marked from `viewer`'s point of view
    pub async fn mixes(&self, viewer: Option<Uuid>) -> Listing<MixView> {
        let tables = self.snapshot().await;
        let ids = tables.mix_ids();
        Listing::new(tables, ids, viewer, render_mix)
    }

    pub async fn mix(&self, id: Uuid, viewer: Option<Uuid>) -> Result<MixView> {
        let tables = self.tables.read().await;
        let mix = tables.mix(id)?;
        Ok(tables.mix_view(mix, viewer))
    }

    /// Validate references and store a mix authored by `author`
    pub async fn create_mix(&self, new: NewMix, author: Uuid) -> Result<MixView> {
        let mut errors = FieldErrors::new();
        new.check(&mut errors);

        let mut tables = self.tables.write().await;
        for id in new
            .categories
            .iter()
            .filter(|id| !tables.categories.contains_key(*id))
        {
            errors.add("categories", format!("Taste category {id} does not exist."));
        }
        for portion in new
            .goods
            .iter()
            .filter(|p| !tables.tobaccos.contains_key(&p.tobacco))
        {
            errors.add(
                "goods",
                format!("Tobacco {} does not exist.", portion.tobacco),
            );
        }
        if let Some(bowl) = new.bowl.filter(|id| !tables.bowls.contains_key(id)) {
            errors.add("bowl", format!("Bowl {bowl} does not exist."));
        }
        errors.into_result()?;
        let goods = new.portions()?;

        let mix = Mix {
            id: Uuid::now_v7(),
            name: new.name.trim().to_owned(),
            description: new.description,
            banner: new.banner,
            created: Utc::now(),
            taste_type: new.taste_type,
            categories: new.categories,
            goods,
            bowl_id: new.bowl,
            author_id: Some(author),
        };
        let view = tables.mix_view(&mix, Some(author));
        tables.mixes.insert(mix.id, mix);
        tracing::info!(mix_id = %view.id, author = %author, "mix created");
        Ok(view)
    }

    /// Like the mix, or remove the like if `user` already gave one
    pub async fn toggle_like(&self, mix_id: Uuid, user: Uuid) -> Result<LikeState> {
        let mut tables = self.tables.write().await;
        tables.mix(mix_id)?;
        let liked = toggle(&mut tables.likes, mix_id, user);
        Ok(LikeState {
            liked,
            likes_count: tables.likes_count(&mix_id),
        })
    }

    /// Add the mix to `user`'s favorites, or remove it if already there
    pub async fn toggle_favorite(&self, mix_id: Uuid, user: Uuid) -> Result<FavoriteState> {
        let mut tables = self.tables.write().await;
        tables.mix(mix_id)?;
        let favorited = toggle(&mut tables.favorites, mix_id, user);
        Ok(FavoriteState { favorited })
    }

    // Selection

    /// Manufacturer and bowl choices for the mix builder
    pub async fn selection_options(&self) -> SelectionOptions {
        let tables = self.tables.read().await;
        let manufacturers = tables
            .manufacturer_ids()
            .iter()
            .filter_map(|id| tables.manufacturers.get(id))
            .map(|m| ManufacturerOption {
                id: m.id,
                name: m.name.clone(),
            })
            .collect();
        let bowls = tables
            .bowl_ids()
            .iter()
            .filter_map(|id| tables.bowls.get(id))
            .map(|b| BowlOption {
                id: b.id,
                kind: b.kind.clone(),
            })
            .collect();
        SelectionOptions {
            manufacturers,
            bowls,
        }
    }

    /// Populate a small demo catalog
    pub async fn seed_demo(&self) -> Result<()> {
        let darkside = self
            .create_manufacturer(NewManufacturer {
                name: "Darkside".into(),
                description: "Strong tobacco from Saint Petersburg".into(),
                image: None,
            })
            .await?;
        let musthave = self
            .create_manufacturer(NewManufacturer {
                name: "MustHave".into(),
                description: "Medium strength blends".into(),
                image: None,
            })
            .await?;

        let mut tobaccos = Vec::new();
        for (manufacturer, taste, strength, resistance) in [
            (darkside.id, "Supernova", 8, Grade::High),
            (darkside.id, "Bananapapa", 7, Grade::Middle),
            (musthave.id, "Pinkman", 5, Grade::Middle),
            (musthave.id, "Raspberry", 4, Grade::Low),
        ] {
            let view = self
                .create_tobacco(NewTobacco {
                    manufacturer: Some(manufacturer),
                    taste: taste.into(),
                    description: format!("{taste} flavour"),
                    image: None,
                    strength,
                    resistance,
                    smokiness: Grade::Middle,
                })
                .await?;
            tobaccos.push(view.id);
        }

        let phunnel = self
            .create_bowl(NewBowl {
                kind: "Phunnel".into(),
                description: "Single hole bowl".into(),
                how_to: "Pack loosely, keep the center clear".into(),
                image: None,
            })
            .await?;
        self.create_bowl(NewBowl {
            kind: "Killer".into(),
            description: "Classic multi hole bowl".into(),
            how_to: "Fluff and pack to the rim".into(),
            image: None,
        })
        .await?;

        let mut categories = Vec::new();
        for name in ["Fruit", "Fresh", "Sweet", "Berry"] {
            let category = self
                .create_taste_category(NewTasteCategory { name: name.into() })
                .await?;
            categories.push(category.id);
        }

        let author = Uuid::now_v7();
        self.create_mix(
            NewMix {
                name: "Berry chill".into(),
                description: "Raspberry over a cold base".into(),
                banner: None,
                taste_type: TasteType::Fresh,
                categories: categories[..2].to_vec(),
                goods: vec![
                    NewPortion {
                        tobacco: tobaccos[0],
                        weight: 30,
                    },
                    NewPortion {
                        tobacco: tobaccos[3],
                        weight: 70,
                    },
                ],
                bowl: Some(phunnel.id),
            },
            author,
        )
        .await?;

        tracing::info!("demo catalog seeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::pagination::{PageParam, PageParams, Paginator};

    async fn store_with_manufacturer() -> (CatalogStore, Uuid) {
        let store = CatalogStore::new();
        let manufacturer = store
            .create_manufacturer(NewManufacturer {
                name: "Darkside".into(),
                ..NewManufacturer::default()
            })
            .await
            .unwrap();
        (store, manufacturer.id)
    }

    async fn add_tobacco(store: &CatalogStore, manufacturer: Uuid, taste: &str) -> Uuid {
        store
            .create_tobacco(NewTobacco {
                manufacturer: Some(manufacturer),
                taste: taste.into(),
                description: format!("{taste} description"),
                ..NewTobacco::default()
            })
            .await
            .unwrap()
            .id
    }

    async fn add_category(store: &CatalogStore, name: &str) -> Uuid {
        store
            .create_taste_category(NewTasteCategory { name: name.into() })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_tobacco_view_uses_manufacturer_name() {
        let (store, manufacturer) = store_with_manufacturer().await;
        let id = add_tobacco(&store, manufacturer, "Supernova").await;

        let detail = store.tobacco(id).await.unwrap();
        assert_eq!(detail.manufacturer, "Darkside");
        assert_eq!(detail.description.as_deref(), Some("Supernova description"));

        let listed = store.tobaccos(None).await.to_vec();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].description, None);
    }

    #[tokio::test]
    async fn test_tobaccos_in_creation_order() {
        let (store, manufacturer) = store_with_manufacturer().await;
        let first = add_tobacco(&store, manufacturer, "Mango").await;
        let second = add_tobacco(&store, manufacturer, "Apple").await;

        let ids: Vec<Uuid> = store.tobaccos(None).await.to_vec().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn test_tobacco_search_is_case_insensitive() {
        let (store, manufacturer) = store_with_manufacturer().await;
        add_tobacco(&store, manufacturer, "Mango Ice").await;
        add_tobacco(&store, manufacturer, "Grape").await;

        let found = store.tobaccos(Some("  mANgo ")).await.to_vec();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].taste, "Mango Ice");

        assert_eq!(store.tobaccos(Some("description")).await.len(), 2);
        assert_eq!(store.tobaccos(Some("")).await.len(), 2);
    }

    #[tokio::test]
    async fn test_tobacco_requires_existing_manufacturer() {
        let store = CatalogStore::new();
        let err = store
            .create_tobacco(NewTobacco {
                manufacturer: Some(Uuid::new_v4()),
                taste: "Mint".into(),
                ..NewTobacco::default()
            })
            .await
            .unwrap_err();
        match err {
            Error::Validation(fields) => assert!(fields.get("manufacturer").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_category_conflicts() {
        let store = CatalogStore::new();
        add_category(&store, "Fruit").await;
        let err = store
            .create_taste_category(NewTasteCategory {
                name: " fruit ".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_mix_with_one_category_rejected() {
        let (store, manufacturer) = store_with_manufacturer().await;
        let tobacco = add_tobacco(&store, manufacturer, "Mango").await;
        let category = add_category(&store, "Fruit").await;

        let err = store
            .create_mix(
                NewMix {
                    name: "Solo".into(),
                    categories: vec![category],
                    goods: vec![NewPortion {
                        tobacco,
                        weight: 100,
                    }],
                    ..NewMix::default()
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();
        match err {
            Error::Validation(fields) => assert!(fields.get("categories").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.mixes(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_mix_rejects_unknown_references() {
        let store = CatalogStore::new();
        let err = store
            .create_mix(
                NewMix {
                    name: "Ghost".into(),
                    categories: vec![Uuid::new_v4(), Uuid::new_v4()],
                    goods: vec![NewPortion {
                        tobacco: Uuid::new_v4(),
                        weight: 50,
                    }],
                    bowl: Some(Uuid::new_v4()),
                    ..NewMix::default()
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();
        let Error::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.get("categories").map(<[String]>::len), Some(2));
        assert!(fields.get("goods").is_some());
        assert!(fields.get("bowl").is_some());
    }

    #[tokio::test]
    async fn test_like_toggle_round_trip() {
        let store = CatalogStore::new();
        store.seed_demo().await.unwrap();
        let mix = store.mixes(None).await.to_vec().remove(0);
        let user = Uuid::new_v4();

        let liked = store.toggle_like(mix.id, user).await.unwrap();
        assert_eq!(liked, LikeState { liked: true, likes_count: 1 });
        assert!(store.mix(mix.id, Some(user)).await.unwrap().is_liked);
        assert!(!store.mix(mix.id, None).await.unwrap().is_liked);

        let unliked = store.toggle_like(mix.id, user).await.unwrap();
        assert_eq!(unliked, LikeState { liked: false, likes_count: 0 });
        assert_eq!(store.mix(mix.id, Some(user)).await.unwrap(), mix);
    }

    #[tokio::test]
    async fn test_favorite_toggle() {
        let store = CatalogStore::new();
        store.seed_demo().await.unwrap();
        let mix = store.mixes(None).await.to_vec().remove(0);
        let user = Uuid::new_v4();

        assert!(store.toggle_favorite(mix.id, user).await.unwrap().favorited);
        assert!(store.mix(mix.id, Some(user)).await.unwrap().is_favorited);
        assert!(!store.toggle_favorite(mix.id, user).await.unwrap().favorited);
    }

    #[tokio::test]
    async fn test_toggle_unknown_mix() {
        let store = CatalogStore::new();
        let err = store
            .toggle_like(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_seeded_mix_view() {
        let store = CatalogStore::new();
        store.seed_demo().await.unwrap();
        let mixes = store.mixes(None).await.to_vec();
        assert_eq!(mixes.len(), 1);

        let mix = &mixes[0];
        assert_eq!(mix.categories.len(), 2);
        assert_eq!(mix.goods.iter().map(|g| u32::from(g.weight)).sum::<u32>(), 100);
        assert_eq!(mix.bowl.as_ref().map(|b| b.kind.as_str()), Some("Phunnel"));
        assert_eq!(mix.goods[0].manufacturer, "Darkside");
    }

    #[tokio::test]
    async fn test_selection() {
        let store = CatalogStore::new();
        store.seed_demo().await.unwrap();

        let options = store.selection_options().await;
        let names: Vec<&str> = options.manufacturers.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Darkside", "MustHave"]);
        assert_eq!(options.bowls.len(), 2);

        let darkside = options.manufacturers[0].id;
        let tobaccos = store.tobaccos_by_manufacturer(darkside).await.unwrap();
        assert_eq!(tobaccos.len(), 2);

        assert!(matches!(
            store.tobaccos_by_manufacturer(Uuid::new_v4()).await,
            Err(Error::NotFound(_))
        ));
    }

    static RENDERED: AtomicUsize = AtomicUsize::new(0);

    fn counted_mix(tables: &Tables, id: &Uuid, viewer: Option<Uuid>) -> Option<MixView> {
        RENDERED.fetch_add(1, Ordering::SeqCst);
        render_mix(tables, id, viewer)
    }

    #[tokio::test]
    async fn test_page_renders_only_its_rows() {
        let (store, manufacturer) = store_with_manufacturer().await;
        let tobacco = add_tobacco(&store, manufacturer, "Mango").await;
        let categories = vec![
            add_category(&store, "Fruit").await,
            add_category(&store, "Sweet").await,
        ];
        for n in 0..6 {
            store
                .create_mix(
                    NewMix {
                        name: format!("Mix {n}"),
                        categories: categories.clone(),
                        goods: vec![NewPortion { tobacco, weight: 40 }],
                        ..NewMix::default()
                    },
                    Uuid::new_v4(),
                )
                .await
                .unwrap();
        }

        let tables = store.snapshot().await;
        let ids = tables.mix_ids();
        let listing = Listing::new(tables, ids, None, counted_mix);
        let params = PageParams::new(Some(PageParam::Integer(1)), Some(PageParam::Integer(2)));
        let page = Paginator::new(10, 100)
            .paginate(&listing, &params)
            .await
            .unwrap();

        assert_eq!(page.count, 6);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id, listing.ids[2]);
        assert_eq!(RENDERED.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_listing_past_the_end_is_empty() {
        let (store, manufacturer) = store_with_manufacturer().await;
        add_tobacco(&store, manufacturer, "Mango").await;

        let listing = store.tobaccos(None).await;
        assert_eq!(listing.count().await.unwrap(), 1);
        assert!(listing.fetch_range(5, 10).await.unwrap().is_empty());
        assert_eq!(listing.fetch_range(0, u64::MAX).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_manufacturer_replaces_fields() {
        let (store, manufacturer) = store_with_manufacturer().await;
        let updated = store
            .update_manufacturer(
                manufacturer,
                NewManufacturer {
                    name: " Darkside Core ".into(),
                    description: "Rebranded".into(),
                    image: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Darkside Core");
        assert_eq!(store.manufacturer(manufacturer).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found_before_validation() {
        let store = CatalogStore::new();
        let err = store
            .update_bowl(Uuid::new_v4(), NewBowl::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = store
            .patch_tobacco(Uuid::new_v4(), TobaccoPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_patch_tobacco_keeps_other_fields() {
        let (store, manufacturer) = store_with_manufacturer().await;
        let id = add_tobacco(&store, manufacturer, "Mango").await;

        let patched = store
            .patch_tobacco(
                id,
                TobaccoPatch {
                    strength: Some(9),
                    ..TobaccoPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.taste, "Mango");
        assert_eq!(patched.params.strength, 9);

        let err = store
            .patch_tobacco(
                id,
                TobaccoPatch {
                    strength: Some(300),
                    ..TobaccoPatch::default()
                },
            )
            .await
            .unwrap_err();
        let Error::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.get("strength").is_some());
        assert_eq!(store.tobacco(id).await.unwrap().params.strength, 9);
    }

    #[tokio::test]
    async fn test_category_rename_conflicts_with_others_only() {
        let store = CatalogStore::new();
        let fruit = add_category(&store, "Fruit").await;
        add_category(&store, "Fresh").await;

        let same = store
            .update_taste_category(fruit, NewTasteCategory { name: "FRUIT".into() })
            .await
            .unwrap();
        assert_eq!(same.name, "FRUIT");

        let err = store
            .patch_taste_category(
                fruit,
                TasteCategoryPatch {
                    name: Some("fresh".into()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_manufacturer_cascades() {
        let store = CatalogStore::new();
        store.seed_demo().await.unwrap();
        let darkside = store
            .selection_options()
            .await
            .manufacturers
            .into_iter()
            .find(|m| m.name == "Darkside")
            .unwrap();

        let deleted = store.delete_manufacturer(darkside.id).await.unwrap();
        assert_eq!(deleted, Deleted::new(darkside.id));

        let tobaccos = store.tobaccos(None).await.to_vec();
        assert_eq!(tobaccos.len(), 2);
        assert!(tobaccos.iter().all(|t| t.manufacturer == "MustHave"));

        let mix = store.mixes(None).await.to_vec().remove(0);
        assert_eq!(mix.goods.len(), 1);
        assert_eq!(mix.goods[0].taste, "Raspberry");

        assert!(matches!(
            store.delete_manufacturer(darkside.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_bowl_and_category_unlink_mixes() {
        let store = CatalogStore::new();
        store.seed_demo().await.unwrap();
        let mix = store.mixes(None).await.to_vec().remove(0);
        let bowl = mix.bowl.as_ref().map(|b| b.id).unwrap();
        let category = mix.categories[0].id;

        store.delete_bowl(bowl).await.unwrap();
        store.delete_taste_category(category).await.unwrap();

        let after = store.mix(mix.id, None).await.unwrap();
        assert_eq!(after.bowl, None);
        assert_eq!(after.categories.len(), 1);
        assert!(after.categories.iter().all(|c| c.id != category));
    }

    #[tokio::test]
    async fn test_delete_tobacco_drops_portion() {
        let store = CatalogStore::new();
        store.seed_demo().await.unwrap();
        let mix = store.mixes(None).await.to_vec().remove(0);
        let tobacco = mix.goods[0].id;

        store.delete_tobacco(tobacco).await.unwrap();
        assert!(matches!(store.tobacco(tobacco).await, Err(Error::NotFound(_))));
        assert_eq!(store.mix(mix.id, None).await.unwrap().goods.len(), 1);
    }
}
