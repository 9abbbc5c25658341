//! Catalog domain: records, create payloads and the in-memory store

pub mod model;
pub mod payload;
mod store;

pub use model::{
    BowlView, Deleted, FavoriteState, Grade, LikeState, ManufacturerView, MixPortion, MixView,
    SelectionOptions, TasteCategory, TasteType, TobaccoOption, TobaccoView,
};
pub use payload::{
    BowlPatch, ManufacturerPatch, NewBowl, NewManufacturer, NewMix, NewPortion,
    NewTasteCategory, NewTobacco, TasteCategoryPatch, TobaccoPatch,
};
pub use store::{CatalogStore, Listing};
