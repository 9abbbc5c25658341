//! Choices for the mix builder
//!
//! Both endpoints are POST and read page parameters from the JSON body.

use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    catalog::{SelectionOptions, TobaccoOption},
    error::{Error, FieldErrors, Result},
    pagination::{PageParam, PageParams, PageResult},
    state::AppState,
};

pub async fn options(State(state): State<AppState>) -> Json<SelectionOptions> {
    Json(state.store().selection_options().await)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TobaccosByManufacturer {
    pub manufacturer_id: Option<Uuid>,
    pub limit: Option<PageParam>,
    pub offset: Option<PageParam>,
}

pub async fn tobaccos_by_manufacturer(
    State(state): State<AppState>,
    Json(body): Json<TobaccosByManufacturer>,
) -> Result<Json<PageResult<TobaccoOption>>> {
    let Some(manufacturer_id) = body.manufacturer_id else {
        let mut errors = FieldErrors::new();
        errors.add("manufacturer_id", "This field is required.");
        return Err(Error::Validation(errors));
    };
    let params = PageParams::new(body.limit, body.offset);
    // reject bad page parameters before touching the store
    let request = state.paginator().request(&params)?;

    let rows = state.store().tobaccos_by_manufacturer(manufacturer_id).await?;
    Ok(Json(state.paginator().fetch(&rows, request).await?))
}
