use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    catalog::{Deleted, ManufacturerPatch, ManufacturerView, NewManufacturer},
    error::Result,
    pagination::{PageParams, PageResult},
    state::AppState,
};

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResult<ManufacturerView>>> {
    let rows = state.store().manufacturers().await;
    Ok(Json(state.paginator().paginate(&rows, &params).await?))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ManufacturerView>> {
    Ok(Json(state.store().manufacturer(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(payload): Json<NewManufacturer>,
) -> Result<(StatusCode, Json<ManufacturerView>)> {
    let manufacturer = state.store().create_manufacturer(payload).await?;
    Ok((StatusCode::CREATED, Json(manufacturer)))
}

pub async fn update(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<NewManufacturer>,
) -> Result<Json<ManufacturerView>> {
    Ok(Json(state.store().update_manufacturer(id, payload).await?))
}

pub async fn patch(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ManufacturerPatch>,
) -> Result<Json<ManufacturerView>> {
    Ok(Json(state.store().patch_manufacturer(id, payload).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Deleted>> {
    Ok(Json(state.store().delete_manufacturer(id).await?))
}
