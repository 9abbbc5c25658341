use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    catalog::{Deleted, NewTasteCategory, TasteCategory, TasteCategoryPatch},
    error::Result,
    pagination::{PageParams, PageResult},
    state::AppState,
};

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResult<TasteCategory>>> {
    let rows = state.store().taste_categories().await;
    Ok(Json(state.paginator().paginate(&rows, &params).await?))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TasteCategory>> {
    Ok(Json(state.store().taste_category(id).await?))
}

/// 409 when a category with the same name (ignoring case) exists
pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(payload): Json<NewTasteCategory>,
) -> Result<(StatusCode, Json<TasteCategory>)> {
    let category = state.store().create_taste_category(payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// 409 when another category already has the name
pub async fn update(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<NewTasteCategory>,
) -> Result<Json<TasteCategory>> {
    Ok(Json(state.store().update_taste_category(id, payload).await?))
}

pub async fn patch(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TasteCategoryPatch>,
) -> Result<Json<TasteCategory>> {
    Ok(Json(state.store().patch_taste_category(id, payload).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Deleted>> {
    Ok(Json(state.store().delete_taste_category(id).await?))
}
