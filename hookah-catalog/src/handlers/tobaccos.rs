use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    catalog::{Deleted, NewTobacco, TobaccoPatch, TobaccoView},
    error::Result,
    pagination::{PageParams, PageResult},
    state::AppState,
};

/// Extra query parameters of the tobacco listing
#[derive(Debug, Default, Deserialize)]
pub struct TobaccoFilter {
    pub search: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    Query(filter): Query<TobaccoFilter>,
) -> Result<Json<PageResult<TobaccoView>>> {
    let rows = state.store().tobaccos(filter.search.as_deref()).await;
    let page = state.paginator().paginate(&rows, &params).await?;
    Ok(Json(page))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TobaccoView>> {
    Ok(Json(state.store().tobacco(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(payload): Json<NewTobacco>,
) -> Result<(StatusCode, Json<TobaccoView>)> {
    let tobacco = state.store().create_tobacco(payload).await?;
    Ok((StatusCode::CREATED, Json(tobacco)))
}

pub async fn update(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<NewTobacco>,
) -> Result<Json<TobaccoView>> {
    Ok(Json(state.store().update_tobacco(id, payload).await?))
}

pub async fn patch(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TobaccoPatch>,
) -> Result<Json<TobaccoView>> {
    Ok(Json(state.store().patch_tobacco(id, payload).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Deleted>> {
    Ok(Json(state.store().delete_tobacco(id).await?))
}
