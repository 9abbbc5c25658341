use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    catalog::{BowlPatch, BowlView, Deleted, NewBowl},
    error::Result,
    pagination::{PageParams, PageResult},
    state::AppState,
};

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResult<BowlView>>> {
    let rows = state.store().bowls().await;
    Ok(Json(state.paginator().paginate(&rows, &params).await?))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BowlView>> {
    Ok(Json(state.store().bowl(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(payload): Json<NewBowl>,
) -> Result<(StatusCode, Json<BowlView>)> {
    let bowl = state.store().create_bowl(payload).await?;
    Ok((StatusCode::CREATED, Json(bowl)))
}

pub async fn update(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<NewBowl>,
) -> Result<Json<BowlView>> {
    Ok(Json(state.store().update_bowl(id, payload).await?))
}

pub async fn patch(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<BowlPatch>,
) -> Result<Json<BowlView>> {
    Ok(Json(state.store().patch_bowl(id, payload).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Deleted>> {
    Ok(Json(state.store().delete_bowl(id).await?))
}
