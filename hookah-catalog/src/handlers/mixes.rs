//! Mix listing, creation and the like/favorite toggles
//!
//! Reads accept an optional bearer token so `is_liked` and `is_favorited`
//! reflect the caller; writes require one.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::{CurrentUser, MaybeUser},
    catalog::{FavoriteState, LikeState, MixView, NewMix},
    error::Result,
    pagination::{PageParams, PageResult},
    state::AppState,
};

pub async fn list(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResult<MixView>>> {
    let rows = state.store().mixes(viewer.id()).await;
    Ok(Json(state.paginator().paginate(&rows, &params).await?))
}

pub async fn detail(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MixView>> {
    Ok(Json(state.store().mix(id, viewer.id()).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<NewMix>,
) -> Result<(StatusCode, Json<MixView>)> {
    let mix = state.store().create_mix(payload, user.id).await?;
    Ok((StatusCode::CREATED, Json(mix)))
}

/// 201 when the like was added, 200 when it was removed
pub async fn toggle_like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<LikeState>)> {
    let like = state.store().toggle_like(id, user.id).await?;
    Ok((toggled_status(like.liked), Json(like)))
}

/// 201 when the mix was added to favorites, 200 when it was removed
pub async fn toggle_favorite(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<FavoriteState>)> {
    let favorite = state.store().toggle_favorite(id, user.id).await?;
    Ok((toggled_status(favorite.favorited), Json(favorite)))
}

fn toggled_status(added: bool) -> StatusCode {
    if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}
