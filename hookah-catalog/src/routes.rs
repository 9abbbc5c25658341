//! Route table

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::{
    handlers::{
        bowls, health, manufacturers, mixes, not_found, selection, taste_categories, tobaccos,
    },
    state::AppState,
};

/// Versioned API prefix
pub const API_PREFIX: &str = "/api/v1";

/// All application routes, without the transport middleware
pub fn app(state: AppState) -> Router {
    let media_prefix = state.config().media.url_prefix.clone();
    let media = ServeDir::new(&state.config().media.root);

    Router::new()
        .route("/health", get(health::health))
        .nest(API_PREFIX, api())
        .nest_service(&media_prefix, media)
        .fallback(not_found)
        .with_state(state)
}

fn api() -> Router<AppState> {
    Router::new()
        .route("/tobaccos", get(tobaccos::list))
        .route("/tobaccos/create", post(tobaccos::create))
        .route(
            "/tobaccos/{id}",
            get(tobaccos::detail)
                .put(tobaccos::update)
                .patch(tobaccos::patch)
                .delete(tobaccos::remove),
        )
        .route("/manufacturers", get(manufacturers::list))
        .route("/manufacturers/create", post(manufacturers::create))
        .route(
            "/manufacturers/{id}",
            get(manufacturers::detail)
                .put(manufacturers::update)
                .patch(manufacturers::patch)
                .delete(manufacturers::remove),
        )
        .route("/bowls", get(bowls::list))
        .route("/bowls/create", post(bowls::create))
        .route(
            "/bowls/{id}",
            get(bowls::detail)
                .put(bowls::update)
                .patch(bowls::patch)
                .delete(bowls::remove),
        )
        .route("/taste-categories", get(taste_categories::list))
        .route("/taste-categories/create", post(taste_categories::create))
        .route(
            "/taste-categories/{id}",
            get(taste_categories::detail)
                .put(taste_categories::update)
                .patch(taste_categories::patch)
                .delete(taste_categories::remove),
        )
        .route("/mixes", get(mixes::list))
        .route("/mixes/create", post(mixes::create))
        .route("/mixes/{id}", get(mixes::detail))
        .route("/mixes/{id}/likes", post(mixes::toggle_like))
        .route("/mixes/{id}/favorites", post(mixes::toggle_favorite))
        .route("/selection/options", post(selection::options))
        .route(
            "/selection/tobaccos-by-manufacturer",
            post(selection::tobaccos_by_manufacturer),
        )
}
