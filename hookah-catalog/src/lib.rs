//! # hookah-catalog
//!
//! Catalog backend for hookah tobaccos, manufacturers, bowls, taste
//! categories and user-composed mixes.
//!
//! Two contracts shape every response:
//!
//! - **Offset pagination**: list endpoints take `limit`/`offset` and return
//!   `{results, count, next_offset, previous_offset}` via [`Paginator`].
//! - **Response envelope**: every non-bypassed response leaves the service as
//!   `{status, code, message, data, errors}`, see [`envelope`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use hookah_catalog::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::new(config.clone())?;
//!     Server::new(config).serve(app(state)).await
//! }
//! ```
//!
//! [`Paginator`]: pagination::Paginator

pub mod auth;
pub mod catalog;
pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod pagination;
pub mod routes;
pub mod server;
pub mod state;

pub mod prelude {
    pub use crate::auth::{Claims, CurrentUser, JwtVerifier, MaybeUser};
    pub use crate::catalog::CatalogStore;
    pub use crate::config::Config;
    pub use crate::envelope::{Envelope, EnvelopePolicy, EnvelopeStatus};
    pub use crate::error::{Error, FieldErrors, Result};
    pub use crate::observability::init_tracing;
    pub use crate::pagination::{PageParam, PageParams, PageResult, PageSource, Paginator};
    pub use crate::routes::app;
    pub use crate::server::{apply_middleware, Server};
    pub use crate::state::AppState;

    pub use axum::{
        extract::{Path, Query, State},
        routing::{get, post},
        Json, Router,
    };
}
