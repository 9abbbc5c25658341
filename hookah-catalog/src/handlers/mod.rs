//! HTTP handlers for the catalog API
//!
//! Handlers return raw JSON payloads; the envelope middleware wraps them
//! into the `{status, code, message, data, errors}` shape on the way out.

pub mod bowls;
pub mod health;
pub mod manufacturers;
pub mod mixes;
pub mod selection;
pub mod taste_categories;
pub mod tobaccos;

use axum::http::Uri;

use crate::error::Error;

/// Fallback for unmatched routes
pub async fn not_found(uri: Uri) -> Error {
    Error::NotFound(format!("No route for {}", uri.path()))
}
