//! Error types and HTTP response conversion
//!
//! Handlers return [`Result<T>`]. An [`Error`] renders as the *raw* failure
//! payload (`{"detail": ...}` or a field map); the envelope middleware then
//! moves that payload into the `errors` member of the response envelope.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pagination::PaginationError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Service error types
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or over-limit page parameters
    #[error(transparent)]
    Pagination(#[from] PaginationError),

    /// Payload failed field validation
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Config(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::Pagination(_) | Error::Validation(_) | Error::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    pub(crate) fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        Error::NotFound(format!("{what} {id} does not exist"))
    }
}

/// Raw failure payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human readable description
    pub detail: String,

    /// Optional machine readable code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            code: None,
        }
    }

    /// Create error response with a code
    pub fn with_code(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            code: Some(code.into()),
        }
    }
}

/// Field name to validation messages.
///
/// Serializes as a plain JSON object, e.g. `{"categories": ["..."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against `field`
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, otherwise [`Error::Validation`]
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "internal error");
        }
        match self {
            Error::Validation(fields) => (status, Json(fields)).into_response(),

            Error::Pagination(err) => {
                let code = match err {
                    PaginationError::InvalidParameter { .. } => "INVALID_PAGINATION_PARAMETER",
                    PaginationError::LimitExceeded { .. } => "LIMIT_EXCEEDED",
                };
                (status, Json(ErrorResponse::with_code(code, err.to_string()))).into_response()
            }

            Error::Config(_) | Error::Io(_) | Error::Internal(_) => (
                status,
                Json(ErrorResponse::with_code(
                    "INTERNAL_ERROR",
                    "Internal server error",
                )),
            )
                .into_response(),

            Error::Unauthorized(msg) => (
                status,
                Json(ErrorResponse::with_code("UNAUTHORIZED", msg)),
            )
                .into_response(),

            Error::BadRequest(msg) | Error::NotFound(msg) | Error::Conflict(msg) => {
                (status, Json(ErrorResponse::new(msg))).into_response()
            }
        }
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::Unauthorized(format!("invalid token: {err}"))
    }
}
