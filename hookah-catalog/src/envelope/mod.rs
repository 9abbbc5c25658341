//! Uniform response envelope
//!
//! Every API response body has the shape
//!
//! ```json
//! {"status": "ok", "code": 200, "message": "Success", "data": {...}, "errors": null}
//! ```
//!
//! `status` is `"ok"` exactly for 2xx codes. Successful responses carry
//! `data` and failures carry `errors`; the other member is always `null`.
//! Handlers never build envelopes themselves: they return raw JSON and
//! [`envelope_responses`] rewrites the response on the way out.

mod middleware;
pub mod status;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub use middleware::{envelope_responses, EnvelopePolicy};

/// Message of the fixed envelope returned when a response cannot be rendered
pub const RENDER_ERROR_MESSAGE: &str = "render error";

/// Coarse outcome of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    /// 2xx
    Ok,
    /// Everything else
    Bad,
}

impl EnvelopeStatus {
    pub const fn from_code(code: u16) -> Self {
        if code >= 200 && code < 300 {
            Self::Ok
        } else {
            Self::Bad
        }
    }
}

/// Normalized response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: EnvelopeStatus,
    pub code: u16,
    pub message: String,
    pub data: Option<Value>,
    pub errors: Option<Value>,
}

impl Envelope {
    /// Wrap a raw handler payload produced with status `code`.
    ///
    /// On success a top-level `data` member of an object payload is hoisted,
    /// otherwise the whole payload becomes `data`; an absent payload becomes
    /// `{}`. On failure the payload moves to `errors`, with strings and absent
    /// payloads turned into `{"detail": ...}`.
    pub fn format(code: u16, payload: Option<Value>) -> Self {
        let status = EnvelopeStatus::from_code(code);
        let message = status::message_for(code);
        let payload = payload.filter(|value| !value.is_null());

        let (data, errors) = match status {
            EnvelopeStatus::Ok => (Some(success_data(payload)), None),
            EnvelopeStatus::Bad => (None, Some(failure_errors(payload, message))),
        };

        Self {
            status,
            code,
            message: message.to_owned(),
            data,
            errors,
        }
    }

    /// The fixed 500 envelope used when a response cannot be rendered
    pub fn render_failure(detail: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Bad,
            code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            message: RENDER_ERROR_MESSAGE.to_owned(),
            data: None,
            errors: Some(json!({ "detail": detail.into() })),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == EnvelopeStatus::Ok
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

fn success_data(payload: Option<Value>) -> Value {
    match payload {
        Some(Value::Object(mut map)) if map.contains_key("data") => map
            .remove("data")
            .filter(|hoisted| !hoisted.is_null())
            .unwrap_or_else(empty_object),
        Some(value) => value,
        None => empty_object(),
    }
}

fn failure_errors(payload: Option<Value>, message: &str) -> Value {
    match payload {
        Some(Value::String(text)) if !text.trim().is_empty() => json!({ "detail": text }),
        Some(Value::Object(map)) if !map.is_empty() => Value::Object(map),
        Some(Value::Array(items)) if !items.is_empty() => Value::Array(items),
        Some(scalar @ (Value::Bool(_) | Value::Number(_))) => json!({ "detail": scalar }),
        _ => json!({ "detail": message }),
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}
