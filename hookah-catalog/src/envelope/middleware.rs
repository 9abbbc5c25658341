//! Middleware that rewrites every response body into an [`Envelope`]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use super::Envelope;
use crate::config::{EnvelopeConfig, MediaConfig};

/// Which paths to leave alone and how much body to buffer
#[derive(Debug, Clone)]
pub struct EnvelopePolicy {
    bypass_prefixes: Arc<[String]>,
    max_body_bytes: usize,
}

impl EnvelopePolicy {
    pub fn new(bypass_prefixes: impl IntoIterator<Item = String>, max_body_bytes: usize) -> Self {
        Self {
            bypass_prefixes: bypass_prefixes.into_iter().collect(),
            max_body_bytes,
        }
    }

    /// Policy from configuration; the media prefix is always bypassed
    pub fn from_config(envelope: &EnvelopeConfig, media: &MediaConfig) -> Self {
        let media_prefix = format!("{}/", media.url_prefix.trim_end_matches('/'));
        let mut prefixes = envelope.bypass_prefixes.clone();
        if !prefixes.contains(&media_prefix) {
            prefixes.push(media_prefix);
        }
        Self::new(prefixes, envelope.max_body_bytes)
    }

    /// Whether responses for `path` pass through untouched
    pub fn bypasses(&self, path: &str) -> bool {
        self.bypass_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Envelope every response except bypassed paths.
///
/// Install with `axum::middleware::from_fn_with_state(policy, envelope_responses)`.
pub async fn envelope_responses(
    State(policy): State<EnvelopePolicy>,
    request: Request,
    next: Next,
) -> Response {
    if policy.bypasses(request.uri().path()) {
        return next.run(request).await;
    }

    let response = next.run(request).await;
    wrap(response, policy.max_body_bytes).await
}

async fn wrap(response: Response, max_body_bytes: usize) -> Response {
    let status = response.status();
    if !can_carry_body(status) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(code = status.as_u16(), error = %err, "failed to read response body");
            return Envelope::render_failure(err.to_string()).into_response();
        }
    };

    let envelope = Envelope::format(status.as_u16(), decode_payload(&bytes));
    let body = match serde_json::to_vec(&envelope) {
        Ok(body) => body,
        Err(err) => {
            tracing::error!(code = status.as_u16(), error = %err, "failed to serialize envelope");
            return Envelope::render_failure(err.to_string()).into_response();
        }
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Response::from_parts(parts, Body::from(body))
}

/// 1xx, 204 and 304 responses must not have a body
fn can_carry_body(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

/// JSON bodies are used as-is, anything else is kept as text
fn decode_payload(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(String::from_utf8_lossy(bytes).into_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, Request as HttpRequest},
        middleware::from_fn_with_state,
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use tower::ServiceExt;

    fn app(policy: EnvelopePolicy) -> Router {
        Router::new()
            .route("/ok", get(|| async { Json(json!({"id": 1})) }))
            .route(
                "/hoist",
                get(|| async { Json(json!({"data": {"inner": true}, "meta": 1})) }),
            )
            .route(
                "/missing",
                get(|| async { (StatusCode::NOT_FOUND, Json(json!({"detail": "no such mix"}))) }),
            )
            .route(
                "/text-error",
                get(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "missing field `name`") }),
            )
            .route("/empty", get(|| async { StatusCode::CREATED }))
            .route("/no-content", get(|| async { StatusCode::NO_CONTENT }))
            .route(
                "/headers",
                get(|| async {
                    let mut headers = HeaderMap::new();
                    headers.insert("x-custom", HeaderValue::from_static("kept"));
                    (headers, Json(json!([1, 2, 3])))
                }),
            )
            .route("/big", get(|| async { "x".repeat(64) }))
            .route("/admin/panel", get(|| async { "<html>admin</html>" }))
            .layer(from_fn_with_state(policy, envelope_responses))
    }

    fn default_app() -> Router {
        app(EnvelopePolicy::from_config(
            &EnvelopeConfig::default(),
            &MediaConfig::default(),
        ))
    }

    async fn call(router: Router, uri: &str) -> Response {
        router
            .oneshot(HttpRequest::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_wraps_success() {
        let response = call(default_app(), "/ok").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(
            json_body(response).await,
            json!({"status": "ok", "code": 200, "message": "Success", "data": {"id": 1}, "errors": null})
        );
    }

    #[tokio::test]
    async fn test_hoists_data_member() {
        let body = json_body(call(default_app(), "/hoist").await).await;
        assert_eq!(body["data"], json!({"inner": true}));
    }

    #[tokio::test]
    async fn test_wraps_failure() {
        let response = call(default_app(), "/missing").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            json!({"status": "bad", "code": 404, "message": "Not Found", "data": null, "errors": {"detail": "no such mix"}})
        );
    }

    #[tokio::test]
    async fn test_text_failure_becomes_detail() {
        let response = call(default_app(), "/text-error").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["errors"], json!({"detail": "missing field `name`"}));
        assert_eq!(body["data"], Value::Null);
    }

    #[tokio::test]
    async fn test_empty_success_body() {
        let response = call(default_app(), "/empty").await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["data"], json!({}));
    }

    #[tokio::test]
    async fn test_no_content_passes_through() {
        let response = call(default_app(), "/no-content").await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_preserves_other_headers() {
        let response = call(default_app(), "/headers").await;
        assert_eq!(response.headers()["x-custom"], "kept");
        assert_eq!(json_body(response).await["data"], json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_bypass_is_byte_for_byte() {
        let response = call(default_app(), "/admin/panel").await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"<html>admin</html>");
    }

    #[tokio::test]
    async fn test_oversized_body_is_render_failure() {
        let router = app(EnvelopePolicy::new(Vec::new(), 16));
        let response = call(router, "/big").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["status"], "bad");
        assert_eq!(body["code"], 500);
        assert_eq!(body["message"], "render error");
        assert_eq!(body["data"], Value::Null);
        assert!(body["errors"]["detail"].is_string());
    }

    #[test]
    fn test_policy_adds_media_prefix() {
        let media = MediaConfig {
            url_prefix: "/uploads".into(),
            ..MediaConfig::default()
        };
        let policy = EnvelopePolicy::from_config(&EnvelopeConfig::default(), &media);
        assert!(policy.bypasses("/uploads/banner.png"));
        assert!(policy.bypasses("/api/v1/auth/login"));
        assert!(!policy.bypasses("/api/v1/mixes"));
    }
}
