//! HTTP server with graceful shutdown

use std::{any::Any, net::SocketAddr};

use axum::{
    response::{IntoResponse, Response},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    config::Config,
    envelope::{envelope_responses, EnvelopePolicy},
    error::{Error, Result},
    middleware::{request_id_layer, request_id_propagation_layer, sensitive_headers_layer},
};

/// Server instance
pub struct Server {
    config: Config,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the server with the given router until SIGINT or SIGTERM
    pub async fn serve(self, app: Router) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.port));

        tracing::info!("Starting {} on {}", self.config.service.name, addr);
        self.log_middleware_config();

        let app = apply_middleware(app, &self.config);
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Log middleware configuration for debugging
    fn log_middleware_config(&self) {
        let config = &self.config;
        tracing::info!("Middleware configuration:");
        tracing::info!(
            "  - Panic recovery: {}",
            if config.middleware.catch_panic { "enabled" } else { "disabled" }
        );
        tracing::info!("  - Request ID tracking: enabled");
        tracing::info!("  - Sensitive header masking: enabled");
        tracing::info!(
            "  - Request body limit: {} MB",
            config.middleware.body_limit_mb
        );
        tracing::info!("  - Compression: enabled");
        tracing::info!("  - CORS mode: {}", config.middleware.cors_mode);
        tracing::info!(
            "  - Request timeout: {} seconds",
            config.service.timeout_secs
        );
        tracing::info!(
            "  - Response envelope: enabled (bypass: {})",
            config.envelope.bypass_prefixes.join(", ")
        );
    }
}

/// Wrap `router` in the transport stack.
///
/// The envelope sits outside panic recovery, the timeout and the body limit
/// so the responses those layers produce are enveloped too. Layers added
/// later run first.
pub fn apply_middleware(router: Router, config: &Config) -> Router {
    let body_limit = config.middleware.body_limit_mb.saturating_mul(1024 * 1024);
    let policy = EnvelopePolicy::from_config(&config.envelope, &config.media);

    let router = if config.middleware.catch_panic {
        router.layer(CatchPanicLayer::custom(panic_response))
    } else {
        router
    };

    router
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::with_status_code(
            http::StatusCode::REQUEST_TIMEOUT,
            config.timeout(),
        ))
        .layer(axum::middleware::from_fn_with_state(
            policy,
            envelope_responses,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(sensitive_headers_layer())
        .layer(request_id_propagation_layer())
        .layer(request_id_layer())
        .layer(build_cors_layer(&config.middleware.cors_mode))
        .layer(CompressionLayer::new())
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    Error::Internal(format!("handler panicked: {message}")).into_response()
}

/// Build CORS layer based on configuration
fn build_cors_layer(mode: &str) -> CorsLayer {
    match mode {
        "permissive" => {
            tracing::debug!("Enabling permissive CORS");
            CorsLayer::permissive()
        }
        "restrictive" => {
            tracing::debug!("Enabling restrictive CORS (default deny)");
            CorsLayer::new()
        }
        _ => {
            tracing::warn!("Unknown CORS mode: {}, defaulting to permissive", mode);
            CorsLayer::permissive()
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    tracing::info!("Shutdown signal received, draining requests...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    use crate::middleware::REQUEST_ID_HEADER;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn boom() -> &'static str {
        panic!("kaboom")
    }

    #[tokio::test]
    async fn test_panic_becomes_500_envelope() {
        let app = apply_middleware(Router::new().route("/boom", get(boom)), &Config::default());
        let response = app
            .oneshot(Request::get("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 500);
        let body = body_json(response).await;
        assert_eq!(body["status"], "bad");
        assert_eq!(body["code"], 500);
        assert_eq!(body["message"], "Internal Server Error");
        assert_eq!(body["errors"]["detail"], "Internal server error");
    }

    #[tokio::test]
    async fn test_request_id_is_returned() {
        let app = apply_middleware(
            Router::new().route("/ok", get(|| async { "ok" })),
            &Config::default(),
        );
        let response = app
            .oneshot(Request::get("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_oversized_body_is_enveloped() {
        let mut config = Config::default();
        config.middleware.body_limit_mb = 1;
        let app = apply_middleware(
            Router::new().route("/echo", axum::routing::post(|body: String| async move { body })),
            &config,
        );
        let request = Request::post("/echo")
            .header("content-length", (2 * 1024 * 1024).to_string())
            .body(Body::from(vec![b'a'; 2 * 1024 * 1024]))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), 413);
        let body = body_json(response).await;
        assert_eq!(body["status"], "bad");
        assert_eq!(body["code"], 413);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_handler_times_out_with_envelope() {
        let mut config = Config::default();
        config.service.timeout_secs = 1;
        let app = apply_middleware(
            Router::new().route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    "late"
                }),
            ),
            &config,
        );
        let response = app
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 408);
        let body = body_json(response).await;
        assert_eq!(body["status"], "bad");
        assert_eq!(body["code"], 408);
        assert_eq!(body["message"], "Request Timeout");
        assert_eq!(body["data"], serde_json::Value::Null);
    }
}
