//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::Request,
    routing::{any, get},
};
use runwrap_exec::Executor;
use runwrap_telemetry::{build_sha, set_request_context};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::constants::HEADER_REQUEST_ID;
use crate::http::handlers::{attributes, description, execute, fallback, greeting, help, version};
use crate::http::health::{health, metrics};
use crate::http::telemetry::RouteMetricsLayer;
use crate::state::ApiState;

/// Axum router wrapper hosting the runwrap endpoints.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Build the router around `executor`.
    #[must_use]
    pub fn new(executor: Executor) -> Self {
        let metrics = executor.metrics().clone();
        let state = Arc::new(ApiState::new(executor));
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                let span = tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = tracing::field::Empty,
                    request_id = tracing::field::Empty,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                );
                set_request_context(&span, request_id, request.uri().path());
                span
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(runwrap_telemetry::propagate_request_id_layer())
            .layer(runwrap_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(RouteMetricsLayer::new(metrics));

        let router = Self::routes()
            .fallback(fallback)
            .layer(layered)
            .with_state(state);
        Self { router }
    }

    fn routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/", get(greeting))
            .route("/execute", any(execute))
            .route("/description", get(description))
            .route("/attributes", get(attributes))
            .route("/version", get(version))
            .route("/help", get(help))
            .route("/health", get(health))
            .route("/metrics", get(metrics))
    }

    /// Serve the API on the provided socket until the listener closes.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        tracing::info!(%addr, "starting API");
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        axum::serve(listener, self.router.into_make_service())
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }

    /// Router for in-process callers and tests.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, StatusCode};
    use runwrap_config::ServiceConfig;
    use runwrap_telemetry::Metrics;
    use runwrap_test_support::{ScriptedPlatform, install_dir, profile_in};
    use tower::Service;

    #[tokio::test]
    async fn routed_execute_counts_requests_and_echoes_request_id() -> anyhow::Result<()> {
        let install = install_dir()?;
        let config = ServiceConfig {
            cli_cmd: "echo".to_string(),
            ..ServiceConfig::default()
        };
        let profile = profile_in(install.path(), config, None)?;
        let metrics = Metrics::new()?;
        let executor = Executor::new(
            Arc::new(profile),
            Arc::new(ScriptedPlatform::new()),
            metrics.clone(),
        );
        let mut router = ApiServer::new(executor).into_router();

        let request = Request::builder()
            .method(Method::PUT)
            .uri("/execute")
            .header(HEADER_REQUEST_ID, "req-7")
            .body(Body::empty())?;
        let response = router.call(request).await?;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response
                .headers()
                .get(HEADER_REQUEST_ID)
                .and_then(|value| value.to_str().ok()),
            Some("req-7")
        );

        let missing = Request::builder().uri("/nope").body(Body::empty())?;
        let response = router.call(missing).await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        assert!(String::from_utf8(body.to_vec())?.contains("Try /help"));

        let rendered = metrics.render()?;
        assert!(rendered.contains("route=\"/execute\""), "{rendered}");
        assert!(rendered.contains("route=\"unmatched\""), "{rendered}");
        assert!(!rendered.contains("/nope"), "{rendered}");
        Ok(())
    }
}
