//! Health and diagnostics endpoints.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::Response,
};
use runwrap_telemetry::{MetricsSnapshot, build_sha};
use serde::Serialize;
use tracing::error;

use crate::state::ApiState;

#[derive(Serialize)]
pub(crate) struct GateHealth {
    pub(crate) capacity: Option<usize>,
    pub(crate) available: Option<usize>,
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) service: String,
    pub(crate) build: String,
    pub(crate) version: String,
    pub(crate) gate: GateHealth,
    pub(crate) metrics: MetricsSnapshot,
}

pub(crate) async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let gate = state.executor.gate();
    Json(HealthResponse {
        status: "ok",
        service: state.config().app_name().to_string(),
        build: build_sha().to_string(),
        version: state.version().to_string(),
        gate: GateHealth {
            capacity: gate.capacity(),
            available: gate.available(),
        },
        metrics: state.metrics().snapshot(),
    })
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Response {
    let rendered = state.metrics().render().map_err(|err| err.to_string());
    let built = match rendered {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(Body::from(body)),
        Err(message) => {
            error!(error = %message, "failed to render metrics");
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from("failed to render metrics"))
        }
    };
    built.unwrap_or_else(|err| {
        error!(error = %err, "failed to build metrics response");
        let mut fallback = Response::new(Body::empty());
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}
