//! Execution and informational handlers.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use runwrap_exec::{ExecutionRequest, ExecutionResult, PipelineError};
use serde_json::{Map, Value};
use tracing::info;

use crate::state::ApiState;

const HELP: &str = "\
runwrap endpoints:
- '/': entry point; names the wrapped service and suggests other endpoints.
- '/execute': downloads inputs, runs the configured command, and publishes the outputs.
  POST a JSON request with cmd, inPzFiles, inExtFiles, outTiffs, outTxts, outGeoJson and related fields.
- '/description': description of this service instance.
- '/attributes': key/value attributes of this service instance.
- '/version': version of the wrapped command line tool.
- '/health': execution gate and counters.
- '/metrics': Prometheus metrics.
- '/help': this screen.
";

pub(crate) async fn greeting(State(state): State<Arc<ApiState>>) -> String {
    let service = &state.config().svc_name;
    let serving = if service.is_empty() {
        String::new()
    } else {
        format!(", serving {service}")
    };
    format!(
        "Hello. This is runwrap{serving}.\nWere you possibly looking for the /help or /execute endpoints?"
    )
}

pub(crate) async fn execute(
    State(state): State<Arc<ApiState>>,
    method: Method,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        let rejected = ExecutionResult::rejected(&PipelineError::MethodNotAllowed {
            method: method.to_string(),
        });
        return result_response(rejected);
    }
    let request = match serde_json::from_slice::<ExecutionRequest>(&body) {
        Ok(request) => request,
        Err(err) => {
            let rejected = ExecutionResult::rejected(&PipelineError::MalformedRequest {
                reason: err.to_string(),
            });
            return result_response(rejected);
        }
    };
    let result = state.executor.execute(request).await;
    info!(status = result.http_status, "execute request served");
    result_response(result)
}

fn result_response(result: ExecutionResult) -> Response {
    let status =
        StatusCode::from_u16(result.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(result)).into_response()
}

pub(crate) async fn description(State(state): State<Arc<ApiState>>) -> String {
    let description = &state.config().description;
    if description.is_empty() {
        "No description defined".to_string()
    } else {
        description.clone()
    }
}

pub(crate) async fn attributes(State(state): State<Arc<ApiState>>) -> Json<Value> {
    let attributes = state
        .config()
        .attributes
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect::<Map<_, _>>();
    Json(Value::Object(attributes))
}

pub(crate) async fn version(State(state): State<Arc<ApiState>>) -> String {
    state.version().to_string()
}

pub(crate) async fn help() -> &'static str {
    HELP
}

pub(crate) async fn fallback() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Endpoint undefined. Try /help?\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use runwrap_config::ServiceConfig;
    use runwrap_exec::Executor;
    use runwrap_telemetry::Metrics;
    use runwrap_test_support::{ScriptedPlatform, install_dir, profile_in};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn state(config: ServiceConfig) -> anyhow::Result<(TempDir, Arc<ApiState>)> {
        let install = install_dir()?;
        let profile = profile_in(install.path(), config, None)?.with_version("1.2.3");
        let executor = Executor::new(
            Arc::new(profile),
            Arc::new(ScriptedPlatform::new()),
            Metrics::new()?,
        );
        Ok((install, Arc::new(ApiState::new(executor))))
    }

    async fn body_json(response: Response) -> anyhow::Result<Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn non_post_execute_is_405() -> anyhow::Result<()> {
        let (_install, state) = state(ServiceConfig::default())?;
        let response = execute(State(state), Method::GET, Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = body_json(response).await?;
        assert_eq!(body["HTTPStatus"], 405);
        assert_eq!(body["Errors"].as_array().map(Vec::len), Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_body_is_400() -> anyhow::Result<()> {
        let (_install, state) = state(ServiceConfig::default())?;
        let response = execute(State(state), Method::POST, Bytes::from_static(b"{not json")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await?;
        let message = body["Errors"][0].as_str().unwrap_or_default();
        assert!(message.starts_with("could not interpret request body"), "{message}");
        Ok(())
    }

    #[tokio::test]
    async fn execute_status_mirrors_result() -> anyhow::Result<()> {
        let (_install, state) = state(ServiceConfig {
            cli_cmd: "echo".to_string(),
            ..ServiceConfig::default()
        })?;
        let response = execute(
            State(state),
            Method::POST,
            Bytes::from_static(br#"{"cmd":"hello"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await?;
        assert_eq!(body["ProgStdOut"], "hello\n");
        assert_eq!(body["HTTPStatus"], 200);
        assert!(body.get("Errors").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn informational_routes_reflect_config() -> anyhow::Result<()> {
        let mut configured = BTreeMap::new();
        configured.insert("band".to_string(), "red".to_string());
        let (_install, state) = state(ServiceConfig {
            svc_name: "ndvi".to_string(),
            description: "vegetation index".to_string(),
            attributes: configured,
            ..ServiceConfig::default()
        })?;

        assert!(greeting(State(Arc::clone(&state))).await.contains("serving ndvi"));
        assert_eq!(description(State(Arc::clone(&state))).await, "vegetation index");
        assert_eq!(version(State(Arc::clone(&state))).await, "1.2.3");
        let Json(attrs) = attributes(State(state)).await;
        assert_eq!(attrs, serde_json::json!({ "band": "red" }));
        assert!(help().await.contains("/execute"));
        Ok(())
    }

    #[tokio::test]
    async fn empty_attributes_render_as_empty_object() -> anyhow::Result<()> {
        let (_install, state) = state(ServiceConfig::default())?;
        let Json(attrs) = attributes(State(Arc::clone(&state))).await;
        assert_eq!(attrs, serde_json::json!({}));
        assert_eq!(description(State(state)).await, "No description defined");
        Ok(())
    }
}
