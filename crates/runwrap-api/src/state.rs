//! Shared state handed to every handler.

use runwrap_config::ServiceConfig;
use runwrap_exec::Executor;
use runwrap_telemetry::Metrics;

/// Dependencies the HTTP handlers need.
#[derive(Clone)]
pub struct ApiState {
    pub(crate) executor: Executor,
}

impl ApiState {
    /// Wrap the executor serving `/execute`.
    #[must_use]
    pub const fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub(crate) fn config(&self) -> &ServiceConfig {
        &self.executor.profile().config
    }

    pub(crate) fn version(&self) -> &str {
        &self.executor.profile().version
    }

    pub(crate) const fn metrics(&self) -> &Metrics {
        self.executor.metrics()
    }
}
