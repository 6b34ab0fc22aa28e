//! # Design
//!
//! - Centralize application-level errors for bootstrap and the task dispatcher.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading or resolution failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: runwrap_config::ConfigError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: runwrap_api::ApiServerError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: runwrap_telemetry::TelemetryError,
    },
    /// Platform calls failed.
    #[error("platform operation failed")]
    Platform {
        /// Operation identifier.
        operation: &'static str,
        /// Source platform error.
        source: runwrap_platform::PlatformError,
    },
    /// Execution pipeline operations failed.
    #[error("pipeline operation failed")]
    Pipeline {
        /// Operation identifier.
        operation: &'static str,
        /// Source pipeline error.
        source: runwrap_exec::PipelineError,
    },
    /// A document could not be serialized.
    #[error("serialization failed")]
    Serialize {
        /// Source serde error.
        source: serde_json::Error,
    },
    /// The service never appeared in the platform catalog.
    #[error("service not found in platform catalog")]
    ServiceNotFound {
        /// Service name searched for.
        name: String,
        /// Lookups performed.
        attempts: u32,
    },
    /// Required platform settings were missing.
    #[error("missing platform setting")]
    MissingPlatform {
        /// Setting that was absent.
        field: &'static str,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: runwrap_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: runwrap_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: runwrap_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn platform(
        operation: &'static str,
        source: runwrap_platform::PlatformError,
    ) -> Self {
        Self::Platform { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "load",
            runwrap_config::ConfigError::Read {
                path: PathBuf::from("missing.json"),
                source: io::Error::other("gone"),
            },
        );
        assert!(matches!(config, AppError::Config { .. }));

        let api = AppError::api_server(
            "serve",
            runwrap_api::ApiServerError::Serve {
                source: io::Error::other("io"),
            },
        );
        assert!(matches!(api, AppError::ApiServer { .. }));

        let platform = AppError::platform(
            "find_service",
            runwrap_platform::PlatformError::MissingField {
                operation: "find_service",
                field: "serviceId",
            },
        );
        assert!(matches!(platform, AppError::Platform { .. }));
        assert_eq!(platform.to_string(), "platform operation failed");
    }
}
