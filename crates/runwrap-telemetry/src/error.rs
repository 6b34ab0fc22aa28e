//! Failures while wiring up logging and the metrics registry.

use prometheus::Error as PrometheusError;
use thiserror::Error;

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors raised while installing the subscriber or serving metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed, or installation failed.
    #[error("could not install the {format} log subscriber")]
    SubscriberInstall {
        /// Output format that was being installed.
        format: &'static str,
        /// Underlying subscriber error.
        #[source]
        source: tracing_subscriber::util::TryInitError,
    },
    /// A metric definition was rejected by prometheus.
    #[error("could not define metric {name}")]
    MetricDefine {
        /// Metric name.
        name: &'static str,
        /// Underlying prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// A metric clashed with one already in the registry.
    #[error("could not register metric {name}")]
    MetricRegister {
        /// Metric name.
        name: &'static str,
        /// Underlying prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// The `/metrics` exposition could not be produced.
    #[error("could not render metrics: {stage}")]
    Render {
        /// Which step of rendering failed.
        stage: &'static str,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_name_the_failing_metric() {
        let define = TelemetryError::MetricDefine {
            name: "executions_total",
            source: PrometheusError::Msg("bad label".to_string()),
        };
        assert_eq!(define.to_string(), "could not define metric executions_total");
        assert!(define.source().is_some());

        let register = TelemetryError::MetricRegister {
            name: "gate_waiting",
            source: PrometheusError::AlreadyReg,
        };
        assert_eq!(register.to_string(), "could not register metric gate_waiting");
    }

    #[test]
    fn render_failures_name_their_stage() {
        let utf8 = String::from_utf8(vec![0, 159]).err().map(|err| TelemetryError::Render {
            stage: "utf-8",
            source: Box::new(err),
        });
        assert_eq!(
            utf8.map(|err| err.to_string()).as_deref(),
            Some("could not render metrics: utf-8")
        );
    }
}
