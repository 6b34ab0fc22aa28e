//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Collector registration is private; callers only see typed recording methods.
//! - Label values are short fixed vocabularies (`ok`, `failed`, `download`, ...) so
//!   series cardinality stays bounded.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{
    Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder, core::Collector,
};
use serde::Serialize;

use crate::error::{TelemetryError, TelemetryResult};

/// Metrics registry shared by the HTTP surface, the pipeline, and the dispatcher.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    executions_total: IntCounterVec,
    executions_active: IntGauge,
    gate_waiting: IntGauge,
    transfers_total: IntCounterVec,
    ingest_polls_total: IntCounterVec,
    last_execution_ms: IntGauge,
}

/// Point-in-time view of the gauges and counters reported by `/health`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Executions currently holding a gate permit.
    pub executions_active: i64,
    /// Requests waiting for a gate permit.
    pub gate_waiting: i64,
    /// Executions that finished with HTTP status 200.
    pub executions_ok: u64,
    /// Executions that recorded at least one error.
    pub executions_failed: u64,
    /// Wall-clock time of the most recent execution in milliseconds.
    pub last_execution_ms: i64,
}

impl Metrics {
    /// Construct a registry with every runwrap collector registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a collector cannot be built or registered.
    pub fn new() -> TelemetryResult<Self> {
        let registry = Registry::new();

        let http_requests_total = counter_vec(
            "http_requests_total",
            "Total HTTP requests received",
            &["route", "code"],
        )?;
        let executions_total = counter_vec(
            "executions_total",
            "Completed executions by outcome",
            &["outcome"],
        )?;
        let executions_active = gauge("executions_active", "Executions currently running")?;
        let gate_waiting = gauge("gate_waiting", "Requests waiting on the concurrency gate")?;
        let transfers_total = counter_vec(
            "transfers_total",
            "File transfers by direction and outcome",
            &["direction", "outcome"],
        )?;
        let ingest_polls_total = counter_vec(
            "ingest_polls_total",
            "Ingest job status polls by observed status",
            &["status"],
        )?;
        let last_execution_ms = gauge(
            "last_execution_ms",
            "Duration of the most recent execution (ms)",
        )?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "executions_total", &executions_total)?;
        register(&registry, "executions_active", &executions_active)?;
        register(&registry, "gate_waiting", &gate_waiting)?;
        register(&registry, "transfers_total", &transfers_total)?;
        register(&registry, "ingest_polls_total", &ingest_polls_total)?;
        register(&registry, "last_execution_ms", &last_execution_ms)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                executions_total,
                executions_active,
                gate_waiting,
                transfers_total,
                ingest_polls_total,
                last_execution_ms,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Record a finished execution.
    pub fn record_execution(&self, outcome: &str, elapsed: Duration) {
        self.inner
            .executions_total
            .with_label_values(&[outcome])
            .inc();
        self.inner
            .last_execution_ms
            .set(Self::duration_to_ms(elapsed));
    }

    /// Mark an execution as having acquired the gate.
    pub fn execution_started(&self) {
        self.inner.executions_active.inc();
    }

    /// Mark an execution as having released the gate.
    pub fn execution_finished(&self) {
        self.inner.executions_active.dec();
    }

    /// Adjust the count of requests queued on the gate.
    pub fn gate_waiting_delta(&self, delta: i64) {
        self.inner.gate_waiting.add(delta);
    }

    /// Count a file transfer.
    pub fn record_transfer(&self, direction: &str, outcome: &str) {
        self.inner
            .transfers_total
            .with_label_values(&[direction, outcome])
            .inc();
    }

    /// Count one ingest status poll.
    pub fn record_ingest_poll(&self, status: &str) {
        self.inner
            .ingest_polls_total
            .with_label_values(&[status])
            .inc();
    }

    /// Render the registry in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the output is not UTF-8.
    pub fn render(&self) -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|source| TelemetryError::Render {
                stage: "encode",
                source: Box::new(source),
            })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::Render {
            stage: "utf-8",
            source: Box::new(source),
        })
    }

    /// Take a snapshot of the values surfaced on the health endpoint.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            executions_active: self.inner.executions_active.get(),
            gate_waiting: self.inner.gate_waiting.get(),
            executions_ok: self.inner.executions_total.with_label_values(&["ok"]).get(),
            executions_failed: self
                .inner
                .executions_total
                .with_label_values(&["failed"])
                .get(),
            last_execution_ms: self.inner.last_execution_ms.get(),
        }
    }

    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> TelemetryResult<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricDefine { name, source })
}

fn gauge(name: &'static str, help: &str) -> TelemetryResult<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricDefine { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> TelemetryResult<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricRegister { name, source })
}
