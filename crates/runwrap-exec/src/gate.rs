//! Concurrency gate bounding simultaneous executions.
//!
//! # Design
//! - Backed by a tokio [`Semaphore`], whose waiters are served in FIFO order.
//! - A capacity of `None` means unbounded; acquiring never waits.
//! - The slot is an RAII [`GatePermit`]; dropping it on any exit path releases it.
//! - The waiting gauge is also guarded, so an abandoned acquire still leaves it balanced.

use std::io;
use std::sync::Arc;

use runwrap_telemetry::Metrics;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{PipelineError, PipelineResult};

/// Shared limiter handed to every pipeline.
#[derive(Clone)]
pub struct ConcurrencyGate {
    semaphore: Option<Arc<Semaphore>>,
    capacity: Option<usize>,
    metrics: Metrics,
}

/// One held execution slot.
pub struct GatePermit {
    _permit: Option<OwnedSemaphorePermit>,
    metrics: Metrics,
}

impl ConcurrencyGate {
    /// Gate allowing `capacity` concurrent holders, or unbounded when `None`.
    ///
    /// Capacities beyond [`Semaphore::MAX_PERMITS`] are clamped to it.
    #[must_use]
    pub fn new(capacity: Option<usize>, metrics: Metrics) -> Self {
        let capacity = capacity
            .filter(|value| *value > 0)
            .map(|value| value.min(Semaphore::MAX_PERMITS));
        Self {
            semaphore: capacity.map(|permits| Arc::new(Semaphore::new(permits))),
            capacity,
            metrics,
        }
    }

    /// Configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Slots currently free, or `None` when unbounded.
    #[must_use]
    pub fn available(&self) -> Option<usize> {
        self.semaphore
            .as_ref()
            .map(|semaphore| semaphore.available_permits())
    }

    /// Wait for a slot.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Internal`] if the semaphore has been closed.
    pub async fn acquire(&self) -> PipelineResult<GatePermit> {
        let permit = match &self.semaphore {
            Some(semaphore) => {
                let waiting = Waiting::enter(&self.metrics);
                let acquired = Arc::clone(semaphore).acquire_owned().await;
                drop(waiting);
                Some(acquired.map_err(|err| {
                    PipelineError::internal("acquire execution slot", io::Error::other(err))
                })?)
            }
            None => None,
        };
        self.metrics.execution_started();
        Ok(GatePermit {
            _permit: permit,
            metrics: self.metrics.clone(),
        })
    }
}

struct Waiting<'a>(&'a Metrics);

impl<'a> Waiting<'a> {
    fn enter(metrics: &'a Metrics) -> Self {
        metrics.gate_waiting_delta(1);
        Self(metrics)
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.0.gate_waiting_delta(-1);
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.metrics.execution_finished();
    }
}
