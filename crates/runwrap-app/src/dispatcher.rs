//! Task-queue worker for task-managed deployments.
//!
//! # Design
//! - Claims one task at a time from the platform queue and runs it through the
//!   same [`Executor`] that serves `/execute`, so the gate bounds both paths.
//! - The execution result is published as a text item and its content id is
//!   reported with the task outcome.
//! - Every wait is taken from [`DispatchIntervals`] so tests can shrink them.

use std::sync::Arc;
use std::time::Duration;

use runwrap_exec::{
    ANONYMOUS_USER, ExecutionRequest, ExecutionResult, Executor, PollPolicy, await_data_id,
};
use runwrap_platform::{
    IngestKind, IngestMetadata, IngestSubmission, PlatformClient, PlatformTarget,
    TaskAssignment, TaskOutcome,
};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};

/// Timing of the dispatcher loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchIntervals {
    /// Catalog lookups performed before giving up on the service id.
    pub lookup_attempts: u32,
    /// Wait between catalog lookups.
    pub lookup_delay: Duration,
    /// Wait after the queue reported no work.
    pub idle: Duration,
    /// Wait after a failed claim.
    pub after_error: Duration,
}

impl Default for DispatchIntervals {
    fn default() -> Self {
        Self {
            lookup_attempts: 10,
            lookup_delay: Duration::from_secs(15),
            idle: Duration::from_secs(60),
            after_error: Duration::from_secs(10),
        }
    }
}

/// Result of one claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The queue had nothing to do.
    Idle,
    /// The claim request failed.
    ClaimFailed,
    /// A task was processed and reported.
    Worked {
        /// Job the task belonged to.
        job_id: String,
        /// Outcome reported to the platform.
        outcome: TaskOutcome,
    },
}

/// Claims queued tasks and runs them locally.
pub struct Dispatcher {
    executor: Executor,
    platform: Arc<dyn PlatformClient>,
    target: PlatformTarget,
    service_name: String,
    intervals: DispatchIntervals,
    poll: PollPolicy,
}

impl Dispatcher {
    /// Dispatcher for the service described by the executor's profile.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::MissingPlatform`] when the profile lacks a service
    /// name, platform address, or platform credential.
    pub fn from_executor(executor: Executor) -> AppResult<Self> {
        let profile = executor.profile();
        let service_name = profile.config.svc_name.clone();
        if service_name.is_empty() {
            return Err(AppError::MissingPlatform { field: "SvcName" });
        }
        let addr = profile
            .platform_addr
            .clone()
            .ok_or(AppError::MissingPlatform { field: "PzAddr" })?;
        let auth = profile
            .platform_auth
            .clone()
            .ok_or(AppError::MissingPlatform {
                field: "APIKeyEnVar",
            })?;
        let platform = executor.platform();
        Ok(Self {
            executor,
            platform,
            target: PlatformTarget::new(addr, auth),
            service_name,
            intervals: DispatchIntervals::default(),
            poll: PollPolicy::default(),
        })
    }

    /// Override the loop timing.
    #[must_use]
    pub const fn with_intervals(mut self, intervals: DispatchIntervals) -> Self {
        self.intervals = intervals;
        self
    }

    /// Override the timing used when publishing results.
    #[must_use]
    pub const fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Locate the service, then work the queue forever.
    ///
    /// # Errors
    ///
    /// Returns an error only when the service id cannot be found.
    pub async fn run(self) -> AppResult<()> {
        let service_id = self.locate_service().await?;
        info!(service_id = %service_id, "found target service; polling for tasks");
        loop {
            match self.work_once(&service_id).await {
                Step::Idle => tokio::time::sleep(self.intervals.idle).await,
                Step::ClaimFailed => tokio::time::sleep(self.intervals.after_error).await,
                Step::Worked { .. } => {}
            }
        }
    }

    /// Look the service up by name, retrying while the catalog has no match.
    ///
    /// # Errors
    ///
    /// - [`AppError::Platform`] when a lookup fails outright.
    /// - [`AppError::ServiceNotFound`] when every attempt comes back empty.
    pub async fn locate_service(&self) -> AppResult<String> {
        let attempts = self.intervals.lookup_attempts;
        for attempt in 1..=attempts {
            let found = self
                .platform
                .find_service(&self.target, &self.service_name)
                .await
                .map_err(|err| AppError::platform("find_service", err))?;
            if let Some(service_id) = found {
                return Ok(service_id);
            }
            if attempt < attempts {
                info!(attempt, "service not registered yet; waiting");
                tokio::time::sleep(self.intervals.lookup_delay).await;
            }
        }
        Err(AppError::ServiceNotFound {
            name: self.service_name.clone(),
            attempts,
        })
    }

    /// Claim and process at most one task.
    pub async fn work_once(&self, service_id: &str) -> Step {
        match self.platform.claim_task(&self.target, service_id).await {
            Ok(Some(task)) => {
                let job_id = task.job_id.clone();
                let outcome = self.process(service_id, task).await;
                Step::Worked { job_id, outcome }
            }
            Ok(None) => Step::Idle,
            Err(err) => {
                warn!(error = %err, "failed to claim task");
                Step::ClaimFailed
            }
        }
    }

    async fn process(&self, service_id: &str, task: TaskAssignment) -> TaskOutcome {
        info!(job_id = %task.job_id, "task claimed");
        let (outcome, data_id) = match serde_json::from_str::<ExecutionRequest>(&task.content) {
            Ok(request) => {
                let redacted = serde_json::to_string(&request.redacted()).unwrap_or_default();
                let actor = if request.user_id.is_empty() {
                    ANONYMOUS_USER
                } else {
                    request.user_id.as_str()
                };
                runwrap_telemetry::audit(
                    self.executor.profile().config.log_audit,
                    actor,
                    "running task",
                    &redacted,
                );
                let result = self.executor.execute(request).await;
                match self.publish_result(&task.job_id, &result).await {
                    Ok(data_id) => (TaskOutcome::Success, Some(data_id)),
                    Err(err) => {
                        error!(job_id = %task.job_id, error = ?err, "failed to publish task result");
                        (TaskOutcome::Fail, None)
                    }
                }
            }
            Err(err) => {
                error!(job_id = %task.job_id, error = %err, "task content is not a request");
                (TaskOutcome::Fail, None)
            }
        };

        if let Err(err) = self
            .platform
            .report_task(
                &self.target,
                service_id,
                &task.job_id,
                outcome,
                data_id.as_deref(),
            )
            .await
        {
            error!(job_id = %task.job_id, error = %err, "failed to report task outcome");
        }
        outcome
    }

    async fn publish_result(&self, job_id: &str, result: &ExecutionResult) -> AppResult<String> {
        let content =
            serde_json::to_string(result).map_err(|source| AppError::Serialize { source })?;
        let submission = IngestSubmission {
            kind: IngestKind::Text,
            metadata: IngestMetadata {
                name: "Output".to_string(),
                description: format!("execution result for task {job_id}"),
                version: self.executor.profile().version.clone(),
                ..IngestMetadata::default()
            },
            file: None,
            content: Some(content),
        };
        let ingest_job = self
            .platform
            .submit_ingest(&self.target, &submission)
            .await
            .map_err(|err| AppError::platform("submit_ingest", err))?;
        await_data_id(
            self.platform.as_ref(),
            &self.target,
            &ingest_job,
            "Output",
            self.poll,
            self.executor.metrics(),
        )
        .await
        .map_err(|source| AppError::Pipeline {
            operation: "await_data_id",
            source,
        })
    }
}
