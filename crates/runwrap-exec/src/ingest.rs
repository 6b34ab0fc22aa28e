//! Output publication and the ingest completion protocol.
//!
//! # Design
//! - Submission returns a job id; the content id only appears once the job
//!   reaches `Success`, so every submission is followed by a bounded poll.
//! - Timing lives in [`PollPolicy`] and uses tokio's clock, so tests drive it
//!   with paused time instead of real sleeps.
//! - Items are published one at a time, in declaration order per category.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use runwrap_platform::{
    IngestKind, IngestMetadata, IngestSubmission, JobState, PlatformClient, PlatformTarget,
};
use runwrap_telemetry::Metrics;
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};
use crate::result::ExecutionResult;
use crate::session::Session;
use crate::workspace::Workspace;

const JOB_NOT_FOUND: &str = "Job Not Found";

/// Timing of the completion poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait before the first status query.
    pub initial_delay: Duration,
    /// Wait between successive queries.
    pub interval: Duration,
    /// Maximum number of status queries.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            interval: Duration::from_millis(200),
            max_attempts: 100,
        }
    }
}

/// Poll `job_id` until it reaches a terminal state and return its content id.
///
/// # Errors
///
/// - [`PipelineError::RemoteJob`] when the platform reports `Error` or `Fail`.
/// - [`PipelineError::UnknownStatus`] for any status outside the known set.
/// - [`PipelineError::IngestTimeout`] when `max_attempts` polls stay transient.
/// - [`PipelineError::Transfer`] when a status query fails or success carries no id.
pub async fn await_data_id(
    platform: &dyn PlatformClient,
    target: &PlatformTarget,
    job_id: &str,
    item: &str,
    policy: PollPolicy,
    metrics: &Metrics,
) -> PipelineResult<String> {
    tokio::time::sleep(policy.initial_delay).await;
    for attempt in 1..=policy.max_attempts {
        let report = platform
            .job_status(target, job_id)
            .await
            .map_err(|err| PipelineError::transfer(item, err))?;
        metrics.record_ingest_poll(report.status.as_str());
        debug!(job_id, attempt, status = %report.status, "ingest status");

        if report.status.is_transient() || report.message == JOB_NOT_FOUND {
            tokio::time::sleep(policy.interval).await;
            continue;
        }
        return match report.status {
            JobState::Success => report
                .data_id
                .filter(|id| !id.is_empty())
                .ok_or_else(|| PipelineError::transfer(item, "blank result")),
            JobState::Error | JobState::Fail => Err(PipelineError::RemoteJob {
                item: item.to_string(),
                status: report.status.to_string(),
                message: report.message,
            }),
            other => Err(PipelineError::UnknownStatus {
                item: item.to_string(),
                status: other.to_string(),
            }),
        };
    }
    Err(PipelineError::IngestTimeout {
        item: item.to_string(),
        attempts: policy.max_attempts,
    })
}

/// Compact UTC processing timestamp: `YYYYMMDD.HHMMSS` plus up to five
/// fractional digits with trailing zeros dropped.
#[must_use]
pub fn proc_time(at: DateTime<Utc>) -> String {
    let base = at.format("%Y%m%d.%H%M%S").to_string();
    let fraction = format!("{:05}", at.timestamp_subsec_micros() / 10);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        base
    } else {
        format!("{base}.{fraction}")
    }
}

/// Values shared by every item published for one execution.
pub(crate) struct Publication<'a> {
    pub(crate) platform: &'a dyn PlatformClient,
    pub(crate) target: &'a PlatformTarget,
    pub(crate) session: &'a Session,
    pub(crate) workspace: &'a Workspace,
    pub(crate) command_line: &'a str,
    pub(crate) version: &'a str,
    pub(crate) finished_at: DateTime<Utc>,
    pub(crate) policy: PollPolicy,
    pub(crate) metrics: &'a Metrics,
}

impl Publication<'_> {
    /// Publish every file in `names`, recording successes and failures on `result`.
    pub(crate) async fn publish_all(
        &self,
        kind: IngestKind,
        names: &[String],
        result: &mut ExecutionResult,
    ) {
        for name in names {
            match self.publish(kind, name).await {
                Ok(data_id) => {
                    self.metrics.record_transfer("upload", "ok");
                    self.session.audit_as_service("published output", &data_id);
                    result.out_files.insert(name.clone(), data_id);
                }
                Err(err) => {
                    self.metrics.record_transfer("upload", "failed");
                    result.record(&err);
                }
            }
        }
    }

    async fn publish(&self, kind: IngestKind, name: &str) -> PipelineResult<String> {
        let path = self.workspace.resolve(name).ok_or_else(|| {
            PipelineError::transfer(name, "output path must stay inside the workspace")
        })?;
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(PipelineError::transfer(name, "output file not found"));
        }

        let content = if kind.uploads_file() {
            None
        } else {
            Some(
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|err| PipelineError::transfer(name, err))?,
            )
        };
        let submission = IngestSubmission {
            kind,
            metadata: self.metadata(kind, name),
            file: kind.uploads_file().then_some(path),
            content,
        };

        info!(item = name, kind = kind.data_type(), "submitting ingest");
        let job_id = self
            .platform
            .submit_ingest(self.target, &submission)
            .await
            .map_err(|err| PipelineError::transfer(name, err))?;
        if job_id.is_empty() {
            return Err(PipelineError::transfer(name, "blank result"));
        }
        await_data_id(
            self.platform,
            self.target,
            &job_id,
            name,
            self.policy,
            self.metrics,
        )
        .await
    }

    fn metadata(&self, kind: IngestKind, name: &str) -> IngestMetadata {
        let mut attributes = BTreeMap::new();
        attributes.insert("algoName".to_string(), self.session.app_name.clone());
        attributes.insert("algoVersion".to_string(), self.version.to_string());
        attributes.insert("algoCmd".to_string(), self.command_line.to_string());
        attributes.insert("algoProcTime".to_string(), proc_time(self.finished_at));
        IngestMetadata {
            name: name.to_string(),
            description: format!(
                "{} output from {} for command: {}",
                kind.data_type(),
                self.session.app_name,
                self.command_line
            ),
            version: self.version.to_string(),
            metadata: attributes,
            ..IngestMetadata::default()
        }
    }
}
