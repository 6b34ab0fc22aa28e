//! In-memory [`PlatformClient`] driven by a script.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use runwrap_platform::{
    IngestKind, IngestSubmission, JobStatusReport, PlatformClient, PlatformError,
    PlatformResult, PlatformTarget, ServiceDescriptor, TaskAssignment, TaskOutcome,
};

/// One recorded interaction with the double.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    /// `check_auth` with the presented credential.
    CheckAuth(String),
    /// `fetch_by_id` for a data id.
    FetchById(String),
    /// `fetch_by_url` for a URL and the bearer presented.
    FetchByUrl(String, Option<String>),
    /// `submit_ingest` for an item.
    SubmitIngest {
        /// Category submitted.
        kind: IngestKind,
        /// Metadata name.
        name: String,
        /// Inline content, for text items.
        content: Option<String>,
        /// Whether a file part was attached.
        with_file: bool,
    },
    /// `job_status` for a job id.
    JobStatus(String),
    /// `find_service` by name.
    FindService(String),
    /// `register_service` by name.
    RegisterService(String),
    /// `update_service` by id.
    UpdateService(String),
    /// `claim_task` for a service id.
    ClaimTask(String),
    /// `report_task` for a job.
    ReportTask {
        /// Job reported.
        job_id: String,
        /// Reported outcome.
        outcome: TaskOutcome,
        /// Result data id, when reported.
        data_id: Option<String>,
    },
}

#[derive(Debug, Clone)]
enum FetchScript {
    File { name: String, body: String },
    Status(u16),
}

#[derive(Debug, Default)]
struct ScriptState {
    reject_auth: bool,
    fetches: HashMap<String, FetchScript>,
    statuses: VecDeque<JobStatusReport>,
    status_fallback: Option<JobStatusReport>,
    failing_ingests: HashSet<String>,
    next_job: u64,
    find_results: VecDeque<PlatformResult<Option<String>>>,
    tasks: VecDeque<PlatformResult<Option<TaskAssignment>>>,
    calls: Vec<PlatformCall>,
}

/// Scripted stand-in for the platform.
///
/// Job status reports are consumed from a single queue shared by every job;
/// once it is empty each poll answers with the fallback, which defaults to
/// `Success` carrying `data-<job id>`.
#[derive(Debug, Default)]
pub struct ScriptedPlatform {
    state: Mutex<ScriptState>,
}

impl ScriptedPlatform {
    /// Double that accepts every credential and knows no files.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `check_auth` fail with 401.
    #[must_use]
    pub fn rejecting_auth(self) -> Self {
        self.state().reject_auth = true;
        self
    }

    /// Serve `body` as `name` for a data id or URL.
    #[must_use]
    pub fn with_file(self, reference: &str, name: &str, body: &str) -> Self {
        self.state().fetches.insert(
            reference.to_string(),
            FetchScript::File {
                name: name.to_string(),
                body: body.to_string(),
            },
        );
        self
    }

    /// Answer fetches of `reference` with an HTTP error status.
    #[must_use]
    pub fn with_fetch_status(self, reference: &str, status: u16) -> Self {
        self.state()
            .fetches
            .insert(reference.to_string(), FetchScript::Status(status));
        self
    }

    /// Queue job status reports, returned in order across all jobs.
    #[must_use]
    pub fn with_statuses<I>(self, reports: I) -> Self
    where
        I: IntoIterator<Item = JobStatusReport>,
    {
        self.state().statuses.extend(reports);
        self
    }

    /// Report returned once the queued statuses are exhausted.
    #[must_use]
    pub fn with_status_fallback(self, report: JobStatusReport) -> Self {
        self.state().status_fallback = Some(report);
        self
    }

    /// Fail ingest submission for items with this metadata name.
    #[must_use]
    pub fn failing_ingest(self, name: &str) -> Self {
        self.state().failing_ingests.insert(name.to_string());
        self
    }

    /// Queue results for successive `find_service` calls. Defaults to `Ok(None)`.
    #[must_use]
    pub fn with_find_results<I>(self, results: I) -> Self
    where
        I: IntoIterator<Item = PlatformResult<Option<String>>>,
    {
        self.state().find_results.extend(results);
        self
    }

    /// Queue results for successive `claim_task` calls. Defaults to `Ok(None)`.
    #[must_use]
    pub fn with_tasks<I>(self, tasks: I) -> Self
    where
        I: IntoIterator<Item = PlatformResult<Option<TaskAssignment>>>,
    {
        self.state().tasks.extend(tasks);
        self
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state().calls.clone()
    }

    /// Number of `job_status` polls made so far.
    #[must_use]
    pub fn status_polls(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| matches!(call, PlatformCall::JobStatus(_)))
            .count()
    }

    fn record(&self, call: PlatformCall) {
        self.state().calls.push(call);
    }

    async fn serve_fetch(
        &self,
        operation: &'static str,
        reference: &str,
        dest_dir: &Path,
        desired_name: Option<&str>,
    ) -> PlatformResult<String> {
        let script = self.state().fetches.get(reference).cloned();
        match script {
            Some(FetchScript::File { name, body }) => {
                let name = desired_name
                    .filter(|desired| !desired.is_empty())
                    .map_or(name, str::to_string);
                let path = dest_dir.join(&name);
                tokio::fs::write(&path, body)
                    .await
                    .map_err(|source| PlatformError::Io {
                        operation,
                        path,
                        source,
                    })?;
                Ok(name)
            }
            Some(FetchScript::Status(status)) => Err(status_error(operation, reference, status)),
            None => Err(status_error(operation, reference, 404)),
        }
    }
}

fn status_error(operation: &'static str, url: &str, status: u16) -> PlatformError {
    PlatformError::Status {
        operation,
        url: url.to_string(),
        status,
    }
}

#[async_trait]
impl PlatformClient for ScriptedPlatform {
    async fn check_auth(&self, target: &PlatformTarget) -> PlatformResult<()> {
        self.record(PlatformCall::CheckAuth(target.auth.clone()));
        if self.state().reject_auth {
            return Err(status_error("check_auth", &target.addr, 401));
        }
        Ok(())
    }

    async fn fetch_by_id(
        &self,
        _target: &PlatformTarget,
        data_id: &str,
        dest_dir: &Path,
    ) -> PlatformResult<String> {
        self.record(PlatformCall::FetchById(data_id.to_string()));
        self.serve_fetch("fetch_by_id", data_id, dest_dir, None)
            .await
    }

    async fn fetch_by_url(
        &self,
        url: &str,
        bearer: Option<&str>,
        dest_dir: &Path,
        desired_name: Option<&str>,
    ) -> PlatformResult<String> {
        self.record(PlatformCall::FetchByUrl(
            url.to_string(),
            bearer.map(str::to_string),
        ));
        self.serve_fetch("fetch_by_url", url, dest_dir, desired_name)
            .await
    }

    async fn submit_ingest(
        &self,
        target: &PlatformTarget,
        submission: &IngestSubmission,
    ) -> PlatformResult<String> {
        self.record(PlatformCall::SubmitIngest {
            kind: submission.kind,
            name: submission.metadata.name.clone(),
            content: submission.content.clone(),
            with_file: submission.file.is_some(),
        });
        let job = {
            let mut state = self.state();
            if state.failing_ingests.contains(&submission.metadata.name) {
                None
            } else {
                state.next_job += 1;
                Some(state.next_job)
            }
        };
        job.map(|job| format!("job-{job}"))
            .ok_or_else(|| status_error("submit_ingest", &target.addr, 500))
    }

    async fn job_status(
        &self,
        _target: &PlatformTarget,
        job_id: &str,
    ) -> PlatformResult<JobStatusReport> {
        self.record(PlatformCall::JobStatus(job_id.to_string()));
        let scripted = self.state().statuses.pop_front();
        let report = scripted
            .or_else(|| self.state().status_fallback.clone())
            .unwrap_or_else(|| {
                JobStatusReport::new("Success", "", Some(&format!("data-{job_id}")))
            });
        Ok(report)
    }

    async fn find_service(
        &self,
        _target: &PlatformTarget,
        name: &str,
    ) -> PlatformResult<Option<String>> {
        self.record(PlatformCall::FindService(name.to_string()));
        self.state().find_results.pop_front().unwrap_or(Ok(None))
    }

    async fn register_service(
        &self,
        _target: &PlatformTarget,
        descriptor: &ServiceDescriptor,
    ) -> PlatformResult<Option<String>> {
        let name = descriptor.resource_metadata.name.clone();
        self.record(PlatformCall::RegisterService(name.clone()));
        Ok(Some(format!("svc-{name}")))
    }

    async fn update_service(
        &self,
        _target: &PlatformTarget,
        service_id: &str,
        _descriptor: &ServiceDescriptor,
    ) -> PlatformResult<()> {
        self.record(PlatformCall::UpdateService(service_id.to_string()));
        Ok(())
    }

    async fn claim_task(
        &self,
        _target: &PlatformTarget,
        service_id: &str,
    ) -> PlatformResult<Option<TaskAssignment>> {
        self.record(PlatformCall::ClaimTask(service_id.to_string()));
        self.state().tasks.pop_front().unwrap_or(Ok(None))
    }

    async fn report_task(
        &self,
        _target: &PlatformTarget,
        _service_id: &str,
        job_id: &str,
        outcome: TaskOutcome,
        data_id: Option<&str>,
    ) -> PlatformResult<()> {
        self.record(PlatformCall::ReportTask {
            job_id: job_id.to_string(),
            outcome,
            data_id: data_id.map(str::to_string),
        });
        Ok(())
    }
}
