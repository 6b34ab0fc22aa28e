//! The seam between the pipeline and the remote platform.

use std::path::Path;

use async_trait::async_trait;

use crate::error::PlatformResult;
use crate::model::{
    IngestSubmission, JobStatusReport, PlatformTarget, ServiceDescriptor, TaskAssignment,
    TaskOutcome,
};

/// Operations the service performs against the platform.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Confirm that the credential in `target` is accepted.
    async fn check_auth(&self, target: &PlatformTarget) -> PlatformResult<()>;

    /// Download a stored item into `dest_dir`, returning the local filename.
    async fn fetch_by_id(
        &self,
        target: &PlatformTarget,
        data_id: &str,
        dest_dir: &Path,
    ) -> PlatformResult<String>;

    /// Download an arbitrary URL into `dest_dir`, returning the local filename.
    async fn fetch_by_url(
        &self,
        url: &str,
        bearer: Option<&str>,
        dest_dir: &Path,
        desired_name: Option<&str>,
    ) -> PlatformResult<String>;

    /// Submit an ingest job and return its job id.
    async fn submit_ingest(
        &self,
        target: &PlatformTarget,
        submission: &IngestSubmission,
    ) -> PlatformResult<String>;

    /// Read the current status of an ingest job.
    async fn job_status(
        &self,
        target: &PlatformTarget,
        job_id: &str,
    ) -> PlatformResult<JobStatusReport>;

    /// Look up a service owned by the caller by name.
    async fn find_service(
        &self,
        target: &PlatformTarget,
        name: &str,
    ) -> PlatformResult<Option<String>>;

    /// Create a service registration, returning the assigned id when reported.
    async fn register_service(
        &self,
        target: &PlatformTarget,
        descriptor: &ServiceDescriptor,
    ) -> PlatformResult<Option<String>>;

    /// Replace an existing service registration.
    async fn update_service(
        &self,
        target: &PlatformTarget,
        service_id: &str,
        descriptor: &ServiceDescriptor,
    ) -> PlatformResult<()>;

    /// Claim the next queued task for a service, if any.
    async fn claim_task(
        &self,
        target: &PlatformTarget,
        service_id: &str,
    ) -> PlatformResult<Option<TaskAssignment>>;

    /// Report the outcome of a claimed task.
    async fn report_task(
        &self,
        target: &PlatformTarget,
        service_id: &str,
        job_id: &str,
        outcome: TaskOutcome,
        data_id: Option<&str>,
    ) -> PlatformResult<()>;
}
