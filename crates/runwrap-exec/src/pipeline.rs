//! Execution pipeline orchestration.
//!
//! # Design
//! - Fatal problems (authorization, configuration switches, workspace setup)
//!   short-circuit through `?`; per-item transfer failures are folded into the
//!   result and the pipeline carries on.
//! - The gate permit and workspace are RAII guards, so every exit path releases
//!   the slot and removes the directory.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use runwrap_config::ServiceProfile;
use runwrap_platform::{IngestKind, PlatformClient, PlatformTarget};
use runwrap_telemetry::Metrics;
use tracing::{Instrument, info, info_span};

use crate::error::{PipelineError, PipelineResult};
use crate::gate::ConcurrencyGate;
use crate::ids::pseudo_uuid;
use crate::ingest::{PollPolicy, Publication};
use crate::inputs::Stager;
use crate::request::ExecutionRequest;
use crate::result::ExecutionResult;
use crate::runner::{build_argv, disambiguate, run_command};
use crate::session::Session;
use crate::workspace::Workspace;

/// Runs execution requests against the configured command.
#[derive(Clone)]
pub struct Executor {
    profile: Arc<ServiceProfile>,
    platform: Arc<dyn PlatformClient>,
    gate: ConcurrencyGate,
    metrics: Metrics,
    poll: PollPolicy,
}

impl Executor {
    /// Executor whose gate capacity comes from the profile.
    #[must_use]
    pub fn new(
        profile: Arc<ServiceProfile>,
        platform: Arc<dyn PlatformClient>,
        metrics: Metrics,
    ) -> Self {
        let gate = ConcurrencyGate::new(profile.gate_capacity(), metrics.clone());
        Self {
            profile,
            platform,
            gate,
            metrics,
            poll: PollPolicy::default(),
        }
    }

    /// Override the ingest completion timing.
    #[must_use]
    pub const fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Resolved service profile.
    #[must_use]
    pub fn profile(&self) -> &ServiceProfile {
        &self.profile
    }

    /// Shared concurrency gate.
    #[must_use]
    pub const fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Metrics registry the pipeline reports into.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Platform client used for transfers.
    #[must_use]
    pub fn platform(&self) -> Arc<dyn PlatformClient> {
        Arc::clone(&self.platform)
    }

    /// Run one request to completion.
    ///
    /// Never fails: every problem is reported through the returned result's
    /// `Errors` and `HTTPStatus`.
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let started = Instant::now();
        let mut result = ExecutionResult::new();
        if let Err(err) = self.run(&request, &mut result).await {
            result.record(&err);
        }
        let outcome = if result.is_success() { "ok" } else { "failed" };
        self.metrics.record_execution(outcome, started.elapsed());
        info!(
            outcome,
            status = result.http_status,
            errors = result.errors.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "execution finished"
        );
        result
    }

    async fn run(
        &self,
        request: &ExecutionRequest,
        result: &mut ExecutionResult,
    ) -> PipelineResult<()> {
        let _permit = self.gate.acquire().await?;
        let session = Session::for_request(&self.profile, request, pseudo_uuid()?);
        let span = info_span!(
            "execution",
            session = %session.session_id,
            user = %session.user_id
        );
        self.run_session(request, &session, result)
            .instrument(span)
            .await
    }

    async fn run_session(
        &self,
        request: &ExecutionRequest,
        session: &Session,
        result: &mut ExecutionResult,
    ) -> PipelineResult<()> {
        let redacted = serde_json::to_string(&request.redacted()).unwrap_or_default();
        session.audit("received execution request", &redacted);
        info!(request = %redacted, "execution request");

        let argv = build_argv(&self.profile.config.cli_cmd, &request.cmd);
        if argv.is_empty() {
            return Err(PipelineError::MissingCommand);
        }
        let target = if request.needs_platform() {
            Some(self.authorize(session).await?)
        } else {
            None
        };
        self.check_switches(request)?;

        let workspace = Workspace::open(&self.profile.work_dir, &session.session_id).await?;
        let stager = Stager {
            platform: self.platform.as_ref(),
            session,
            workspace: &workspace,
            metrics: &self.metrics,
        };
        if let Some(target) = &target {
            stager.stage_platform(target, request, result).await;
        }
        stager.stage_external(request, result).await;

        let command_line = argv.join(" ");
        let argv = disambiguate(argv, &self.profile.work_dir);
        session.audit("running command", &command_line);
        let outcome = run_command(&argv, workspace.path(), self.profile.max_run_time()).await;
        result.stdout = outcome.stdout;
        result.stderr = outcome.stderr;
        if let Some(failure) = outcome.failure {
            result.record(&failure);
        }

        if let Some(target) = &target {
            let publication = Publication {
                platform: self.platform.as_ref(),
                target,
                session,
                workspace: &workspace,
                command_line: &command_line,
                version: &self.profile.version,
                finished_at: Utc::now(),
                policy: self.poll,
                metrics: &self.metrics,
            };
            publication
                .publish_all(IngestKind::Raster, &request.out_tiffs, result)
                .await;
            publication
                .publish_all(IngestKind::Text, &request.out_txts, result)
                .await;
            publication
                .publish_all(IngestKind::GeoJson, &request.out_geojson, result)
                .await;
        }

        workspace.close()
    }

    async fn authorize(&self, session: &Session) -> PipelineResult<PlatformTarget> {
        if session.platform_addr.is_none() {
            return Err(PipelineError::Authorization {
                reason: "No platform address",
            });
        }
        let target = session.target().ok_or(PipelineError::Authorization {
            reason: "Auth Key not available",
        })?;
        self.platform
            .check_auth(&target)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "platform rejected credential");
                PipelineError::Authorization {
                    reason: "Could not confirm auth",
                }
            })?;
        Ok(target)
    }

    fn check_switches(&self, request: &ExecutionRequest) -> PipelineResult<()> {
        let config = &self.profile.config;
        if !request.in_ext_files.is_empty() && !config.can_downl_ext {
            return Err(PipelineError::ConfigDisabled {
                action: "downloading external files",
            });
        }
        if !request.in_pz_files.is_empty() && !config.can_downl_pz {
            return Err(PipelineError::ConfigDisabled {
                action: "downloading platform files",
            });
        }
        if request.has_outputs() && !config.can_upload {
            return Err(PipelineError::ConfigDisabled {
                action: "uploading output files",
            });
        }
        Ok(())
    }
}
