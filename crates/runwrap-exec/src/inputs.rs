//! Input staging into the workspace.

use runwrap_platform::{PlatformClient, PlatformTarget};
use runwrap_telemetry::Metrics;
use tracing::info;

use crate::error::{PipelineError, PipelineResult};
use crate::request::ExecutionRequest;
use crate::result::ExecutionResult;
use crate::session::Session;
use crate::workspace::Workspace;

/// Fetches every declared input, recording each item independently.
pub(crate) struct Stager<'a> {
    pub(crate) platform: &'a dyn PlatformClient,
    pub(crate) session: &'a Session,
    pub(crate) workspace: &'a Workspace,
    pub(crate) metrics: &'a Metrics,
}

impl Stager<'_> {
    /// Download each platform data id, renaming to the preferred name when one is given.
    pub(crate) async fn stage_platform(
        &self,
        target: &PlatformTarget,
        request: &ExecutionRequest,
        result: &mut ExecutionResult,
    ) {
        for (index, data_id) in request.in_pz_files.iter().enumerate() {
            let fetched = self
                .fetch_platform(target, data_id, request.pz_name(index))
                .await;
            self.settle(data_id, fetched, result);
        }
    }

    /// Download each external URL, presenting the caller's credential as a bearer token.
    pub(crate) async fn stage_external(
        &self,
        request: &ExecutionRequest,
        result: &mut ExecutionResult,
    ) {
        let bearer = Some(request.ext_auth.as_str()).filter(|auth| !auth.is_empty());
        for (index, url) in request.in_ext_files.iter().enumerate() {
            let fetched = self
                .platform
                .fetch_by_url(url, bearer, self.workspace.path(), request.ext_name(index))
                .await
                .map_err(|err| PipelineError::transfer(url.as_str(), err))
                .and_then(|name| non_blank(url, name));
            self.settle(url, fetched, result);
        }
    }

    async fn fetch_platform(
        &self,
        target: &PlatformTarget,
        data_id: &str,
        desired: Option<&str>,
    ) -> PipelineResult<String> {
        let fetched = self
            .platform
            .fetch_by_id(target, data_id, self.workspace.path())
            .await
            .map_err(|err| PipelineError::transfer(data_id, err))
            .and_then(|name| non_blank(data_id, name))?;
        let Some(desired) = desired.filter(|desired| *desired != fetched) else {
            return Ok(fetched);
        };
        let (Some(from), Some(to)) = (
            self.workspace.resolve(&fetched),
            self.workspace.resolve(desired),
        ) else {
            return Err(PipelineError::transfer(
                data_id,
                format!("cannot rename {fetched} to {desired}"),
            ));
        };
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|err| PipelineError::transfer(data_id, err))?;
        Ok(desired.to_string())
    }

    fn settle(&self, item: &str, fetched: PipelineResult<String>, result: &mut ExecutionResult) {
        match fetched {
            Ok(local) => {
                info!(item, local = %local, "input staged");
                self.metrics.record_transfer("download", "ok");
                self.session.audit("staged input", item);
                result.in_files.insert(item.to_string(), local);
            }
            Err(err) => {
                self.metrics.record_transfer("download", "failed");
                result.record(&err);
            }
        }
    }
}

fn non_blank(item: &str, name: String) -> PipelineResult<String> {
    if name.trim().is_empty() {
        Err(PipelineError::transfer(item, "blank result"))
    } else {
        Ok(name)
    }
}
