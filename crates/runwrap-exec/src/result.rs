//! Aggregated outcome of one execution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PipelineError;

const OK: u16 = 200;

/// Response document returned to callers.
///
/// Empty collections, blank streams, and a zero status are omitted on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Input logical name to local filename.
    #[serde(rename = "InFiles", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub in_files: BTreeMap<String, String>,
    /// Output filename to platform content id.
    #[serde(rename = "OutFiles", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub out_files: BTreeMap<String, String>,
    /// Captured standard output.
    #[serde(rename = "ProgStdOut", default, skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    /// Captured standard error.
    #[serde(rename = "ProgStdErr", default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    /// Every error encountered, in order.
    #[serde(rename = "Errors", default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// HTTP status for the whole request.
    #[serde(rename = "HTTPStatus", default, skip_serializing_if = "is_zero")]
    pub http_status: u16,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &u16) -> bool {
    *value == 0
}

impl Default for ExecutionResult {
    fn default() -> Self {
        Self {
            in_files: BTreeMap::new(),
            out_files: BTreeMap::new(),
            stdout: String::new(),
            stderr: String::new(),
            errors: Vec::new(),
            http_status: OK,
        }
    }
}

impl ExecutionResult {
    /// Fresh result with status 200.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Result carrying a single error, used when a request is refused outright.
    #[must_use]
    pub fn rejected(err: &PipelineError) -> Self {
        let mut result = Self::new();
        result.record(err);
        result
    }

    /// Append an error message. The status changes only for the first error.
    pub fn record(&mut self, err: &PipelineError) {
        warn!(status = err.status(), error = %err, "execution error");
        self.errors.push(err.to_string());
        if self.http_status == OK {
            self.http_status = err.status();
        }
    }

    /// Whether no error has been recorded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.http_status == OK
    }
}
