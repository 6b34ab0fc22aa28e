//! Failure taxonomy for the execution pipeline.
//!
//! Every variant renders a caller-facing message, since the `Display` output
//! is what lands in the result's `Errors` list.

use std::io;

use thiserror::Error;

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised while servicing one execution request.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request used a method other than POST.
    #[error("method {method} not allowed; use POST")]
    MethodNotAllowed {
        /// Method received.
        method: String,
    },
    /// The request body could not be interpreted.
    #[error("could not interpret request body: {reason}")]
    MalformedRequest {
        /// Parser diagnostic.
        reason: String,
    },
    /// Neither the configured prefix nor the request supplied a command.
    #[error("no command to run")]
    MissingCommand,
    /// Platform access is required but not available or not accepted.
    #[error("{reason}")]
    Authorization {
        /// Short description of what was missing or refused.
        reason: &'static str,
    },
    /// The requested transfer is turned off in configuration.
    #[error("{action} is disabled by configuration")]
    ConfigDisabled {
        /// Action that was refused.
        action: &'static str,
    },
    /// One input or output item failed to move.
    #[error("{item}: {reason}")]
    Transfer {
        /// Logical name of the item.
        item: String,
        /// Description of the failure.
        reason: String,
    },
    /// The command failed to start, exited unsuccessfully, or ran too long.
    #[error("command failed: {reason}")]
    Execution {
        /// Description of the failure.
        reason: String,
    },
    /// The ingest job never reached a terminal state.
    #[error("{item}: Never completed.")]
    IngestTimeout {
        /// Logical name of the item.
        item: String,
        /// Polls performed before giving up.
        attempts: u32,
    },
    /// The platform reported the ingest job as failed.
    #[error("{item}: {status}: {message}")]
    RemoteJob {
        /// Logical name of the item.
        item: String,
        /// Terminal status reported.
        status: String,
        /// Message accompanying the status.
        message: String,
    },
    /// The platform reported a status outside the known set.
    #[error("{item}: Unknown status: {status}")]
    UnknownStatus {
        /// Logical name of the item.
        item: String,
        /// Status string received.
        status: String,
    },
    /// Local resources could not be prepared.
    #[error("{operation} failed: {source}")]
    Internal {
        /// Operation being performed.
        operation: &'static str,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl PipelineError {
    pub(crate) fn transfer(item: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transfer {
            item: item.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) const fn internal(operation: &'static str, source: io::Error) -> Self {
        Self::Internal { operation, source }
    }

    /// HTTP status this error assigns to a result.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::MethodNotAllowed { .. } => 405,
            Self::Authorization { .. } | Self::ConfigDisabled { .. } => 403,
            Self::MalformedRequest { .. }
            | Self::MissingCommand
            | Self::Transfer { .. }
            | Self::Execution { .. }
            | Self::IngestTimeout { .. }
            | Self::RemoteJob { .. }
            | Self::UnknownStatus { .. } => 400,
            Self::Internal { .. } => 500,
        }
    }
}
