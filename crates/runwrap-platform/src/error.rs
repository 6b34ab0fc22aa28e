//! Error types for platform calls.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Failures raised while talking to the platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The request could not be sent or the response body could not be read.
    #[error("{operation} request to {url} failed: {source}")]
    Request {
        /// Operation being performed.
        operation: &'static str,
        /// Target URL.
        url: String,
        /// Underlying transport error.
        source: reqwest::Error,
    },
    /// The platform answered with a non-success status.
    #[error("{operation} request to {url} returned status {status}")]
    Status {
        /// Operation being performed.
        operation: &'static str,
        /// Target URL.
        url: String,
        /// HTTP status code returned.
        status: u16,
    },
    /// The response body did not match the expected shape.
    #[error("{operation} response could not be decoded: {source}")]
    Decode {
        /// Operation being performed.
        operation: &'static str,
        /// Underlying serde error.
        source: serde_json::Error,
    },
    /// A required field was absent from an otherwise valid response.
    #[error("{operation} response is missing {field}")]
    MissingField {
        /// Operation being performed.
        operation: &'static str,
        /// Field that was expected.
        field: &'static str,
    },
    /// A URL could not be built from the configured address.
    #[error("invalid platform url {url}: {source}")]
    InvalidUrl {
        /// Offending URL text.
        url: String,
        /// Underlying parse error.
        source: url::ParseError,
    },
    /// Local file IO failed while staging a transfer.
    #[error("{operation} could not access {}: {source}", path.display())]
    Io {
        /// Operation being performed.
        operation: &'static str,
        /// Path being read or written.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl PlatformError {
    pub(crate) const fn request(operation: &'static str, url: String, source: reqwest::Error) -> Self {
        Self::Request {
            operation,
            url,
            source,
        }
    }

    pub(crate) const fn io(operation: &'static str, path: PathBuf, source: io::Error) -> Self {
        Self::Io {
            operation,
            path,
            source,
        }
    }

    /// HTTP status carried by the error, when the platform produced one.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn status_errors_expose_code_and_context() {
        let err = PlatformError::Status {
            operation: "job_status",
            url: "http://pz/job/1".to_string(),
            status: 503,
        };
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(
            err.to_string(),
            "job_status request to http://pz/job/1 returned status 503"
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn io_errors_keep_their_source() {
        let err = PlatformError::io(
            "submit_ingest",
            PathBuf::from("out.tif"),
            io::Error::other("gone"),
        );
        assert!(err.to_string().contains("out.tif"));
        assert!(err.source().is_some());
        assert_eq!(err.status_code(), None);
    }
}
