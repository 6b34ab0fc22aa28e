//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The configuration document was not valid JSON for the expected shape.
    #[error("failed to parse configuration document")]
    Parse {
        /// Path of the document, when loaded from disk.
        path: Option<PathBuf>,
        /// Source serde error.
        source: serde_json::Error,
    },
    /// A field contained a value that cannot be used.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn config_error_variants_expose_sources() {
        let read = ConfigError::Read {
            path: PathBuf::from("missing.json"),
            source: io::Error::other("io"),
        };
        assert_eq!(read.to_string(), "failed to read configuration file");
        assert!(read.source().is_some());

        let invalid = ConfigError::InvalidField {
            field: "Port",
            reason: "out_of_range",
            value: Some("70000".to_string()),
        };
        assert_eq!(invalid.to_string(), "invalid configuration field");
        assert!(invalid.source().is_none());
    }
}
