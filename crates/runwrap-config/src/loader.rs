//! Configuration file loading.

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::model::ServiceConfig;

/// Read and parse the configuration document at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] when the file cannot be read and
/// [`ConfigError::Parse`] when its contents do not describe a [`ServiceConfig`].
pub fn load_config(path: &Path) -> ConfigResult<ServiceConfig> {
    let raw = fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
        path: Some(path.to_path_buf()),
        source,
    })
}

/// Parse an in-memory configuration document.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] when the document is malformed.
pub fn parse_config(raw: &str) -> ConfigResult<ServiceConfig> {
    serde_json::from_str(raw).map_err(|source| ConfigError::Parse { path: None, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn load_config_reads_document_from_disk() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"CliCmd":"echo","SvcName":"echoer","CanUpload":true,"Attributes":{"team":"geo"}}"#,
        )?;

        let config = load_config(&path)?;
        assert_eq!(config.cli_cmd, "echo");
        assert!(config.can_upload);
        assert_eq!(config.attributes.get("team").map(String::as_str), Some("geo"));
        Ok(())
    }

    #[test]
    fn load_config_reports_missing_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let err = load_config(&dir.path().join("absent.json"))
            .err()
            .ok_or("expected read failure")?;
        assert!(matches!(err, ConfigError::Read { .. }));
        Ok(())
    }

    #[test]
    fn parse_config_reports_malformed_json() {
        let err = parse_config("{not json");
        assert!(matches!(err, Err(ConfigError::Parse { path: None, .. })));
    }
}
