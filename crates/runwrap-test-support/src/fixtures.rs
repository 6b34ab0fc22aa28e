//! Filesystem and profile fixtures.

use std::io;
use std::path::{Path, PathBuf};

use runwrap_config::{ServiceConfig, ServiceProfile};
use tempfile::TempDir;

/// Fresh temporary directory standing in for the service install directory.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn install_dir() -> io::Result<TempDir> {
    tempfile::Builder::new().prefix("runwrap-install-").tempdir()
}

/// Write an executable shell script named `name` into `dir`.
///
/// # Errors
///
/// Returns an error if the file cannot be written or made executable.
pub fn write_script(dir: &Path, name: &str, body: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(path)
}

/// Resolve `config` into a profile whose workspaces live under `install`.
///
/// The process environment is never consulted; platform settings come from
/// `PzAddr` only and the credential is derived from `api_key` when given.
///
/// # Errors
///
/// Returns an error when the configuration fails validation.
pub fn profile_in(
    install: &Path,
    mut config: ServiceConfig,
    api_key: Option<&str>,
) -> runwrap_config::ConfigResult<ServiceProfile> {
    config.work_dir = Some(install.to_path_buf());
    if api_key.is_some() && config.api_key_en_var.is_empty() {
        config.api_key_en_var = "RUNWRAP_TEST_KEY".to_string();
    }
    let key = api_key.map(str::to_string);
    let expected_var = config.api_key_en_var.clone();
    let lookup = move |name: &str| (name == expected_var).then(|| key.clone()).flatten();
    ServiceProfile::resolve(config, &lookup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_in_points_work_dir_at_install() -> Result<(), Box<dyn std::error::Error>> {
        let dir = install_dir()?;
        let profile = profile_in(
            dir.path(),
            ServiceConfig {
                pz_addr: "http://pz".to_string(),
                ..ServiceConfig::default()
            },
            Some("k"),
        )?;
        assert_eq!(profile.work_dir, dir.path());
        assert_eq!(profile.platform_auth.as_deref(), Some("Basic azo="));
        Ok(())
    }

    #[test]
    fn write_script_creates_file() -> io::Result<()> {
        let dir = install_dir()?;
        let path = write_script(dir.path(), "tool.sh", "echo hi")?;
        assert!(path.is_file());
        Ok(())
    }
}
