//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;
use runwrap_telemetry::DEFAULT_LOG_LEVEL;

/// Arguments accepted by the `runwrap` binary.
#[derive(Debug, Parser)]
#[command(
    name = "runwrap",
    about = "Wraps a command line tool as an HTTP service with platform file transfer",
    version
)]
pub struct Cli {
    /// Path to the JSON service configuration.
    #[arg(env = "RUNWRAP_CONFIG")]
    pub config: PathBuf,
    /// Log level used when `RUST_LOG` is unset.
    #[arg(long, env = "RUNWRAP_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
    /// Log output format (`json` or `pretty`).
    #[arg(long, env = "RUNWRAP_LOG_FORMAT")]
    pub log_format: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_positional() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["runwrap", "service.json", "--log-format", "json"])?;
        assert_eq!(cli.config, PathBuf::from("service.json"));
        assert_eq!(cli.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(cli.log_format.as_deref(), Some("json"));
        Ok(())
    }
}
