//! Resolution of the configuration document into the immutable runtime profile.
//!
//! # Design
//! - Environment access goes through an injected lookup so resolution is deterministic in tests.
//! - Diagnostics are collected into a [`ConfigReport`] rather than logged ad hoc; the
//!   caller decides how to surface them.
//! - The resolved [`ServiceProfile`] is read-only and shared by every request.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};

use crate::error::{ConfigError, ConfigResult};
use crate::model::{DEFAULT_PORT, ServiceConfig};

/// Largest accepted `NumProcs`.
pub const MAX_NUM_PROCS: i64 = 1 << 16;

/// Environment variable lookup used during resolution.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Capability flags and warnings derived from a configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigReport {
    /// Whether startup registration against the platform is possible.
    pub can_register: bool,
    /// Whether any platform upload or download is enabled.
    pub can_transfer_files: bool,
    /// Human-readable diagnostics about questionable settings.
    pub warnings: Vec<String>,
}

impl ConfigReport {
    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Immutable runtime view of the service configuration.
#[derive(Debug, Clone)]
pub struct ServiceProfile {
    /// The configuration document as loaded.
    pub config: ServiceConfig,
    /// Platform address after environment overrides.
    pub platform_addr: Option<String>,
    /// Platform credential derived from the configured API key.
    pub platform_auth: Option<String>,
    /// Address the HTTP listener binds to.
    pub bind_addr: SocketAddr,
    /// Directory that hosts per-request workspaces.
    pub work_dir: PathBuf,
    /// Version string of the wrapped tool.
    pub version: String,
    /// Startup diagnostics.
    pub report: ConfigReport,
}

impl ServiceProfile {
    /// Resolve against the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured port is out of range.
    pub fn from_env(config: ServiceConfig) -> ConfigResult<Self> {
        Self::resolve(config, &|name| std::env::var(name).ok())
    }

    /// Resolve against the supplied environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when the configured port or
    /// `NumProcs` is out of range.
    pub fn resolve(config: ServiceConfig, env: EnvLookup<'_>) -> ConfigResult<Self> {
        let mut report = ConfigReport {
            can_register: true,
            can_transfer_files: config.can_transfer_platform_files(),
            warnings: Vec::new(),
        };

        if config.cli_cmd.trim().is_empty() {
            report.warn("CliCmd is blank; callers control the entire command line");
        }
        if config.svc_name.is_empty() {
            report.warn("SvcName not specified; registration disabled");
            report.can_register = false;
        }
        if config.url.is_empty() && !config.reg_for_task_mgr {
            report.warn("URL not specified and not task managed; registration disabled");
            report.can_register = false;
        }

        let platform_addr = resolve_platform_addr(&config, env, &mut report);
        let platform_auth = resolve_platform_auth(&config, env, &mut report);

        if config.version_cmd.is_empty() && config.version_str.is_empty() {
            report.warn("neither VersionCmd nor VersionStr specified; version left blank");
        } else if !config.version_cmd.is_empty() && !config.version_str.is_empty() {
            report.warn("both VersionCmd and VersionStr specified; VersionCmd takes precedence");
        }

        let port = resolve_port(&config, env, &mut report)?;
        if config.num_procs > MAX_NUM_PROCS {
            return Err(ConfigError::InvalidField {
                field: "NumProcs",
                reason: "out_of_range",
                value: Some(config.num_procs.to_string()),
            });
        }
        let ip = if config.local_only {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        };
        let work_dir = config
            .work_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let version = config.version_str.clone();

        Ok(Self {
            config,
            platform_addr,
            platform_auth,
            bind_addr: SocketAddr::new(ip, port),
            work_dir,
            version,
            report,
        })
    }

    /// Replace the tool version, typically with the output of `VersionCmd`.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Number of concurrent executions allowed; `None` means unbounded.
    #[must_use]
    pub fn gate_capacity(&self) -> Option<usize> {
        usize::try_from(self.config.num_procs)
            .ok()
            .filter(|capacity| *capacity > 0)
    }

    /// Hard limit for a single command run, if configured.
    #[must_use]
    pub fn max_run_time(&self) -> Option<Duration> {
        u64::try_from(self.config.max_run_time)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Build the `Basic` credential the platform expects for an API key.
#[must_use]
pub fn basic_auth_header(api_key: &str) -> String {
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{api_key}:"))
    )
}

fn resolve_platform_addr(
    config: &ServiceConfig,
    env: EnvLookup<'_>,
    report: &mut ConfigReport,
) -> Option<String> {
    let configured = non_empty(&config.pz_addr);
    if config.pz_addr_en_var.is_empty() {
        if configured.is_none() {
            report.can_register = false;
        }
        return configured;
    }
    if let Some(addr) = env(&config.pz_addr_en_var).and_then(|value| non_empty(&value)) {
        return Some(addr);
    }
    if configured.is_some() {
        report.warn("PzAddrEnVar is set but unpopulated; reverting to PzAddr");
    } else {
        report.warn("PzAddrEnVar is set but unpopulated and PzAddr is blank; registration disabled");
        report.can_register = false;
        if report.can_transfer_files {
            report.warn("callers must supply pzAddr for platform file transfers");
        }
    }
    configured
}

fn resolve_platform_auth(
    config: &ServiceConfig,
    env: EnvLookup<'_>,
    report: &mut ConfigReport,
) -> Option<String> {
    if config.api_key_en_var.is_empty() {
        report.can_register = false;
        return None;
    }
    match env(&config.api_key_en_var).and_then(|value| non_empty(&value)) {
        Some(key) => Some(basic_auth_header(&key)),
        None => {
            report.warn("no API key found at APIKeyEnVar; registration disabled");
            report.can_register = false;
            if report.can_transfer_files {
                report.warn("callers must supply pzAuthKey for platform file transfers");
            }
            None
        }
    }
}

fn resolve_port(
    config: &ServiceConfig,
    env: EnvLookup<'_>,
    report: &mut ConfigReport,
) -> ConfigResult<u16> {
    let mut port = if config.port <= 0 {
        DEFAULT_PORT
    } else {
        u16::try_from(config.port).map_err(|_| ConfigError::InvalidField {
            field: "Port",
            reason: "out_of_range",
            value: Some(config.port.to_string()),
        })?
    };
    if !config.port_en_var.is_empty() {
        match env(&config.port_en_var).and_then(|value| value.trim().parse::<u16>().ok()) {
            Some(env_port) if env_port > 0 => port = env_port,
            _ => report.warn(format!(
                "could not interpret PortEnVar; using port {port}"
            )),
        }
    }
    Ok(port)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
