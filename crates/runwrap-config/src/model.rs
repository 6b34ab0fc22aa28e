//! Typed configuration document.
//!
//! # Design
//! - Every recognised option is a named field; unknown keys are rejected at parse time.
//! - Field names on the wire keep the service's PascalCase convention so existing
//!   deployment files load unchanged.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default listener port when neither `Port` nor `PortEnVar` yields a value.
pub const DEFAULT_PORT: u16 = 8080;

/// Configuration document describing a single wrapped command-line tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields, default)]
pub struct ServiceConfig {
    /// Leading command tokens; request commands are appended to these.
    pub cli_cmd: String,
    /// Command run once at startup whose output is the tool version.
    pub version_cmd: String,
    /// Literal tool version, used when `version_cmd` is blank.
    pub version_str: String,
    /// Default platform address.
    pub pz_addr: String,
    /// Environment variable that overrides `pz_addr` when set.
    pub pz_addr_en_var: String,
    /// Environment variable holding the platform API key.
    #[serde(rename = "APIKeyEnVar")]
    pub api_key_en_var: String,
    /// Service name used for registration and ingest attribution.
    pub svc_name: String,
    /// Public URL of this service, published during registration.
    #[serde(rename = "URL")]
    pub url: String,
    /// Listener port; zero or negative selects [`DEFAULT_PORT`].
    pub port: i64,
    /// Environment variable that overrides `port`.
    pub port_en_var: String,
    /// Human-readable description of the service.
    pub description: String,
    /// Free-form attributes published with the service descriptor.
    pub attributes: BTreeMap<String, String>,
    /// Maximum number of concurrent executions; zero or negative is unbounded.
    pub num_procs: i64,
    /// Whether outputs may be published to the platform.
    pub can_upload: bool,
    /// Whether inputs may be fetched from the platform.
    pub can_downl_pz: bool,
    /// Whether inputs may be fetched from external URLs.
    pub can_downl_ext: bool,
    /// Register as a task-managed service and run the task dispatcher.
    pub reg_for_task_mgr: bool,
    /// Hard limit, in seconds, for a single command run; zero or negative disables it.
    pub max_run_time: i64,
    /// Bind the listener to loopback only.
    pub local_only: bool,
    /// Emit audit events for transfers and executions.
    pub log_audit: bool,
    /// Directory under which per-request workspaces are created.
    pub work_dir: Option<PathBuf>,
}

impl ServiceConfig {
    /// Service name with the fallback used when none is configured.
    #[must_use]
    pub fn app_name(&self) -> &str {
        if self.svc_name.is_empty() {
            "runwrap"
        } else {
            &self.svc_name
        }
    }

    /// True when any platform file transfer is enabled.
    #[must_use]
    pub const fn can_transfer_platform_files(&self) -> bool {
        self.can_upload || self.can_downl_pz
    }
}
