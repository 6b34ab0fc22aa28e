use std::process::Stdio;
use std::sync::Arc;

use runwrap_api::ApiServer;
use runwrap_config::{ServiceConfig, ServiceProfile, load_config};
use runwrap_exec::{Executor, build_argv};
use runwrap_platform::{
    ClassType, HttpPlatform, PlatformClient, PlatformTarget, ResourceMetadata,
    ServiceDescriptor, manage_registration,
};
use runwrap_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics};
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::cli::Cli;
use crate::dispatcher::Dispatcher;
use crate::error::{AppError, AppResult};

/// Entry point for the runwrap boot sequence.
///
/// # Errors
///
/// Returns an error if logging, configuration, or the API listener fail.
/// Registration and dispatcher failures are logged and do not stop the service.
pub async fn run_app(cli: Cli) -> AppResult<()> {
    let defaults = LoggingConfig::default();
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli
            .log_format
            .as_deref()
            .map_or(defaults.format, LogFormat::from_name),
        ..defaults
    };
    runwrap_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;

    let config = load_config(&cli.config).map_err(|err| AppError::config("config.load", err))?;
    let _context = GlobalContextGuard::new(config.app_name().to_string());
    info!(config = %cli.config.display(), "runwrap bootstrap starting");

    let profile =
        ServiceProfile::from_env(config).map_err(|err| AppError::config("config.resolve", err))?;
    for warning in &profile.report.warnings {
        warn!(warning = %warning, "configuration");
    }
    let version = resolve_version(&profile.config).await;
    let profile = Arc::new(profile.with_version(version));

    let platform: Arc<dyn PlatformClient> = Arc::new(HttpPlatform::default());
    if profile.report.can_register {
        register(platform.as_ref(), &profile).await;
    }

    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let executor = Executor::new(Arc::clone(&profile), platform, metrics);

    if profile.config.reg_for_task_mgr {
        spawn_dispatcher(executor.clone());
    }

    ApiServer::new(executor)
        .serve(profile.bind_addr)
        .await
        .map_err(|err| AppError::api_server("api.serve", err))
}

/// Version of the wrapped tool: `VersionCmd` output when configured, else `VersionStr`.
pub async fn resolve_version(config: &ServiceConfig) -> String {
    let argv = build_argv(&config.version_cmd, "");
    let Some((program, args)) = argv.split_first() else {
        return config.version_str.clone();
    };
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await;
    match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        Ok(output) => {
            error!(status = %output.status, "VersionCmd failed");
            config.version_str.clone()
        }
        Err(err) => {
            error!(error = %err, "VersionCmd could not be started");
            config.version_str.clone()
        }
    }
}

/// Catalog entry describing this service instance.
#[must_use]
pub fn service_descriptor(profile: &ServiceProfile) -> ServiceDescriptor {
    let config = &profile.config;
    let endpoint = format!("{}/execute", config.url.trim_end_matches('/'));
    ServiceDescriptor {
        service_id: String::new(),
        url: endpoint.clone(),
        contract_url: endpoint,
        method: "POST".to_string(),
        resource_metadata: ResourceMetadata {
            name: config.svc_name.clone(),
            description: config.description.clone(),
            class_type: ClassType::default(),
            version: profile.version.clone(),
            metadata: config.attributes.clone(),
        },
        timeout: config.max_run_time,
        is_task_managed: config.reg_for_task_mgr,
    }
}

async fn register(platform: &dyn PlatformClient, profile: &ServiceProfile) {
    let (Some(addr), Some(auth)) = (&profile.platform_addr, &profile.platform_auth) else {
        warn!("platform address or credential unavailable; registration skipped");
        return;
    };
    let target = PlatformTarget::new(addr.as_str(), auth.as_str());
    let descriptor = service_descriptor(profile);
    match manage_registration(platform, &target, &descriptor).await {
        Ok(outcome) => info!(outcome = ?outcome, "registration managed"),
        Err(err) => error!(error = %err, "failed to manage registration"),
    }
}

fn spawn_dispatcher(executor: Executor) {
    match Dispatcher::from_executor(executor) {
        Ok(dispatcher) => {
            tokio::spawn(async move {
                if let Err(err) = dispatcher.run().await {
                    error!(error = ?err, "task dispatcher stopped");
                }
            });
        }
        Err(err) => error!(error = ?err, "task dispatcher not started"),
    }
}
