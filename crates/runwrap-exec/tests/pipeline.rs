use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use runwrap_config::ServiceConfig;
use runwrap_exec::{ExecutionRequest, Executor, PollPolicy};
use runwrap_telemetry::Metrics;
use runwrap_test_support::{PlatformCall, ScriptedPlatform, install_dir, profile_in, write_script};

fn quick_poll() -> PollPolicy {
    PollPolicy {
        initial_delay: Duration::from_millis(1),
        interval: Duration::from_millis(1),
        max_attempts: 3,
    }
}

fn executor(
    install: &Path,
    config: ServiceConfig,
    api_key: Option<&str>,
    platform: Arc<ScriptedPlatform>,
) -> anyhow::Result<Executor> {
    let profile = profile_in(install, config, api_key)?;
    Ok(Executor::new(Arc::new(profile), platform, Metrics::new()?).with_poll_policy(quick_poll()))
}

fn entries(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut names = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.file_name().to_string_lossy().into_owned()))
        .collect::<Result<Vec<_>, _>>()?;
    names.sort();
    Ok(names)
}

#[cfg(unix)]
#[tokio::test]
async fn request_without_transfers_needs_no_credential() -> anyhow::Result<()> {
    let install = install_dir()?;
    write_script(install.path(), "tool.sh", "echo \"args: $*\"")?;
    let platform = Arc::new(ScriptedPlatform::new());
    let config = ServiceConfig {
        cli_cmd: "tool.sh --fixed".to_string(),
        ..ServiceConfig::default()
    };
    let executor = executor(install.path(), config, None, Arc::clone(&platform))?;

    let result = executor
        .execute(ExecutionRequest {
            cmd: "a  b".to_string(),
            ..ExecutionRequest::default()
        })
        .await;

    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(result.stdout, "args: --fixed a b\n");
    assert!(platform.calls().is_empty());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn one_failed_input_does_not_stop_the_others() -> anyhow::Result<()> {
    let install = install_dir()?;
    write_script(install.path(), "tool.sh", "ls")?;
    let platform = Arc::new(
        ScriptedPlatform::new()
            .with_file("d1", "one.tif", "1")
            .with_fetch_status("d2", 404)
            .with_file("d3", "three.tif", "3"),
    );
    let config = ServiceConfig {
        cli_cmd: "tool.sh".to_string(),
        pz_addr: "http://pz".to_string(),
        can_downl_pz: true,
        ..ServiceConfig::default()
    };
    let executor = executor(install.path(), config, Some("key"), platform)?;

    let result = executor
        .execute(ExecutionRequest {
            in_pz_files: vec!["d1".to_string(), "d2".to_string(), "d3".to_string()],
            ..ExecutionRequest::default()
        })
        .await;

    assert_eq!(result.http_status, 400);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("d2"), "{:?}", result.errors);
    assert_eq!(result.in_files.len(), 2);
    assert_eq!(result.in_files.get("d1").map(String::as_str), Some("one.tif"));
    assert_eq!(result.in_files.get("d3").map(String::as_str), Some("three.tif"));
    assert_eq!(result.stdout, "one.tif\nthree.tif\n");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn external_inputs_carry_the_caller_bearer() -> anyhow::Result<()> {
    let install = install_dir()?;
    write_script(install.path(), "tool.sh", "cat local.json")?;
    let platform = Arc::new(ScriptedPlatform::new().with_file(
        "https://files.example/a.json",
        "a.json",
        "{}",
    ));
    let config = ServiceConfig {
        cli_cmd: "tool.sh".to_string(),
        can_downl_ext: true,
        ..ServiceConfig::default()
    };
    let executor = executor(install.path(), config, None, Arc::clone(&platform))?;

    let result = executor
        .execute(ExecutionRequest {
            in_ext_files: vec!["https://files.example/a.json".to_string()],
            in_ext_names: vec!["local.json".to_string()],
            ext_auth: "token-1".to_string(),
            ..ExecutionRequest::default()
        })
        .await;

    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(result.stdout, "{}");
    assert_eq!(
        platform.calls(),
        vec![PlatformCall::FetchByUrl(
            "https://files.example/a.json".to_string(),
            Some("token-1".to_string())
        )]
    );
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn workspace_is_removed_after_failures() -> anyhow::Result<()> {
    let install = install_dir()?;
    write_script(install.path(), "tool.sh", "echo partial > out.tif; exit 2")?;
    let platform = Arc::new(
        ScriptedPlatform::new()
            .with_fetch_status("missing", 500)
            .failing_ingest("out.tif"),
    );
    let config = ServiceConfig {
        cli_cmd: "tool.sh".to_string(),
        pz_addr: "http://pz".to_string(),
        can_downl_pz: true,
        can_upload: true,
        ..ServiceConfig::default()
    };
    let executor = executor(install.path(), config, Some("key"), platform)?;

    let result = executor
        .execute(ExecutionRequest {
            in_pz_files: vec!["missing".to_string()],
            out_tiffs: vec!["out.tif".to_string()],
            ..ExecutionRequest::default()
        })
        .await;

    assert_eq!(result.errors.len(), 3, "{:?}", result.errors);
    assert_eq!(entries(install.path())?, vec!["tool.sh".to_string()]);
    Ok(())
}

#[tokio::test]
async fn unusable_work_dir_is_internal_error() -> anyhow::Result<()> {
    let install = install_dir()?;
    let missing = install.path().join("not-there");
    let platform = Arc::new(ScriptedPlatform::new());
    let executor = executor(
        &missing,
        ServiceConfig {
            cli_cmd: "true".to_string(),
            ..ServiceConfig::default()
        },
        None,
        platform,
    )?;

    let result = executor.execute(ExecutionRequest::default()).await;

    assert_eq!(result.http_status, 500);
    assert_eq!(result.errors.len(), 1);
    assert!(!missing.exists());
    assert_eq!(executor.metrics().snapshot().executions_active, 0);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn single_slot_gate_serializes_executions() -> anyhow::Result<()> {
    let install = install_dir()?;
    write_script(
        install.path(),
        "tool.sh",
        "echo start >> ../trace.log; sleep 0.3; echo end >> ../trace.log",
    )?;
    let config = ServiceConfig {
        cli_cmd: "tool.sh".to_string(),
        num_procs: 1,
        ..ServiceConfig::default()
    };
    let executor = executor(install.path(), config, None, Arc::new(ScriptedPlatform::new()))?;

    let request = ExecutionRequest::default();
    let (first, second) = tokio::join!(
        executor.execute(request.clone()),
        executor.execute(request)
    );

    assert!(first.is_success() && second.is_success());
    let trace = std::fs::read_to_string(install.path().join("trace.log"))?;
    assert_eq!(trace, "start\nend\nstart\nend\n");
    let snapshot = executor.metrics().snapshot();
    assert_eq!(snapshot.executions_ok, 2);
    assert_eq!(snapshot.executions_active, 0);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn outputs_are_published_with_their_content_ids() -> anyhow::Result<()> {
    let install = install_dir()?;
    write_script(
        install.path(),
        "tool.sh",
        "echo img > out.tif; echo note > out.txt; echo '{}' > out.geojson",
    )?;
    let platform = Arc::new(ScriptedPlatform::new());
    let config = ServiceConfig {
        cli_cmd: "tool.sh".to_string(),
        pz_addr: "http://pz".to_string(),
        can_upload: true,
        ..ServiceConfig::default()
    };
    let executor = executor(install.path(), config, Some("key"), Arc::clone(&platform))?;

    let result = executor
        .execute(ExecutionRequest {
            out_tiffs: vec!["out.tif".to_string()],
            out_txts: vec!["out.txt".to_string()],
            out_geojson: vec!["out.geojson".to_string()],
            ..ExecutionRequest::default()
        })
        .await;

    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(result.out_files.len(), 3);
    let kinds: Vec<(String, bool)> = platform
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            PlatformCall::SubmitIngest {
                name, with_file, ..
            } => Some((name, with_file)),
            _ => None,
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("out.tif".to_string(), true),
            ("out.txt".to_string(), false),
            ("out.geojson".to_string(), true),
        ]
    );
    Ok(())
}
