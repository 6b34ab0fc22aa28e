//! Argument construction and process execution.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::PipelineError;

/// Captured output of one command run.
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Everything written to standard output.
    pub stdout: String,
    /// Everything written to standard error.
    pub stderr: String,
    /// Why the run counts as failed, if it does.
    pub failure: Option<PipelineError>,
}

/// Split the configured prefix and the caller's arguments on whitespace.
#[must_use]
pub fn build_argv(prefix: &str, cmd: &str) -> Vec<String> {
    prefix
        .split_whitespace()
        .chain(cmd.split_whitespace())
        .map(str::to_string)
        .collect()
}

/// Point the program at a copy bundled in `install_dir`.
///
/// The command runs inside a workspace one level below the install
/// directory, so a bare relative program name that exists there is rewritten
/// to `../<name>`. Any existing entry counts, not only regular files.
#[must_use]
pub fn disambiguate(mut argv: Vec<String>, install_dir: &Path) -> Vec<String> {
    if let Some(program) = argv.first_mut() {
        let relative = Path::new(program.as_str());
        if relative.is_relative() && !program.starts_with("..") && install_dir.join(relative).exists() {
            debug!(program = %program, "using program bundled with the service");
            *program = format!("../{program}");
        }
    }
    argv
}

/// Run `argv` inside `workspace`, capturing both output streams in full.
///
/// Spawn failures, non-zero exits, and timeouts are reported through
/// [`RunOutcome::failure`] rather than as an error so that callers can still
/// publish whatever the command left behind. A timed-out process is killed
/// and keeps the output it produced before the limit.
pub async fn run_command(argv: &[String], workspace: &Path, limit: Option<Duration>) -> RunOutcome {
    let Some((program, args)) = argv.split_first() else {
        return RunOutcome {
            failure: Some(PipelineError::MissingCommand),
            ..RunOutcome::default()
        };
    };
    info!(program = %program, args = ?args, "running command");

    let child = Command::new(program)
        .args(args)
        .current_dir(workspace)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();
    let mut child = match child {
        Ok(child) => child,
        Err(err) => {
            return RunOutcome {
                failure: Some(PipelineError::Execution {
                    reason: format!("could not start {program}: {err}"),
                }),
                ..RunOutcome::default()
            };
        }
    };
    let stdout = Capture::start(child.stdout.take());
    let stderr = Capture::start(child.stderr.take());

    let waited = match limit {
        Some(limit) => tokio::time::timeout(limit, child.wait())
            .await
            .map_err(|_| limit),
        None => Ok(child.wait().await),
    };
    let (failure, grace) = match waited {
        Ok(Ok(status)) => {
            let failure = (!status.success()).then(|| PipelineError::Execution {
                reason: format!("{program} exited with {status}"),
            });
            (failure, None)
        }
        Ok(Err(err)) => (
            Some(PipelineError::Execution {
                reason: format!("could not wait for {program}: {err}"),
            }),
            Some(KILL_GRACE),
        ),
        Err(limit) => {
            if let Err(err) = child.kill().await {
                warn!(program = %program, error = %err, "could not kill timed-out command");
            }
            (
                Some(PipelineError::Execution {
                    reason: format!("{program} exceeded {limit:?} and was killed"),
                }),
                Some(KILL_GRACE),
            )
        }
    };

    RunOutcome {
        stdout: stdout.finish(grace).await,
        stderr: stderr.finish(grace).await,
        failure,
    }
}

// Descendants of a killed command can hold the pipes open indefinitely.
const KILL_GRACE: Duration = Duration::from_millis(100);

/// Background reader accumulating one output stream.
struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
    reader: JoinHandle<()>,
}

impl Capture {
    fn start<R>(stream: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let reader = tokio::spawn(async move {
            let Some(mut stream) = stream else {
                return;
            };
            let mut chunk = [0_u8; 8192];
            while let Ok(read) = stream.read(&mut chunk).await {
                if read == 0 {
                    break;
                }
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..read]);
            }
        });
        Self { buffer, reader }
    }

    /// Wait for end of stream, or at most `grace`, and return what was read.
    async fn finish(self, grace: Option<Duration>) -> String {
        let Self { buffer, mut reader } = self;
        match grace {
            Some(grace) => {
                if tokio::time::timeout(grace, &mut reader).await.is_err() {
                    reader.abort();
                }
            }
            None => {
                if let Err(err) = reader.await {
                    warn!(error = %err, "output reader stopped");
                }
            }
        }
        let bytes = std::mem::take(&mut *buffer.lock().unwrap_or_else(PoisonError::into_inner));
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
