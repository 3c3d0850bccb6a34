use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use scanward_model::{SENTINEL_EXIT_CODE, ScanOutcome};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
    task::JoinHandle,
    time::{Instant, timeout, timeout_at},
};
use tracing::{debug, error, warn};

use super::{ScanExecutor, ScanInvocation, xml::xml_to_json};

/// How long a killed scanner gets to flush what it already wrote.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Stand-in deadline for timeouts too large to add to the current instant.
const LONGEST_DEADLINE: Duration = Duration::from_secs(365 * 86_400);

/// Runs the `nmap` binary with XML output on stdout.
#[derive(Debug, Clone)]
pub struct NmapExecutor {
    binary: PathBuf,
}

impl NmapExecutor {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, invocation: &ScanInvocation) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-oX")
            .arg("-")
            .args(&invocation.args)
            .arg(&invocation.target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for NmapExecutor {
    fn default() -> Self {
        Self::new("nmap")
    }
}

type Buffer = Arc<Mutex<Vec<u8>>>;

/// Copies a child pipe into a shared buffer so partial output survives a kill.
fn capture<R>(pipe: Option<R>) -> (Buffer, Option<JoinHandle<()>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buffer: Buffer = Arc::default();
    let handle = pipe.map(|mut pipe| {
        let sink = Arc::clone(&buffer);
        tokio::spawn(async move {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
                }
            }
        })
    });
    (buffer, handle)
}

/// Waits for a pipe reader to hit EOF, aborting it after `grace`. Returns
/// `false` if the reader had to be aborted.
async fn drain(handle: Option<JoinHandle<()>>, grace: Duration) -> bool {
    let Some(handle) = handle else { return true };
    let abort = handle.abort_handle();
    if timeout(grace, handle).await.is_err() {
        abort.abort();
        return false;
    }
    true
}

fn take_string(buffer: &Buffer) -> String {
    String::from_utf8_lossy(&std::mem::take(&mut *buffer.lock())).into_owned()
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(SENTINEL_EXIT_CODE)
}

fn failure_message(status: ExitStatus, stderr: &str) -> String {
    let stderr = stderr.trim();
    let head = match status.code() {
        Some(code) => format!("nmap exited with status {code}"),
        None => format!("nmap terminated abnormally ({status})"),
    };
    if stderr.is_empty() {
        head
    } else {
        format!("{head}: {stderr}")
    }
}

fn parse_report(raw: &str, target: &str) -> Option<serde_json::Value> {
    if raw.trim().is_empty() {
        return None;
    }
    match xml_to_json(raw) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(%target, error = %err, "could not parse scanner XML output");
            None
        }
    }
}

#[async_trait]
impl ScanExecutor for NmapExecutor {
    async fn run(&self, invocation: &ScanInvocation) -> ScanOutcome {
        let target = invocation.target.as_str();
        let mut child = match self.command(invocation).spawn() {
            Ok(child) => child,
            Err(err) => {
                error!(
                    binary = %self.binary.display(),
                    %target,
                    error = %err,
                    "failed to launch scanner"
                );
                return ScanOutcome::failed(format!(
                    "failed to launch {}: {err}",
                    self.binary.display()
                ));
            }
        };
        debug!(pid = ?child.id(), %target, args = ?invocation.args, "scanner started");

        let (stdout, stdout_task) = capture(child.stdout.take());
        let (stderr, stderr_task) = capture(child.stderr.take());

        // One deadline covers the process and its output pipes, which a
        // backgrounded descendant may keep open after the scanner exits.
        let started = Instant::now();
        let deadline = started
            .checked_add(invocation.timeout)
            .unwrap_or(started + LONGEST_DEADLINE);
        match timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => {
                let stdout_closed = drain(stdout_task, remaining(deadline)).await;
                let stderr_closed = drain(stderr_task, remaining(deadline)).await;
                if !(stdout_closed && stderr_closed) {
                    warn!(
                        %target,
                        timeout_secs = invocation.timeout.as_secs(),
                        "scanner output still open at deadline"
                    );
                    return ScanOutcome::timed_out(invocation.timeout, Some(take_string(&stdout)));
                }

                let raw = take_string(&stdout);
                let parsed = parse_report(&raw, target);
                let mut outcome = ScanOutcome::completed(exit_code(status), raw, parsed);
                if !status.success() {
                    outcome = outcome.with_error(failure_message(status, &take_string(&stderr)));
                }
                outcome
            }
            Ok(Err(err)) => {
                error!(%target, error = %err, "failed waiting for scanner");
                let _ = child.kill().await;
                drain(stdout_task, DRAIN_GRACE).await;
                drain(stderr_task, DRAIN_GRACE).await;
                ScanOutcome::failed(format!("failed waiting for scanner: {err}"))
            }
            Err(_) => {
                warn!(
                    %target,
                    timeout_secs = invocation.timeout.as_secs(),
                    "scan timed out, killing scanner"
                );
                if let Err(err) = child.kill().await {
                    warn!(%target, error = %err, "failed to kill timed out scanner");
                }
                drain(stdout_task, DRAIN_GRACE).await;
                drain(stderr_task, DRAIN_GRACE).await;
                ScanOutcome::timed_out(invocation.timeout, Some(take_string(&stdout)))
            }
        }
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}
