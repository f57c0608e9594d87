use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::unix::pipe;
use tokio::process::Command;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use super::types::CheckResult;
use crate::config::CheckSpec;
use crate::status::StatusCode;

/// Output reported for a plugin that missed its deadline
pub const TIMEOUT_OUTPUT: &str = "Check command timed out";

/// Nagios performance data delimiter
const PERFDATA_DELIMITER: char = '|';

/// Keep the human readable part of plugin output
pub fn strip_performance_data(raw: &str) -> &str {
    raw.split(PERFDATA_DELIMITER).next().unwrap_or_default().trim()
}

/// One pipe for both output streams of a plugin
fn output_pipe() -> io::Result<(pipe::Receiver, Stdio, Stdio)> {
    let (sender, receiver) = pipe::pipe()?;
    let writer = sender.into_blocking_fd()?;
    let stderr = Stdio::from(writer.try_clone()?);
    Ok((receiver, Stdio::from(writer), stderr))
}

/// Check runner - executes individual plugins
#[derive(Debug, Clone)]
pub struct CheckRunner {
    check_timeout: Duration,
}

impl CheckRunner {
    /// Create a runner allowing each plugin `check_timeout` to finish
    pub fn new(check_timeout: Duration) -> Self {
        Self { check_timeout }
    }

    /// Deadline of one execution: the check timeout, capped by the run deadline
    pub fn check_deadline(&self, run_deadline: Instant) -> Instant {
        Instant::now()
            .checked_add(self.check_timeout)
            .map_or(run_deadline, |check_deadline| run_deadline.min(check_deadline))
    }

    /// Execute a plugin, giving up at `deadline`
    ///
    /// Standard output and standard error share one pipe, so the text keeps
    /// the order the plugin wrote it in. The child is killed if the deadline
    /// elapses before it exits.
    pub async fn run(&self, deadline: Instant, name: &str, spec: &CheckSpec) -> CheckResult {
        if Instant::now() >= deadline {
            return Self::timed_out(name);
        }

        let (mut reader, stdout, stderr) = match output_pipe() {
            Ok(pipe) => pipe,
            Err(e) => {
                warn!("Unable to create output pipe for {}: {}", name, e);
                return CheckResult::new(name, StatusCode::Unknown, e.to_string());
            }
        };

        let mut command = Command::new(&spec.plugin);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true);

        debug!("Running {}: {:?}", name, command);

        let spawned = command.spawn();
        // Release our copies of the write end, otherwise EOF never arrives
        drop(command);

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!("Unable to spawn plugin {} for {}: {}", spec.plugin, name, e);
                return CheckResult::new(
                    name,
                    StatusCode::Unknown,
                    format!("Unable to run plugin {}: {}", spec.plugin, e),
                );
            }
        };

        let collect = async {
            let mut raw = Vec::new();
            reader.read_to_end(&mut raw).await?;
            let status = child.wait().await?;
            Ok::<(ExitStatus, Vec<u8>), io::Error>((status, raw))
        };

        let (exit_status, raw) = match timeout_at(deadline, collect).await {
            Ok(Ok(collected)) => collected,
            Ok(Err(e)) => {
                warn!("Failed to collect output of {}: {}", name, e);
                return CheckResult::new(name, StatusCode::Unknown, e.to_string());
            }
            Err(_) => {
                warn!("{} did not finish before its deadline", name);
                return Self::timed_out(name);
            }
        };

        let text = String::from_utf8_lossy(&raw);

        // Killed by a signal leaves no exit code
        let status = exit_status.code().map(StatusCode::from_exit_code).unwrap_or(StatusCode::Unknown);

        CheckResult::new(name, status, strip_performance_data(&text))
    }

    /// Result for a check that is not executed, e.g. because a dependency failed
    pub fn skip(name: &str, reason: impl Into<String>) -> CheckResult {
        CheckResult::new(name, StatusCode::Unknown, reason)
    }

    /// Result for a check whose deadline elapsed
    pub fn timed_out(name: &str) -> CheckResult {
        CheckResult::new(name, StatusCode::Critical, TIMEOUT_OUTPUT)
    }
}
