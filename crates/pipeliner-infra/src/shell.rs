//! Shell command runner for pre-commands and builds.
//!
//! Implements [`CommandRunner`] by handing the joined script to `bash -c`.
//! The child inherits the full environment of the server process. A shared
//! semaphore bounds how many scripts run at once, and every run can be cut
//! short by a timeout or a cancellation token.
//!
//! Each script runs in its own process group. When a run is abandoned
//! (timeout, cancellation, or the caller dropping the future) the whole group
//! is killed, including anything the script started in the background.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pipeliner_core::command::{script_from_lines, CommandOutput, CommandRunner};
use pipeliner_types::config::ServerConfig;
use pipeliner_types::error::CommandError;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Interpreter used for scripts.
const DEFAULT_SHELL: &str = "bash";

/// Bash-backed command runner with a concurrency bound and optional timeout.
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    shell: String,
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl ShellCommandRunner {
    /// Create a runner allowing `max_concurrent` simultaneous scripts.
    pub fn new(max_concurrent: usize, timeout: Option<Duration>) -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            permits: Arc::new(Semaphore::new(max_concurrent)),
            timeout,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.max_concurrent_builds, config.command_timeout)
    }

    /// Use a different interpreter (must accept `-c <script>`).
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Number of scripts that could start right now without waiting.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

impl CommandRunner for ShellCommandRunner {
    async fn run(
        &self,
        commands: &[String],
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, CommandError> {
        let script = script_from_lines(commands);

        let _permit = tokio::select! {
            permit = Arc::clone(&self.permits).acquire_owned() => {
                permit.map_err(|_| CommandError::Cancelled)?
            }
            _ = cancel.cancelled() => return Err(CommandError::Cancelled),
        };

        tracing::debug!(shell = %self.shell, script = %script, "running script");
        let start = Instant::now();

        let mut command = tokio::process::Command::new(&self.shell);
        command
            .arg("-c")
            .arg(&script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        {
            command.process_group(0);
        }

        let child = command
            .spawn()
            .map_err(|e| CommandError::Spawn(format!("{}: {e}", self.shell)))?;

        // Every return before `disarm` kills the group.
        let mut group = ProcessGroupGuard::new(child.id());
        let wait = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => tokio::select! {
                result = tokio::time::timeout(limit, wait) => {
                    result.map_err(|_| CommandError::TimedOut(limit))?
                }
                _ = cancel.cancelled() => return Err(CommandError::Cancelled),
            },
            None => tokio::select! {
                result = wait => result,
                _ = cancel.cancelled() => return Err(CommandError::Cancelled),
            },
        }
        .map_err(|e| CommandError::Spawn(format!("failed to wait for {}: {e}", self.shell)))?;

        group.disarm();
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if !output.status.success() {
            tracing::warn!(
                status = %output.status,
                elapsed_ms,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "script failed"
            );
            return Err(CommandError::Failed {
                code: output.status.code(),
                stderr: output.stderr,
            });
        }

        tracing::debug!(elapsed_ms, stdout_bytes = output.stdout.len(), "script finished");
        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Kills the script's process group on drop unless the script finished.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };

        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
                Ok(()) => tracing::debug!(pgid, "killed abandoned script process group"),
                Err(Errno::ESRCH) => {}
                Err(e) => tracing::warn!(pgid, error = %e, "failed to kill script process group"),
            }
        }

        #[cfg(not(unix))]
        let _ = pgid;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
