// src/process/handle.rs

//! Handle for a single spawned process.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::{ProcessConfig, tree};
use crate::errors::{HarnessError, Result};
use crate::types::OutputMode;

/// Owns exactly one OS process.
///
/// The process is started as the leader of a new process group. The handle
/// issues at most one termination; calling [`terminate`](Self::terminate)
/// again is a no-op. A handle dropped without having been terminated sends
/// a best-effort `SIGTERM` to its tree.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    pid: u32,
    command: String,
    terminated: bool,
}

impl ProcessHandle {
    /// Start a process. Fails with [`HarnessError::SpawnError`] when the
    /// program cannot be launched (missing executable, permission denied,
    /// missing working directory).
    pub fn spawn(config: &ProcessConfig) -> Result<Self> {
        let command = config.display_command();

        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args).stdin(Stdio::null());

        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }
        if config.env_clear {
            cmd.env_clear();
        }
        cmd.envs(&config.env);

        match config.output {
            OutputMode::Inherit => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            OutputMode::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
            OutputMode::Discard => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| HarnessError::SpawnError {
            command: command.clone(),
            reason: e.to_string(),
        })?;

        let pid = child.id().ok_or_else(|| HarnessError::SpawnError {
            command: command.clone(),
            reason: "process exited before its PID could be read".to_string(),
        })?;

        if config.output == OutputMode::Capture {
            forward_lines(child.stdout.take(), pid, "stdout");
            forward_lines(child.stderr.take(), pid, "stderr");
        }

        info!(pid, command = %command, "spawned process");

        Ok(Self {
            child,
            pid,
            command,
            terminated: false,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Whether a termination has already been issued through this handle.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Non-blocking check whether the root process has exited.
    pub fn try_exit_status(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// Wait for the root process to exit.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        Ok(self.child.wait().await?)
    }

    /// Wait up to `timeout` for the root process to exit; `None` if it is
    /// still running afterwards.
    pub async fn wait_for_exit(&mut self, timeout: Duration) -> Result<Option<ExitStatus>> {
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => Ok(Some(status?)),
            Err(_) => Ok(None),
        }
    }

    /// Live descendants of the root process, deepest first. Empty once the
    /// root has been reaped.
    pub fn descendants(&self) -> Vec<u32> {
        if self.child.id().is_none() {
            return Vec::new();
        }
        tree::find_descendants(self.pid)
    }

    /// Send `SIGTERM` to the process and every descendant.
    ///
    /// Returns once the signals are dispatched, without waiting for the
    /// processes to exit. Processes that are already gone are not an error.
    pub async fn terminate(&mut self) -> Result<()> {
        if self.terminated {
            debug!(pid = self.pid, "termination already issued; ignoring");
            return Ok(());
        }
        self.terminated = true;

        let root_reaped = self.collect_exit();
        let pid = self.pid;

        let delivered = tokio::task::spawn_blocking(move || tree::signal_tree(pid, root_reaped))
            .await
            .map_err(|e| HarnessError::Other(anyhow::anyhow!("termination task failed: {e}")))?
            .map_err(|reason| HarnessError::TerminationError { pid, reason })?;

        info!(pid, signals = delivered, "sent SIGTERM to process tree");
        Ok(())
    }

    /// Reap the root if it already exited. Returns true when its PID must
    /// no longer be signalled.
    fn collect_exit(&mut self) -> bool {
        if self.child.id().is_none() {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(pid = self.pid, %status, "process had already exited");
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(pid = self.pid, error = %e, "could not query process status");
                false
            }
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        let root_reaped = self.collect_exit();
        if !root_reaped {
            warn!(
                pid = self.pid,
                "process handle dropped while process is running; sending SIGTERM to its tree"
            );
        }
        if let Err(reason) = tree::signal_tree(self.pid, root_reaped) {
            warn!(pid = self.pid, error = %reason, "emergency termination failed");
        }
    }
}

/// Re-emit a child stream line by line as `tracing` events.
fn forward_lines<R>(stream: Option<R>, pid: u32, stream_name: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let Some(stream) = stream else {
        return;
    };
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(target: "backend", pid, stream = stream_name, "{}", line);
        }
        debug!(pid, stream = stream_name, "output stream closed");
    });
}
