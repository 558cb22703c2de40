// src/exec/process.rs

//! OS process bookkeeping for the supervised child.
//!
//! - [`ProcessLauncher`] turns a program path into a `tokio::process::Command`
//!   so tests can substitute what actually gets executed.
//! - [`ChildProcess`] is one spawned child living in its own process group.
//! - [`ProcessHandle`] is the single shared slot both the control loop and the
//!   signal coordinator act on. Every mutation of the slot happens under one
//!   lock. The notification pipe has a lock of its own, so a child that stops
//!   reading stdin can stall a writer but never `terminate`.

use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::{IbazelError, Result};

/// Capability for building the command that launches a runnable artifact.
pub trait ProcessLauncher: Send + Sync {
    fn command(&self, program: &Path, args: &[String]) -> Command;
}

/// Launches the program as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn command(&self, program: &Path, args: &[String]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd
    }
}

/// How the child's standard input is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdinMode {
    /// `/dev/null`; the child is in a background process group and must not
    /// read the terminal.
    Null,
    /// A pipe kept by the supervisor for build-completion messages.
    Piped,
}

type NotifyPipe = Arc<Mutex<ChildStdin>>;

/// A spawned child and the process group it leads.
pub struct ChildProcess {
    child: Child,
    pid: u32,
    stdin: Option<NotifyPipe>,
    // Keeps the materialized run script on disk for the child's lifetime.
    script: Option<TempPath>,
}

impl fmt::Debug for ChildProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildProcess")
            .field("pid", &self.pid)
            .field("has_stdin", &self.stdin.is_some())
            .finish_non_exhaustive()
    }
}

impl ChildProcess {
    /// Spawn `command` as the leader of a new process group, sharing our
    /// stdout/stderr.
    pub fn spawn(mut command: Command, stdin: StdinMode) -> Result<Self> {
        command
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        match stdin {
            StdinMode::Null => command.stdin(Stdio::null()),
            StdinMode::Piped => command.stdin(Stdio::piped()),
        };

        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| IbazelError::ProcessError(format!("starting child process: {e}")))?;

        let pid = child.id().ok_or_else(|| {
            IbazelError::ProcessError("child exited before its pid could be read".to_string())
        })?;
        let stdin = child.stdin.take().map(|pipe| Arc::new(Mutex::new(pipe)));

        Ok(Self {
            child,
            pid,
            stdin,
            script: None,
        })
    }

    /// Tie the lifetime of a temporary run script to this child.
    pub fn with_script(mut self, script: TempPath) -> Self {
        self.script = Some(script);
        self
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Reflects the OS-level exit status, reaping the child if it is done.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    async fn kill_tree_and_wait(&mut self) {
        if let Err(err) = kill_process_tree(self.pid, &mut self.child) {
            warn!(pid = self.pid, error = %err, "failed to kill process tree");
        }

        // A writer still holding the pipe gets EPIPE once the group is gone.
        self.stdin = None;

        match self.child.wait().await {
            Ok(status) => debug!(pid = self.pid, %status, "child reaped"),
            Err(err) => warn!(pid = self.pid, error = %err, "failed to reap child"),
        }
    }
}

/// Kill the child and every descendant that stayed in its process group.
#[cfg(unix)]
pub fn kill_process_tree(pid: u32, _child: &mut Child) -> Result<()> {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    killpg(Pid::from_raw(pid as i32), Signal::SIGKILL).map_err(|e| {
        IbazelError::ProcessError(format!("sending SIGKILL to process group {pid}: {e}"))
    })
}

/// Kill the child. Without process groups only the direct child is reached.
#[cfg(not(unix))]
pub fn kill_process_tree(pid: u32, child: &mut Child) -> Result<()> {
    child
        .start_kill()
        .map_err(|e| IbazelError::ProcessError(format!("killing process {pid}: {e}")))
}

/// Ask a single process to stop the way Ctrl-C would.
#[cfg(unix)]
pub fn interrupt_process(pid: u32) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGINT)
        .map_err(|e| IbazelError::ProcessError(format!("sending SIGINT to {pid}: {e}")))
}

#[cfg(not(unix))]
pub fn interrupt_process(pid: u32) -> Result<()> {
    debug!(pid, "interrupting processes is not supported on this platform");
    Ok(())
}

/// Shared reference to at most one live child.
///
/// Cloning the handle shares the slot. `terminate` may be called from any
/// task at any time and is a no-op when nothing is running.
#[derive(Clone, Default)]
pub struct ProcessHandle {
    slot: Arc<Mutex<Option<ChildProcess>>>,
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle").finish_non_exhaustive()
    }
}

impl ProcessHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly spawned child, killing any child still in the slot.
    pub async fn install(&self, child: ChildProcess) {
        let mut slot = self.slot.lock().await;

        if let Some(mut previous) = slot.take() {
            if previous.is_running() {
                warn!(
                    pid = previous.pid(),
                    "replacing a child that is still running; killing it first"
                );
                previous.kill_tree_and_wait().await;
            }
        }

        info!(pid = child.pid(), "child process started");
        *slot = Some(child);
    }

    /// Kill the running child's process tree and reap it.
    ///
    /// Returns whether a running child was actually killed. The slot is empty
    /// afterwards in every case.
    pub async fn terminate(&self) -> bool {
        let mut slot = self.slot.lock().await;

        let Some(mut child) = slot.take() else {
            return false;
        };

        if !child.is_running() {
            debug!(pid = child.pid(), "child already exited; nothing to kill");
            return false;
        }

        child.kill_tree_and_wait().await;
        info!(pid = child.pid(), "child process terminated");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_mut()
            .is_some_and(ChildProcess::is_running)
    }

    pub async fn pid(&self) -> Option<u32> {
        self.slot.lock().await.as_ref().map(ChildProcess::pid)
    }

    /// Write one line to the child's notification pipe.
    ///
    /// The slot lock is released before writing; only the pipe stays locked
    /// while the write is pending.
    pub async fn write_line(&self, line: &str) -> Result<()> {
        let pipe = {
            let slot = self.slot.lock().await;
            let child = slot.as_ref().ok_or_else(|| {
                IbazelError::ProcessError("no child process to notify".to_string())
            })?;
            child.stdin.clone().ok_or_else(|| {
                IbazelError::ProcessError(format!("child {} has no notification pipe", child.pid))
            })?
        };

        let mut stdin = pipe.lock().await;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }
}
