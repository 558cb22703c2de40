// src/exec/build_tool.rs

//! Pluggable build tool abstraction.
//!
//! The control loop and the run strategies talk to a `BuildTool` instead of
//! spawning `bazel` directly. This makes it easy to swap in a fake in tests
//! while keeping the production implementation in [`BazelCli`].

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{IbazelError, Result};
use crate::exec::process::interrupt_process;

/// Boxed future returned by the object-safe collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait abstracting the build tool.
///
/// A non-zero exit of the underlying tool is reported as
/// [`IbazelError::CommandFailed`].
pub trait BuildTool: Send + Sync {
    fn build(&self, targets: Vec<String>) -> BoxFuture<'_, Result<()>>;

    fn test(&self, targets: Vec<String>) -> BoxFuture<'_, Result<()>>;

    /// Build `target` and write a standalone launcher script to
    /// `script_path` (`bazel run --script_path=...`).
    fn run_script(&self, script_path: PathBuf, target: String) -> BoxFuture<'_, Result<()>>;

    /// `bazel info` as key/value pairs.
    fn info(&self) -> BoxFuture<'_, Result<BTreeMap<String, String>>>;

    /// Stop an in-flight invocation, if any.
    fn cancel(&self);
}

/// Build tool backed by the `bazel` binary.
#[derive(Debug, Clone)]
pub struct BazelCli {
    path: PathBuf,
    args: Vec<String>,
    workspace: Option<PathBuf>,
    write_stdout: bool,
    write_stderr: bool,
    in_flight: Arc<Mutex<Option<u32>>>,
}

impl BazelCli {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
            workspace: None,
            write_stdout: true,
            write_stderr: true,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Extra arguments placed after the verb of every build/test/run.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn write_to_stdout(mut self, enabled: bool) -> Self {
        self.write_stdout = enabled;
        self
    }

    pub fn write_to_stderr(mut self, enabled: bool) -> Self {
        self.write_stderr = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn command(&self, verb: &str, extra: &[String], with_args: bool) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.arg(verb);
        if with_args {
            cmd.args(&self.args);
        }
        cmd.args(extra).stdin(Stdio::null()).kill_on_drop(true);
        if let Some(ref dir) = self.workspace {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn set_in_flight(&self, pid: Option<u32>) {
        *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner) = pid;
    }

    fn stream(enabled: bool) -> Stdio {
        if enabled {
            Stdio::inherit()
        } else {
            Stdio::null()
        }
    }

    /// Run `bazel <verb> <args> <extra>` streaming its output, and fail on a
    /// non-zero exit status.
    async fn invoke(&self, verb: &str, extra: Vec<String>) -> Result<()> {
        let mut cmd = self.command(verb, &extra, true);
        cmd.stdout(Self::stream(self.write_stdout))
            .stderr(Self::stream(self.write_stderr));

        debug!(bazel = ?self.path, verb, args = ?extra, "invoking build tool");

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {} {verb}", self.path.display()))?;

        self.set_in_flight(child.id());
        let status = child.wait().await;
        self.set_in_flight(None);

        let status = status.with_context(|| format!("waiting for {} {verb}", self.path.display()))?;
        if status.success() {
            Ok(())
        } else {
            Err(IbazelError::CommandFailed {
                verb: verb.to_string(),
                detail: format!("bazel exited with {status}"),
            })
        }
    }

    /// Run `bazel <verb> <extra>` and return its stdout.
    ///
    /// The configured extra args are not applied here: they are build
    /// options, which `query` and `info` do not all accept.
    pub async fn capture(&self, verb: &str, extra: Vec<String>) -> Result<String> {
        let mut cmd = self.command(verb, &extra, false);
        cmd.stdout(Stdio::piped())
            .stderr(Self::stream(self.write_stderr));

        debug!(bazel = ?self.path, verb, args = ?extra, "capturing build tool output");

        let output = cmd
            .output()
            .await
            .with_context(|| format!("running {} {verb}", self.path.display()))?;

        if !output.status.success() {
            return Err(IbazelError::CommandFailed {
                verb: verb.to_string(),
                detail: format!("bazel exited with {}", output.status),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl BuildTool for BazelCli {
    fn build(&self, targets: Vec<String>) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.invoke("build", targets))
    }

    fn test(&self, targets: Vec<String>) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.invoke("test", targets))
    }

    fn run_script(&self, script_path: PathBuf, target: String) -> BoxFuture<'_, Result<()>> {
        let extra = vec![
            format!("--script_path={}", script_path.display()),
            target,
        ];
        Box::pin(self.invoke("run", extra))
    }

    fn info(&self) -> BoxFuture<'_, Result<BTreeMap<String, String>>> {
        Box::pin(async move {
            let stdout = self.capture("info", Vec::new()).await?;
            Ok(parse_info(&stdout))
        })
    }

    fn cancel(&self) {
        let pid = *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pid) = pid {
            debug!(pid, "cancelling in-flight build tool invocation");
            if let Err(err) = interrupt_process(pid) {
                warn!(pid, error = %err, "failed to cancel build tool invocation");
            }
        }
    }
}

/// Parse `bazel info` output (`key: value` per line).
pub fn parse_info(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once(": "))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}
