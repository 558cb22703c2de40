// src/exec/command.rs

//! The two ways of keeping a `run` target alive across rebuilds.
//!
//! A [`RunCommand`] is picked once, from the target's rule metadata, the first
//! time the control loop runs the target; the choice never changes afterwards.

use std::fmt;
use std::sync::Arc;

use tempfile::TempPath;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::build_tool::BuildTool;
use crate::exec::notify::NotifyCommand;
use crate::exec::process::{ProcessHandle, ProcessLauncher};
use crate::exec::restart::RestartCommand;
use crate::query::Rule;

/// Everything a run strategy needs to build and launch its target.
#[derive(Clone)]
pub struct CommandContext {
    pub target: String,
    /// Arguments forwarded to the launched binary.
    pub args: Vec<String>,
    pub build_tool: Arc<dyn BuildTool>,
    pub launcher: Arc<dyn ProcessLauncher>,
    /// Slot shared with the signal coordinator.
    pub process: ProcessHandle,
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("target", &self.target)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl CommandContext {
    /// Build the target into a standalone launcher script.
    ///
    /// The returned path is deleted when dropped, so callers keep it alive for
    /// as long as the launched child runs.
    pub(crate) async fn materialize(&self) -> Result<TempPath> {
        let script = tempfile::Builder::new()
            .prefix("bazel_script_path")
            .tempfile()?
            .into_temp_path();

        debug!(target = %self.target, script = ?script, "materializing run script");
        self.build_tool
            .run_script(script.to_path_buf(), self.target.clone())
            .await?;

        Ok(script)
    }
}

/// Strategy driving the supervised child of a `run` invocation.
#[derive(Debug)]
pub enum RunCommand {
    /// Kill and relaunch on every change.
    Restart(RestartCommand),
    /// Launch once and report each rebuild over stdin.
    Notify(NotifyCommand),
}

impl RunCommand {
    /// Pick the strategy for `rule`.
    pub fn for_rule(rule: &Rule, ctx: CommandContext) -> Self {
        if rule.wants_notifications() {
            info!(target = %ctx.target, "launching with notifications");
            RunCommand::Notify(NotifyCommand::new(ctx))
        } else {
            RunCommand::Restart(RestartCommand::new(ctx))
        }
    }

    pub fn is_notify(&self) -> bool {
        matches!(self, RunCommand::Notify(_))
    }

    pub async fn start(&mut self) -> Result<()> {
        match self {
            RunCommand::Restart(c) => c.start().await,
            RunCommand::Notify(c) => c.start().await,
        }
    }

    pub async fn terminate(&mut self) {
        match self {
            RunCommand::Restart(c) => c.terminate().await,
            RunCommand::Notify(c) => c.terminate().await,
        }
    }

    pub async fn notify_of_changes(&mut self) -> Result<()> {
        match self {
            RunCommand::Restart(c) => c.notify_of_changes().await,
            RunCommand::Notify(c) => c.notify_of_changes().await,
        }
    }

    pub async fn is_running(&self) -> bool {
        match self {
            RunCommand::Restart(c) => c.is_running().await,
            RunCommand::Notify(c) => c.is_running().await,
        }
    }
}
