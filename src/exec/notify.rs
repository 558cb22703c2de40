// src/exec/notify.rs

//! Notify-in-place run strategy.
//!
//! The child is launched once with `IBAZEL_NOTIFY_CHANGES=y` and a pipe as its
//! stdin. After every rebuild it receives exactly one line:
//!
//! ```text
//! IBAZEL_BUILD_COMPLETED SUCCESS
//! IBAZEL_BUILD_COMPLETED FAILURE
//! ```

use tracing::{info, warn};

use crate::errors::Result;
use crate::exec::command::CommandContext;
use crate::exec::process::{ChildProcess, StdinMode};

/// Environment variable telling the child it runs in notify mode.
pub const NOTIFY_ENV_VAR: &str = "IBAZEL_NOTIFY_CHANGES";
pub const NOTIFY_ENV_VALUE: &str = "y";

pub const BUILD_SUCCESS_LINE: &str = "IBAZEL_BUILD_COMPLETED SUCCESS\n";
pub const BUILD_FAILURE_LINE: &str = "IBAZEL_BUILD_COMPLETED FAILURE\n";

#[derive(Debug)]
pub struct NotifyCommand {
    ctx: CommandContext,
    started: bool,
}

impl NotifyCommand {
    pub fn new(ctx: CommandContext) -> Self {
        Self {
            ctx,
            started: false,
        }
    }

    /// Build the target once and launch it with a notification pipe.
    pub async fn start(&mut self) -> Result<()> {
        let script = self.ctx.materialize().await?;

        let mut command = self.ctx.launcher.command(&script, &self.ctx.args);
        command.env(NOTIFY_ENV_VAR, NOTIFY_ENV_VALUE);
        let child = ChildProcess::spawn(command, StdinMode::Piped)?.with_script(script);

        info!(target = %self.ctx.target, pid = child.pid(), "launched target in notify mode");
        self.ctx.process.install(child).await;
        self.started = true;
        Ok(())
    }

    pub async fn terminate(&mut self) {
        self.ctx.process.terminate().await;
    }

    /// Rebuild the target and tell the running child how it went.
    ///
    /// The child is never restarted here. If it was never started (the
    /// initial start failed) this starts it instead, since there is nobody
    /// to notify.
    pub async fn notify_of_changes(&mut self) -> Result<()> {
        if !self.started {
            info!(target = %self.ctx.target, "target was never started; starting it now");
            return self.start().await;
        }

        let result = self.ctx.build_tool.build(vec![self.ctx.target.clone()]).await;
        let line = match &result {
            Ok(()) => {
                info!(target = %self.ctx.target, "build succeeded; notifying child");
                BUILD_SUCCESS_LINE
            }
            Err(err) => {
                warn!(target = %self.ctx.target, error = %err, "build failed; notifying child");
                BUILD_FAILURE_LINE
            }
        };

        // The child may have exited on its own since the build started.
        if let Err(err) = self.ctx.process.write_line(line).await {
            warn!(target = %self.ctx.target, error = %err, "could not write build result to child");
        }

        result
    }

    pub async fn is_running(&self) -> bool {
        self.ctx.process.is_running().await
    }
}
