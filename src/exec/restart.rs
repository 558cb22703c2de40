// src/exec/restart.rs

use tracing::info;

use crate::errors::Result;
use crate::exec::command::CommandContext;
use crate::exec::process::{ChildProcess, StdinMode};

/// Default run strategy: every change kills the child's process group and
/// launches a freshly built binary.
#[derive(Debug)]
pub struct RestartCommand {
    ctx: CommandContext,
}

impl RestartCommand {
    pub fn new(ctx: CommandContext) -> Self {
        Self { ctx }
    }

    /// Build the target and launch it in a new process group.
    pub async fn start(&mut self) -> Result<()> {
        let script = self.ctx.materialize().await?;

        let command = self.ctx.launcher.command(&script, &self.ctx.args);
        let child = ChildProcess::spawn(command, StdinMode::Null)?.with_script(script);

        info!(target = %self.ctx.target, pid = child.pid(), "launched target");
        self.ctx.process.install(child).await;
        Ok(())
    }

    pub async fn terminate(&mut self) {
        self.ctx.process.terminate().await;
    }

    /// The only way to tell this child about a change is to restart it.
    pub async fn notify_of_changes(&mut self) -> Result<()> {
        self.terminate().await;
        self.start().await
    }

    pub async fn is_running(&self) -> bool {
        self.ctx.process.is_running().await
    }
}
