// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::core::CoreLoop;
use crate::engine::lifecycle::LifecycleListeners;
use crate::engine::{LoopInput, RunState};
use crate::errors::{IbazelError, Result};
use crate::exec::{BuildTool, CommandContext, ProcessHandle, ProcessLauncher, RunCommand};
use crate::query::{build_files_query, source_files_query, Querier};
use crate::types::{ChangeKind, Verb, WatchTarget};
use crate::watch::{EventStreams, Watcher};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Knobs fixed for the lifetime of one control loop.
#[derive(Debug, Clone)]
pub struct LoopOptions {
    /// Quiet period after the last file event before reacting.
    pub debounce: Duration,
    /// Arguments forwarded to the binary of a `run` target.
    pub run_args: Vec<String>,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            run_args: Vec::new(),
        }
    }
}

/// External capabilities the loop drives.
pub struct Collaborators {
    pub querier: Arc<dyn Querier>,
    pub watcher: Box<dyn Watcher>,
    pub build_tool: Arc<dyn BuildTool>,
    pub launcher: Arc<dyn ProcessLauncher>,
    pub listeners: LifecycleListeners,
}

/// Async shell around [`CoreLoop`].
///
/// Each iteration performs the IO belonging to the current state (query,
/// execute, wait, debounce), turns the outcome into a [`LoopInput`] and lets
/// the core pick the next state. Only query and watch failures end the loop;
/// build, test and run failures are logged and the loop keeps watching.
pub struct ControlLoop {
    core: CoreLoop,
    target: WatchTarget,
    options: LoopOptions,
    querier: Arc<dyn Querier>,
    watcher: Box<dyn Watcher>,
    build_tool: Arc<dyn BuildTool>,
    launcher: Arc<dyn ProcessLauncher>,
    listeners: LifecycleListeners,
    process: ProcessHandle,
    command: Option<RunCommand>,
}

impl fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlLoop")
            .field("state", &self.core.state())
            .field("target", &self.target)
            .field("options", &self.options)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl ControlLoop {
    pub fn new(target: WatchTarget, options: LoopOptions, collaborators: Collaborators) -> Self {
        let Collaborators {
            querier,
            watcher,
            build_tool,
            launcher,
            listeners,
        } = collaborators;

        Self {
            core: CoreLoop::new(),
            target,
            options,
            querier,
            watcher,
            build_tool,
            launcher,
            listeners,
            process: ProcessHandle::new(),
            command: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.core.state()
    }

    /// Handle to the supervised child, for the signal coordinator.
    pub fn process_handle(&self) -> ProcessHandle {
        self.process.clone()
    }

    /// The run strategy, once the first `run` has chosen one.
    pub fn command(&self) -> Option<&RunCommand> {
        self.command.as_ref()
    }

    /// Hand `bazel info` to the listeners. A failing `info` is not fatal.
    pub async fn initialize(&mut self) {
        let info = match self.build_tool.info().await {
            Ok(info) => info,
            Err(err) => {
                warn!(error = %err, "could not read bazel info");
                Default::default()
            }
        };
        self.listeners.initialize(&info);
    }

    /// Run until a fatal error.
    pub async fn run(&mut self) -> Result<()> {
        info!(verb = %self.target.verb, targets = %self.target.joined(), "control loop started");
        loop {
            self.iteration().await?;
        }
    }

    /// Perform the work of the current state and take one transition.
    pub async fn iteration(&mut self) -> Result<()> {
        let state = self.core.state();
        debug!(%state, "control loop iteration");

        let input = match state {
            RunState::QueryPending => {
                self.query().await?;
                LoopInput::QueryCompleted
            }
            RunState::Executing => {
                self.execute().await?;
                LoopInput::CommandCompleted
            }
            RunState::Watching => self.wait_for_change().await?,
            RunState::DebounceSourceChange => self.debounce(ChangeKind::Source).await?,
            RunState::DebounceGraphChange => self.debounce(ChangeKind::Graph).await?,
        };

        self.advance(input);
        Ok(())
    }

    /// Stop the child, release watches and tell the listeners.
    pub async fn cleanup(&mut self) {
        self.process.terminate().await;
        self.watcher.cleanup();
        self.listeners.cleanup();
    }

    fn advance(&mut self, input: LoopInput) {
        let step = self.core.step(input);
        if step.changed_state() {
            debug!(from = %step.from, to = %step.to, "state transition");
        }
        if let Some(change) = step.change {
            match change.kind {
                ChangeKind::Source => {
                    info!("Changed: {}. Rebuilding...", change.path.display())
                }
                ChangeKind::Graph => {
                    info!("Build graph changed: {}. Requerying...", change.path.display())
                }
            }
            self.listeners
                .change_detected(&self.target.targets, change.kind, &change.path);
        }
    }

    async fn query(&mut self) -> Result<()> {
        let targets = &self.target.targets;

        info!("Querying for BUILD files...");
        let build_files = self
            .querier
            .query_for_source_files(build_files_query(targets))
            .await
            .map_err(into_fatal)?;
        let build_count = self.watcher.watch_build_files(&build_files).map_err(into_fatal)?;

        info!("Querying for source files...");
        let source_files = self
            .querier
            .query_for_source_files(source_files_query(targets))
            .await
            .map_err(into_fatal)?;
        let source_count = self.watcher.watch_source_files(&source_files).map_err(into_fatal)?;

        info!("Watching: {build_count} BUILD files, {source_count} source files");
        Ok(())
    }

    async fn execute(&mut self) -> Result<()> {
        let verb = self.target.verb;
        let targets = self.target.targets.clone();

        self.listeners.before_command(&targets, verb);

        let result = match verb {
            Verb::Build => {
                self.build_tool.cancel();
                self.build_tool.build(targets.clone()).await
            }
            Verb::Test => {
                self.build_tool.cancel();
                self.build_tool.test(targets.clone()).await
            }
            Verb::Run => self.run_target().await,
        };

        let success = match result {
            Ok(()) => true,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(%verb, error = %err, "command failed; waiting for the next change");
                false
            }
        };

        self.listeners.after_command(&targets, verb, success);
        Ok(())
    }

    async fn run_target(&mut self) -> Result<()> {
        if let Some(command) = self.command.as_mut() {
            info!("notifying of changes");
            return command.notify_of_changes().await;
        }

        let target = self
            .target
            .targets
            .first()
            .cloned()
            .ok_or_else(|| IbazelError::ConfigError("run needs a target".to_string()))?;

        let rule = self
            .querier
            .query_rule(target.clone())
            .await
            .map_err(into_fatal)?;
        self.listeners.target_decider(&target, &rule);

        let ctx = CommandContext {
            target,
            args: self.options.run_args.clone(),
            build_tool: Arc::clone(&self.build_tool),
            launcher: Arc::clone(&self.launcher),
            process: self.process.clone(),
        };

        // Kept even if the first start fails; later cycles go through
        // notify_of_changes.
        let command = self.command.insert(RunCommand::for_rule(&rule, ctx));
        command.start().await
    }

    async fn wait_for_change(&mut self) -> Result<LoopInput> {
        let EventStreams { build, source } = self.watcher.streams();

        tokio::select! {
            Some(event) = source.recv() => Ok(LoopInput::SourceChanged(event.path)),
            Some(event) = build.recv() => Ok(LoopInput::GraphChanged(event.path)),
            else => Err(IbazelError::WatchError(
                "file watcher event streams closed".to_string(),
            )),
        }
    }

    /// Wait for either another event of `kind` or the end of the quiet period.
    async fn debounce(&mut self, kind: ChangeKind) -> Result<LoopInput> {
        let window = self.options.debounce;
        let EventStreams { build, source } = self.watcher.streams();
        let events = match kind {
            ChangeKind::Source => source,
            ChangeKind::Graph => build,
        };

        tokio::select! {
            event = events.recv() => {
                let event = event.ok_or_else(|| {
                    IbazelError::WatchError(format!("{kind} event stream closed"))
                })?;
                Ok(match kind {
                    ChangeKind::Source => LoopInput::SourceChanged(event.path),
                    ChangeKind::Graph => LoopInput::GraphChanged(event.path),
                })
            }
            _ = tokio::time::sleep(window) => Ok(LoopInput::DebounceElapsed),
        }
    }
}

/// Anything that goes wrong while resolving what to watch is fatal.
fn into_fatal(err: IbazelError) -> IbazelError {
    if err.is_fatal() {
        err
    } else {
        IbazelError::QueryError(err.to_string())
    }
}
