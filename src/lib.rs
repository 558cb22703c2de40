// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod query;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::{load_or_default, parse_duration, ConfigFile};
use crate::engine::{
    Collaborators, CommandTimer, ControlLoop, LifecycleListeners, LoopOptions, ProcessExit,
    SignalCoordinator,
};
use crate::errors::{IbazelError, Result};
use crate::exec::{BazelCli, SystemLauncher};
use crate::query::{find_workspace, BazelQuerier};
use crate::watch::FsWatcher;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - workspace discovery and config loading (with CLI overrides)
/// - the bazel build tool and querier
/// - the file watcher
/// - the control loop and the signal coordinator
///
/// Only returns on a fatal error; a clean shutdown goes through the signal
/// coordinator and exits the process.
pub async fn run(args: CliArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let workspace = find_workspace(&cwd)?;
    info!(workspace = %workspace.display(), "found bazel workspace");

    let cfg = resolve_config(&args, &workspace)?;
    debug!(?cfg, "effective configuration");

    let target = args.command.watch_target();
    let options = LoopOptions {
        debounce: cfg.debounce(),
        run_args: args.command.run_args(),
    };

    let bazel = BazelCli::new(&cfg.bazel.path)
        .with_args(cfg.bazel.args.clone())
        .with_workspace(&workspace)
        .write_to_stdout(cfg.bazel.write_stdout)
        .write_to_stderr(cfg.bazel.write_stderr);
    let querier = BazelQuerier::new(BazelCli::new(&cfg.bazel.path), &workspace);

    let collaborators = Collaborators {
        querier: Arc::new(querier),
        watcher: Box::new(FsWatcher::new()?),
        build_tool: Arc::new(bazel),
        launcher: Arc::new(SystemLauncher),
        listeners: LifecycleListeners::new().with(CommandTimer::new()),
    };

    let mut control = ControlLoop::new(target, options, collaborators);
    control.initialize().await;

    let _signals =
        SignalCoordinator::new(control.process_handle(), Arc::new(ProcessExit)).spawn()?;

    let result = control.run().await;
    if let Err(ref err) = result {
        error!(error = %err, "control loop stopped");
        control.cleanup().await;
    }
    result
}

/// Load the config file and apply command-line overrides on top.
fn resolve_config(args: &CliArgs, workspace: &Path) -> Result<ConfigFile> {
    let mut cfg = load_or_default(args.config.as_deref().map(Path::new), workspace)?;

    if let Some(ref debounce) = args.debounce {
        let window = parse_duration(debounce)
            .map_err(|e| IbazelError::ConfigError(format!("--debounce: {e}")))?;
        cfg.set_debounce(window);
    }
    if let Some(ref bazel) = args.bazel {
        if bazel.trim().is_empty() {
            return Err(IbazelError::ConfigError("--bazel must not be empty".to_string()));
        }
        cfg.bazel.path = bazel.clone();
    }
    cfg.bazel.args.extend(args.bazel_args.iter().cloned());

    Ok(cfg)
}
