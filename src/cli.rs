// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::{Verb, WatchTarget};

/// Command-line arguments for `ibazel`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ibazel",
    version,
    about = "Rebuild, retest or rerun Bazel targets whenever their sources change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `.ibazel.toml` in the workspace root, if present.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<String>,

    /// Delay after the last file event before acting (e.g. `100ms`, `1s`).
    #[arg(long, value_name = "DURATION", global = true)]
    pub debounce: Option<String>,

    /// Path to the bazel binary.
    #[arg(long, value_name = "PATH", global = true)]
    pub bazel: Option<String>,

    /// Extra argument passed to every bazel build/test/run (repeatable).
    #[arg(
        long = "bazel-arg",
        value_name = "ARG",
        global = true,
        allow_hyphen_values = true
    )]
    pub bazel_args: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `IBAZEL_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build the targets on every change.
    Build {
        #[arg(required = true, value_name = "TARGET")]
        targets: Vec<String>,
    },
    /// Test the targets on every change.
    Test {
        #[arg(required = true, value_name = "TARGET")]
        targets: Vec<String>,
    },
    /// Run a single target, restarting or notifying it on every change.
    Run {
        #[arg(value_name = "TARGET")]
        target: String,

        /// Arguments forwarded to the running binary.
        #[arg(last = true, value_name = "ARGS")]
        args: Vec<String>,
    },
}

impl Command {
    pub fn watch_target(&self) -> WatchTarget {
        match self {
            Command::Build { targets } => WatchTarget::new(Verb::Build, targets.clone()),
            Command::Test { targets } => WatchTarget::new(Verb::Test, targets.clone()),
            Command::Run { target, .. } => WatchTarget::new(Verb::Run, vec![target.clone()]),
        }
    }

    /// Arguments for the supervised binary (only meaningful for `run`).
    pub fn run_args(&self) -> Vec<String> {
        match self {
            Command::Run { args, .. } => args.clone(),
            _ => Vec::new(),
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_forwards_trailing_args() {
        let args = CliArgs::try_parse_from([
            "ibazel",
            "--debounce",
            "250ms",
            "run",
            "//foo:server",
            "--",
            "--port",
            "8080",
        ])
        .unwrap();

        assert_eq!(args.debounce.as_deref(), Some("250ms"));
        assert_eq!(
            args.command.watch_target(),
            WatchTarget::new(Verb::Run, vec!["//foo:server".to_string()])
        );
        assert_eq!(args.command.run_args(), vec!["--port", "8080"]);
    }

    #[test]
    fn build_accepts_many_targets() {
        let args = CliArgs::try_parse_from([
            "ibazel",
            "build",
            "//a",
            "//b:c",
            "--bazel-arg=--config=dev",
        ])
        .unwrap();

        let target = args.command.watch_target();
        assert_eq!(target.verb, Verb::Build);
        assert_eq!(target.targets, vec!["//a", "//b:c"]);
        assert_eq!(args.bazel_args, vec!["--config=dev"]);
        assert!(args.command.run_args().is_empty());
    }

    #[test]
    fn build_without_targets_is_rejected() {
        assert!(CliArgs::try_parse_from(["ibazel", "build"]).is_err());
    }
}
