// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`build_tool`] provides the `BuildTool` trait and the `BazelCli`
//!   implementation used in production; tests swap in a fake.
//! - [`process`] owns the supervised child: process-group spawning, tree
//!   kill, and the `ProcessHandle` shared with the signal coordinator.
//! - [`command`] picks between the two run strategies, [`restart`] and
//!   [`notify`].

pub mod build_tool;
pub mod command;
pub mod notify;
pub mod process;
pub mod restart;

pub use build_tool::{BazelCli, BoxFuture, BuildTool};
pub use command::{CommandContext, RunCommand};
pub use notify::{NotifyCommand, BUILD_FAILURE_LINE, BUILD_SUCCESS_LINE, NOTIFY_ENV_VAR};
pub use process::{ChildProcess, ProcessHandle, ProcessLauncher, StdinMode, SystemLauncher};
pub use restart::RestartCommand;
