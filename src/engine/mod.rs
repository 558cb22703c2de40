// src/engine/mod.rs

//! The watch-react control loop.
//!
//! This module ties together:
//! - the pure state machine ([`core`]) deciding what state follows what input
//! - the async IO shell ([`runtime`]) that queries, runs the verb and races
//!   file events against the debounce timer
//! - lifecycle listeners ([`lifecycle`]) notified around every phase
//! - the signal coordinator ([`signals`]) running beside the loop

use std::fmt;
use std::path::PathBuf;

/// The control loop's state. Exactly one is active at a time; there is no
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Ask the querier for watch lists and arm the watcher.
    QueryPending,
    /// A BUILD file changed; waiting for the burst to settle.
    DebounceGraphChange,
    /// Idle, waiting for a file event.
    Watching,
    /// A source file changed; waiting for the burst to settle.
    DebounceSourceChange,
    /// Run the verb against the targets.
    Executing,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::QueryPending => "QUERY",
            RunState::DebounceGraphChange => "DEBOUNCE_QUERY",
            RunState::Watching => "WAIT",
            RunState::DebounceSourceChange => "DEBOUNCE_RUN",
            RunState::Executing => "RUN",
        };
        f.write_str(name)
    }
}

/// Inputs fed to the pure core by the IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopInput {
    /// Watch lists were queried and the watcher armed.
    QueryCompleted,
    /// The verb ran (successfully or not).
    CommandCompleted,
    /// A watched source file changed.
    SourceChanged(PathBuf),
    /// A watched BUILD file changed.
    GraphChanged(PathBuf),
    /// The debounce window closed with no further event.
    DebounceElapsed,
}

pub mod core;
pub mod lifecycle;
pub mod runtime;
pub mod signals;

pub use core::{ChangeDetected, CoreLoop, CoreStep};
pub use lifecycle::{CommandTimer, Lifecycle, LifecycleListeners};
pub use runtime::{Collaborators, ControlLoop, LoopOptions, DEFAULT_DEBOUNCE};
pub use signals::{ExitHandler, ProcessExit, SignalCoordinator, SupervisorSignal};
