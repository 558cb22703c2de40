// src/engine/core.rs

//! Pure control-loop state machine.
//!
//! [`CoreLoop`] consumes [`LoopInput`]s and returns the transition taken. It
//! has no channels, timers or processes; the async shell in
//! `engine::runtime` does the IO and reports back what happened.

use std::path::PathBuf;

use tracing::debug;

use crate::engine::{LoopInput, RunState};
use crate::types::ChangeKind;

/// A change that moved the loop out of `Watching`; listeners hear about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDetected {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

/// Result of feeding one input to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub from: RunState,
    pub to: RunState,
    /// Set only on the `Watching -> Debounce*` edges.
    pub change: Option<ChangeDetected>,
}

impl CoreStep {
    pub fn changed_state(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone)]
pub struct CoreLoop {
    state: RunState,
}

impl Default for CoreLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreLoop {
    /// Every loop starts by querying.
    pub fn new() -> Self {
        Self {
            state: RunState::QueryPending,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Apply one input. Inputs with no edge from the current state leave it
    /// unchanged.
    pub fn step(&mut self, input: LoopInput) -> CoreStep {
        use LoopInput::*;
        use RunState::*;

        let from = self.state;
        let (to, change) = match (from, input) {
            (QueryPending, QueryCompleted) => (Executing, None),
            (Executing, CommandCompleted) => (Watching, None),

            (Watching, SourceChanged(path)) => (
                DebounceSourceChange,
                Some(ChangeDetected {
                    kind: ChangeKind::Source,
                    path,
                }),
            ),
            (Watching, GraphChanged(path)) => (
                DebounceGraphChange,
                Some(ChangeDetected {
                    kind: ChangeKind::Graph,
                    path,
                }),
            ),

            (DebounceSourceChange, SourceChanged(_)) => (DebounceSourceChange, None),
            (DebounceSourceChange, DebounceElapsed) => (Executing, None),

            (DebounceGraphChange, GraphChanged(_)) => (DebounceGraphChange, None),
            (DebounceGraphChange, DebounceElapsed) => (QueryPending, None),

            (state, input) => {
                debug!(%state, ?input, "input has no transition from this state; ignoring");
                (state, None)
            }
        };

        self.state = to;
        CoreStep { from, to, change }
    }
}
