// src/engine/lifecycle.rs

//! Observers of the control loop.
//!
//! Listeners are called synchronously, in registration order, from the loop
//! task. Every hook has a no-op default so a listener only implements what it
//! cares about.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use crate::query::Rule;
use crate::types::{ChangeKind, Verb};

pub trait Lifecycle: Send {
    /// Called once with `bazel info` output, before the first query.
    fn initialize(&mut self, _info: &BTreeMap<String, String>) {}

    /// Called once per `run` invocation with the resolved rule.
    fn target_decider(&mut self, _target: &str, _rule: &Rule) {}

    /// Called when a change moves the loop out of `Watching`.
    fn change_detected(&mut self, _targets: &[String], _kind: ChangeKind, _path: &Path) {}

    fn before_command(&mut self, _targets: &[String], _verb: Verb) {}

    fn after_command(&mut self, _targets: &[String], _verb: Verb, _success: bool) {}

    fn cleanup(&mut self) {}
}

/// Ordered list of listeners; every broadcast reaches all of them.
#[derive(Default)]
pub struct LifecycleListeners {
    listeners: Vec<Box<dyn Lifecycle>>,
}

impl fmt::Debug for LifecycleListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

impl LifecycleListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Box<dyn Lifecycle>) {
        self.listeners.push(listener);
    }

    pub fn with(mut self, listener: impl Lifecycle + 'static) -> Self {
        self.add(Box::new(listener));
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn initialize(&mut self, info: &BTreeMap<String, String>) {
        for l in &mut self.listeners {
            l.initialize(info);
        }
    }

    pub fn target_decider(&mut self, target: &str, rule: &Rule) {
        for l in &mut self.listeners {
            l.target_decider(target, rule);
        }
    }

    pub fn change_detected(&mut self, targets: &[String], kind: ChangeKind, path: &Path) {
        for l in &mut self.listeners {
            l.change_detected(targets, kind, path);
        }
    }

    pub fn before_command(&mut self, targets: &[String], verb: Verb) {
        for l in &mut self.listeners {
            l.before_command(targets, verb);
        }
    }

    pub fn after_command(&mut self, targets: &[String], verb: Verb, success: bool) {
        for l in &mut self.listeners {
            l.after_command(targets, verb, success);
        }
    }

    pub fn cleanup(&mut self) {
        for l in &mut self.listeners {
            l.cleanup();
        }
    }
}

/// Logs how long each command took and whether it succeeded.
#[derive(Debug, Default)]
pub struct CommandTimer {
    started: Option<Instant>,
}

impl CommandTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Lifecycle for CommandTimer {
    fn before_command(&mut self, targets: &[String], verb: Verb) {
        info!("{} {}", verb.progressive(), targets.join(" "));
        self.started = Some(Instant::now());
    }

    fn after_command(&mut self, targets: &[String], verb: Verb, success: bool) {
        let elapsed = self.started.take().map(|t| t.elapsed()).unwrap_or_default();
        if success {
            info!(%verb, targets = %targets.join(" "), ?elapsed, success, "command finished");
        } else {
            warn!(%verb, targets = %targets.join(" "), ?elapsed, success, "command finished");
        }
    }
}
