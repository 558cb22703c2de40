// src/watch/mod.rs

//! File watching.
//!
//! The control loop consumes two independent streams: changes to BUILD files
//! (which invalidate the watch lists) and changes to source files (which only
//! invalidate the last build). A [`Watcher`] is re-armed with fresh path lists
//! after every query.
//!
//! It does **not** decide which files belong to a target; that is the
//! querier's job.

pub mod watcher;

use std::path::PathBuf;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::errors::Result;
use crate::types::ChangeEvent;

pub use watcher::FsWatcher;

/// Both receive-only event streams, borrowed together so the control loop can
/// race them.
#[derive(Debug)]
pub struct EventStreams<'a> {
    pub build: &'a mut UnboundedReceiver<ChangeEvent>,
    pub source: &'a mut UnboundedReceiver<ChangeEvent>,
}

/// File watcher feeding the control loop.
pub trait Watcher: Send {
    /// Replace the set of watched BUILD files; returns how many are watched.
    fn watch_build_files(&mut self, paths: &[PathBuf]) -> Result<usize>;

    /// Replace the set of watched source files; returns how many are watched.
    fn watch_source_files(&mut self, paths: &[PathBuf]) -> Result<usize>;

    fn streams(&mut self) -> EventStreams<'_>;

    /// Release every watch.
    fn cleanup(&mut self);
}
