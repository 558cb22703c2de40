// src/watch/watcher.rs

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::types::ChangeEvent;
use crate::watch::{EventStreams, Watcher};

/// [`Watcher`] built on `notify`.
///
/// Each set of files gets its own `RecommendedWatcher`. The parent directory
/// of every file is watched (non-recursively) so editors that save by
/// replacing the file are still seen; events are then filtered down to the
/// exact files asked for.
pub struct FsWatcher {
    build: WatchSet,
    source: WatchSet,
    build_rx: UnboundedReceiver<ChangeEvent>,
    source_rx: UnboundedReceiver<ChangeEvent>,
}

impl fmt::Debug for FsWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsWatcher")
            .field("build_dirs", &self.build.dirs.len())
            .field("source_dirs", &self.source.dirs.len())
            .finish()
    }
}

impl FsWatcher {
    pub fn new() -> Result<Self> {
        let (build_tx, build_rx) = mpsc::unbounded_channel();
        let (source_tx, source_rx) = mpsc::unbounded_channel();

        Ok(Self {
            build: WatchSet::new("build", build_tx)?,
            source: WatchSet::new("source", source_tx)?,
            build_rx,
            source_rx,
        })
    }
}

impl Watcher for FsWatcher {
    fn watch_build_files(&mut self, paths: &[PathBuf]) -> Result<usize> {
        self.build.replace(paths)
    }

    fn watch_source_files(&mut self, paths: &[PathBuf]) -> Result<usize> {
        self.source.replace(paths)
    }

    fn streams(&mut self) -> EventStreams<'_> {
        EventStreams {
            build: &mut self.build_rx,
            source: &mut self.source_rx,
        }
    }

    fn cleanup(&mut self) {
        self.build.clear();
        self.source.clear();
        info!("file watches released");
    }
}

struct WatchSet {
    label: &'static str,
    watcher: RecommendedWatcher,
    dirs: HashSet<PathBuf>,
    files: Arc<Mutex<HashSet<PathBuf>>>,
}

impl WatchSet {
    fn new(label: &'static str, tx: UnboundedSender<ChangeEvent>) -> Result<Self> {
        let files = Arc::new(Mutex::new(HashSet::new()));
        let watched = Arc::clone(&files);

        // Called synchronously on notify's own thread.
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => forward_event(label, &event, &watched, &tx),
                Err(err) => warn!(set = label, error = %err, "file watch error"),
            },
            Config::default(),
        )?;

        Ok(Self {
            label,
            watcher,
            dirs: HashSet::new(),
            files,
        })
    }

    fn replace(&mut self, paths: &[PathBuf]) -> Result<usize> {
        let files: HashSet<PathBuf> = paths.iter().cloned().collect();
        let dirs: HashSet<PathBuf> = paths
            .iter()
            .filter_map(|p| p.parent())
            .filter(|d| d.is_dir())
            .map(Path::to_path_buf)
            .collect();

        for dir in self.dirs.difference(&dirs) {
            if let Err(err) = self.watcher.unwatch(dir) {
                debug!(set = self.label, dir = ?dir, error = %err, "unwatch failed");
            }
        }
        for dir in dirs.difference(&self.dirs) {
            self.watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }

        debug!(set = self.label, files = files.len(), dirs = dirs.len(), "watch set replaced");

        let count = files.len();
        self.dirs = dirs;
        *self.files.lock().unwrap_or_else(PoisonError::into_inner) = files;
        Ok(count)
    }

    fn clear(&mut self) {
        for dir in self.dirs.drain() {
            if let Err(err) = self.watcher.unwatch(&dir) {
                debug!(set = self.label, dir = ?dir, error = %err, "unwatch failed");
            }
        }
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

fn forward_event(
    label: &str,
    event: &Event,
    watched: &Mutex<HashSet<PathBuf>>,
    tx: &UnboundedSender<ChangeEvent>,
) {
    // Reads and other access events do not change content.
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return;
    }

    let files = watched.lock().unwrap_or_else(PoisonError::into_inner);
    for path in event.paths.iter().filter(|p| files.contains(*p)) {
        debug!(set = label, path = ?path, kind = ?event.kind, "watched file changed");
        if tx.send(ChangeEvent::new(path.clone())).is_err() {
            debug!(set = label, "event receiver dropped");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn source_change_arrives_on_source_stream_only() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        let src = root.join("main.go");
        let other = root.join("ignored.go");
        fs::write(&src, "package main").unwrap();
        fs::write(&other, "package main").unwrap();

        let mut watcher = FsWatcher::new().unwrap();
        assert_eq!(watcher.watch_build_files(&[]).unwrap(), 0);
        assert_eq!(watcher.watch_source_files(&[src.clone()]).unwrap(), 1);

        fs::write(&other, "package other").unwrap();
        fs::write(&src, "package main // edited").unwrap();

        let streams = watcher.streams();
        let event = timeout(Duration::from_secs(5), streams.source.recv())
            .await
            .expect("no source event within 5s")
            .unwrap();
        assert_eq!(event.path, src);
        assert!(streams.build.try_recv().is_err());

        watcher.cleanup();
    }

    #[test]
    fn files_in_missing_directories_are_counted_but_not_watched() {
        let mut watcher = FsWatcher::new().unwrap();
        let count = watcher
            .watch_source_files(&[PathBuf::from("/definitely/not/here/x.rs")])
            .unwrap();
        assert_eq!(count, 1);
        assert!(watcher.source.dirs.is_empty());
    }
}
