#![allow(dead_code)]

//! In-memory stand-ins for the control loop's collaborators.
//!
//! Every fake is cheap to clone; clones share state so a test can hand one
//! copy to the loop and inspect another.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::process::Command;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use ibazel::engine::{ExitHandler, Lifecycle};
use ibazel::errors::{IbazelError, Result};
use ibazel::exec::{BoxFuture, BuildTool, ProcessLauncher};
use ibazel::query::{Querier, Rule};
use ibazel::types::{ChangeEvent, ChangeKind, Verb};
use ibazel::watch::{EventStreams, Watcher};

// ---------------------------------------------------------------------------
// Build tool
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BuildState {
    actions: Vec<Vec<String>>,
    fail: bool,
    info: BTreeMap<String, String>,
}

/// Records every invocation as a list of words, e.g. `["Build", "//foo"]`,
/// `["Run", "//foo"]` or `["Cancel"]`.
#[derive(Clone, Default)]
pub struct FakeBuildTool {
    state: Arc<Mutex<BuildState>>,
}

impl FakeBuildTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every build/test/run fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }

    pub fn set_info(&self, key: &str, value: &str) {
        self.state
            .lock()
            .unwrap()
            .info
            .insert(key.to_string(), value.to_string());
    }

    pub fn actions(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().actions.clone()
    }

    /// Actions excluding cancellations.
    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.actions()
            .into_iter()
            .filter(|a| a.first().map(String::as_str) != Some("Cancel"))
            .collect()
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().actions.clear();
    }

    fn record(&self, verb: &str, words: Vec<String>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mut action = vec![verb.to_string()];
        action.extend(words);
        state.actions.push(action);

        if state.fail {
            Err(IbazelError::CommandFailed {
                verb: verb.to_lowercase(),
                detail: "fake build tool told to fail".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl BuildTool for FakeBuildTool {
    fn build(&self, targets: Vec<String>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.record("Build", targets) })
    }

    fn test(&self, targets: Vec<String>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.record("Test", targets) })
    }

    fn run_script(&self, _script_path: PathBuf, target: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.record("Run", vec![target]) })
    }

    fn info(&self) -> BoxFuture<'_, Result<BTreeMap<String, String>>> {
        Box::pin(async move { Ok(self.state.lock().unwrap().info.clone()) })
    }

    fn cancel(&self) {
        self.state
            .lock()
            .unwrap()
            .actions
            .push(vec!["Cancel".to_string()]);
    }
}

// ---------------------------------------------------------------------------
// Querier
// ---------------------------------------------------------------------------

#[derive(Default)]
struct QueryState {
    build_files: Vec<PathBuf>,
    source_files: Vec<PathBuf>,
    rule: Rule,
    fail: bool,
    queries: Vec<String>,
    rule_queries: Vec<String>,
}

/// Answers `buildfiles(...)` queries with the configured BUILD files and every
/// other query with the configured source files.
#[derive(Clone, Default)]
pub struct FakeQuerier {
    state: Arc<Mutex<QueryState>>,
}

impl FakeQuerier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_build_files(self, files: &[&str]) -> Self {
        self.state.lock().unwrap().build_files = files.iter().map(PathBuf::from).collect();
        self
    }

    pub fn with_source_files(self, files: &[&str]) -> Self {
        self.state.lock().unwrap().source_files = files.iter().map(PathBuf::from).collect();
        self
    }

    pub fn with_rule(self, rule: Rule) -> Self {
        self.state.lock().unwrap().rule = rule;
        self
    }

    pub fn set_failing(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }

    pub fn set_source_files(&self, files: &[&str]) {
        self.state.lock().unwrap().source_files = files.iter().map(PathBuf::from).collect();
    }

    /// Every file query evaluated so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn rule_queries(&self) -> Vec<String> {
        self.state.lock().unwrap().rule_queries.clone()
    }
}

impl Querier for FakeQuerier {
    fn query_for_source_files(&self, query: String) -> BoxFuture<'_, Result<Vec<PathBuf>>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.queries.push(query.clone());
            if state.fail {
                return Err(IbazelError::QueryError(format!("{query}: fake querier failure")));
            }
            if query.starts_with("buildfiles(") {
                Ok(state.build_files.clone())
            } else {
                Ok(state.source_files.clone())
            }
        })
    }

    fn query_rule(&self, target: String) -> BoxFuture<'_, Result<Rule>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.rule_queries.push(target.clone());
            if state.fail {
                return Err(IbazelError::QueryError(format!("{target}: fake querier failure")));
            }
            let mut rule = state.rule.clone();
            if rule.name.is_empty() {
                rule.name = target;
            }
            Ok(rule)
        })
    }
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

#[derive(Default)]
struct WatchedFiles {
    build: Vec<PathBuf>,
    source: Vec<PathBuf>,
    fail: bool,
    cleaned_up: bool,
}

/// Watcher whose events are pushed by the test through a [`WatcherInjector`].
pub struct FakeWatcher {
    build_rx: UnboundedReceiver<ChangeEvent>,
    source_rx: UnboundedReceiver<ChangeEvent>,
    watched: Arc<Mutex<WatchedFiles>>,
}

/// Test-side handle of a [`FakeWatcher`]. Dropping every injector closes
/// both streams.
#[derive(Clone)]
pub struct WatcherInjector {
    build_tx: UnboundedSender<ChangeEvent>,
    source_tx: UnboundedSender<ChangeEvent>,
    watched: Arc<Mutex<WatchedFiles>>,
}

pub fn fake_watcher() -> (FakeWatcher, WatcherInjector) {
    let (build_tx, build_rx) = mpsc::unbounded_channel();
    let (source_tx, source_rx) = mpsc::unbounded_channel();
    let watched = Arc::new(Mutex::new(WatchedFiles::default()));

    (
        FakeWatcher {
            build_rx,
            source_rx,
            watched: Arc::clone(&watched),
        },
        WatcherInjector {
            build_tx,
            source_tx,
            watched,
        },
    )
}

impl Watcher for FakeWatcher {
    fn watch_build_files(&mut self, paths: &[PathBuf]) -> Result<usize> {
        let mut watched = self.watched.lock().unwrap();
        if watched.fail {
            return Err(IbazelError::WatchError("fake watcher failure".to_string()));
        }
        watched.build = paths.to_vec();
        Ok(paths.len())
    }

    fn watch_source_files(&mut self, paths: &[PathBuf]) -> Result<usize> {
        let mut watched = self.watched.lock().unwrap();
        if watched.fail {
            return Err(IbazelError::WatchError("fake watcher failure".to_string()));
        }
        watched.source = paths.to_vec();
        Ok(paths.len())
    }

    fn streams(&mut self) -> EventStreams<'_> {
        EventStreams {
            build: &mut self.build_rx,
            source: &mut self.source_rx,
        }
    }

    fn cleanup(&mut self) {
        self.watched.lock().unwrap().cleaned_up = true;
    }
}

impl WatcherInjector {
    pub fn source_changed(&self, path: &str) {
        self.source_tx.send(ChangeEvent::new(path)).unwrap();
    }

    pub fn graph_changed(&self, path: &str) {
        self.build_tx.send(ChangeEvent::new(path)).unwrap();
    }

    pub fn set_failing(&self, fail: bool) {
        self.watched.lock().unwrap().fail = fail;
    }

    pub fn build_files(&self) -> Vec<PathBuf> {
        self.watched.lock().unwrap().build.clone()
    }

    pub fn source_files(&self) -> Vec<PathBuf> {
        self.watched.lock().unwrap().source.clone()
    }

    pub fn cleaned_up(&self) -> bool {
        self.watched.lock().unwrap().cleaned_up
    }
}

// ---------------------------------------------------------------------------
// Lifecycle / exit / launcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Initialize(BTreeMap<String, String>),
    TargetDecider(String, Rule),
    ChangeDetected(ChangeKind, PathBuf),
    BeforeCommand(Verb),
    AfterCommand(Verb, bool),
    Cleanup,
}

#[derive(Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: LifecycleEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Lifecycle for RecordingListener {
    fn initialize(&mut self, info: &BTreeMap<String, String>) {
        self.push(LifecycleEvent::Initialize(info.clone()));
    }

    fn target_decider(&mut self, target: &str, rule: &Rule) {
        self.push(LifecycleEvent::TargetDecider(target.to_string(), rule.clone()));
    }

    fn change_detected(&mut self, _targets: &[String], kind: ChangeKind, path: &Path) {
        self.push(LifecycleEvent::ChangeDetected(kind, path.to_path_buf()));
    }

    fn before_command(&mut self, _targets: &[String], verb: Verb) {
        self.push(LifecycleEvent::BeforeCommand(verb));
    }

    fn after_command(&mut self, _targets: &[String], verb: Verb, success: bool) {
        self.push(LifecycleEvent::AfterCommand(verb, success));
    }

    fn cleanup(&mut self) {
        self.push(LifecycleEvent::Cleanup);
    }
}

/// Records exit codes instead of exiting.
#[derive(Debug, Default)]
pub struct RecordingExit {
    codes: Mutex<Vec<i32>>,
}

impl RecordingExit {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn codes(&self) -> Vec<i32> {
        self.codes.lock().unwrap().clone()
    }
}

impl ExitHandler for RecordingExit {
    fn exit(&self, code: i32) {
        self.codes.lock().unwrap().push(code);
    }
}

/// Launches a fixed program regardless of the script the build produced.
#[derive(Debug, Clone)]
pub struct FixedLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl FixedLauncher {
    pub fn new(program: impl Into<PathBuf>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// `sh -c <script>`.
    pub fn shell(script: &str) -> Self {
        Self::new("sh", &["-c", script])
    }
}

impl ProcessLauncher for FixedLauncher {
    fn command(&self, _program: &Path, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).args(args);
        cmd
    }
}
