#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use ibazel::engine::{Collaborators, ControlLoop, LifecycleListeners, LoopOptions, RunState};
use ibazel::exec::{ProcessLauncher, SystemLauncher};
use ibazel::types::{Verb, WatchTarget};

pub use ibazel_test_utils::builders;
pub use ibazel_test_utils::fakes::{
    fake_watcher, FakeBuildTool, FakeQuerier, FixedLauncher, LifecycleEvent, RecordingExit,
    RecordingListener, WatcherInjector,
};
pub use ibazel_test_utils::{init_tracing, with_timeout};

/// Short enough to keep tests fast, long enough to batch injected events.
pub const TEST_DEBOUNCE: Duration = Duration::from_millis(20);

/// A control loop wired to fakes, plus the handles to inspect them.
pub struct Harness {
    pub control: ControlLoop,
    pub build_tool: FakeBuildTool,
    pub querier: FakeQuerier,
    pub watcher: WatcherInjector,
    pub listener: RecordingListener,
}

impl Harness {
    pub fn new(verb: Verb, targets: &[&str], querier: FakeQuerier) -> Self {
        Self::with_launcher(verb, targets, querier, Arc::new(SystemLauncher))
    }

    pub fn with_launcher(
        verb: Verb,
        targets: &[&str],
        querier: FakeQuerier,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        Self::with_run_args(verb, targets, querier, launcher, &[])
    }

    pub fn with_run_args(
        verb: Verb,
        targets: &[&str],
        querier: FakeQuerier,
        launcher: Arc<dyn ProcessLauncher>,
        run_args: &[&str],
    ) -> Self {
        let options = LoopOptions {
            debounce: TEST_DEBOUNCE,
            run_args: run_args.iter().map(|a| a.to_string()).collect(),
        };
        Self::with_options(verb, targets, querier, launcher, options)
    }

    pub fn with_options(
        verb: Verb,
        targets: &[&str],
        querier: FakeQuerier,
        launcher: Arc<dyn ProcessLauncher>,
        options: LoopOptions,
    ) -> Self {
        init_tracing();

        let build_tool = FakeBuildTool::new();
        let listener = RecordingListener::new();
        let (watcher, injector) = fake_watcher();

        let target = WatchTarget::new(verb, targets.iter().map(|t| t.to_string()).collect());
        let collaborators = Collaborators {
            querier: Arc::new(querier.clone()),
            watcher: Box::new(watcher),
            build_tool: Arc::new(build_tool.clone()),
            launcher,
            listeners: LifecycleListeners::new().with(listener.clone()),
        };

        Self {
            control: ControlLoop::new(target, options, collaborators),
            build_tool,
            querier,
            watcher: injector,
            listener,
        }
    }

    /// Run one iteration and return the state it ended in.
    pub async fn step(&mut self) -> RunState {
        with_timeout(self.control.iteration())
            .await
            .expect("iteration failed");
        self.control.state()
    }

    /// Iterate until the loop reaches `state`.
    pub async fn step_until(&mut self, state: RunState) {
        with_timeout(async {
            while self.control.state() != state {
                self.control.iteration().await.expect("iteration failed");
            }
        })
        .await;
    }

    /// Query, execute once and settle in `Watching`.
    pub async fn start(&mut self) {
        self.step_until(RunState::Watching).await;
    }

    pub fn change_events(&self) -> Vec<LifecycleEvent> {
        self.listener
            .events()
            .into_iter()
            .filter(|e| matches!(e, LifecycleEvent::ChangeDetected(..)))
            .collect()
    }
}

/// Poll `check` until it holds or five seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    with_timeout(async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
}
