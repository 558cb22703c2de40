// tests/notify_strategy.rs
#![cfg(unix)]

mod common;
use crate::common::{
    eventually, with_timeout, FakeQuerier, FixedLauncher, Harness, LifecycleEvent,
};

use std::fs;
use std::path::Path;
use std::sync::Arc;

use ibazel::engine::RunState;
use ibazel::query::{Rule, NOTIFY_TAG};
use ibazel::types::Verb;

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// A child that records its notify marker and echoes every stdin line to a
/// file until stdin closes.
fn recorder(dir: &Path) -> FixedLauncher {
    let script = format!(
        "echo \"$IBAZEL_NOTIFY_CHANGES\" > {env}; \
         while read -r line; do echo \"$line\" >> {out}; done",
        env = dir.join("env").display(),
        out = dir.join("lines").display(),
    );
    FixedLauncher::shell(&script)
}

#[tokio::test]
async fn child_is_told_about_each_rebuild_and_never_restarted() {
    let tmp = tempfile::tempdir().unwrap();
    let querier = FakeQuerier::new()
        .with_source_files(&["server.js"])
        .with_rule(Rule::new("//web:server").with_kind("nodejs_binary").with_tag(NOTIFY_TAG));
    let mut h = Harness::with_launcher(
        Verb::Run,
        &["//web:server"],
        querier,
        Arc::new(recorder(tmp.path())),
    );
    let process = h.control.process_handle();

    h.start().await;
    assert!(h.control.command().unwrap().is_notify());
    let pid = process.pid().await.expect("child should be running");

    let env = tmp.path().join("env");
    eventually(|| lines(&env) == ["y"]).await;

    let out = tmp.path().join("lines");
    h.watcher.source_changed("server.js");
    h.step_until(RunState::Watching).await;
    eventually(|| lines(&out).len() == 1).await;
    assert_eq!(lines(&out), ["IBAZEL_BUILD_COMPLETED SUCCESS"]);

    h.build_tool.set_failing(true);
    h.watcher.source_changed("server.js");
    h.step_until(RunState::Executing).await;
    h.step().await;
    eventually(|| lines(&out).len() == 2).await;
    assert_eq!(
        lines(&out),
        ["IBAZEL_BUILD_COMPLETED SUCCESS", "IBAZEL_BUILD_COMPLETED FAILURE"]
    );

    assert_eq!(process.pid().await, Some(pid));
    assert!(process.is_running().await);
    assert_eq!(
        h.build_tool.invocations(),
        vec![
            vec!["Run", "//web:server"],
            vec!["Build", "//web:server"],
            vec!["Build", "//web:server"],
        ]
    );

    h.control.cleanup().await;
    assert!(!process.is_running().await);
}

#[tokio::test]
async fn exited_child_does_not_stop_the_loop() {
    let querier = FakeQuerier::new()
        .with_source_files(&["a.py"])
        .with_rule(Rule::new("//py:app").with_tag(NOTIFY_TAG));
    let mut h = Harness::with_launcher(
        Verb::Run,
        &["//py:app"],
        querier,
        Arc::new(FixedLauncher::new("true", &[])),
    );
    let process = h.control.process_handle();

    h.start().await;
    with_timeout(async {
        while process.is_running().await {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await;

    h.watcher.source_changed("a.py");
    h.step_until(RunState::Watching).await;
    assert!(
        h.listener
            .events()
            .contains(&LifecycleEvent::AfterCommand(Verb::Run, true))
    );

    h.control.cleanup().await;
}
