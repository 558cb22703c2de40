// tests/restart_strategy.rs
#![cfg(target_os = "linux")]

mod common;
use crate::common::{eventually, FakeQuerier, FixedLauncher, Harness};

use std::fs;
use std::path::Path;
use std::sync::Arc;

use ibazel::engine::RunState;
use ibazel::query::Rule;
use ibazel::types::Verb;

/// Alive and not a zombie.
fn is_alive(pid: u32) -> bool {
    fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| {
            // Field 3, after the parenthesised command name.
            let rest = stat.rsplit_once(')')?.1;
            rest.split_whitespace().next().map(|s| s != "Z")
        })
        .unwrap_or(false)
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[tokio::test]
async fn restart_replaces_the_whole_process_group() {
    let tmp = tempfile::tempdir().unwrap();
    let grandchild_file = tmp.path().join("grandchild.pid");

    // The child forks a grandchild that stays in the child's process group.
    let script = format!(
        "sleep 30 & echo $! > {}; wait",
        grandchild_file.display()
    );
    let querier = FakeQuerier::new()
        .with_source_files(&["main.go"])
        .with_rule(Rule::new("//server").with_kind("go_binary"));
    let mut h = Harness::with_launcher(
        Verb::Run,
        &["//server"],
        querier,
        Arc::new(FixedLauncher::shell(&script)),
    );
    let process = h.control.process_handle();

    h.start().await;
    assert!(!h.control.command().unwrap().is_notify());
    let first = process.pid().await.expect("child should be running");
    eventually(|| read_pid(&grandchild_file).is_some()).await;
    let grandchild = read_pid(&grandchild_file).unwrap();
    fs::remove_file(&grandchild_file).unwrap();
    assert!(is_alive(grandchild));

    h.watcher.source_changed("main.go");
    h.step_until(RunState::Watching).await;

    let second = process.pid().await.expect("child should be restarted");
    assert_ne!(first, second);
    assert!(process.is_running().await);
    assert!(!is_alive(first));
    eventually(|| !is_alive(grandchild)).await;

    // The rule is looked up once per invocation.
    assert_eq!(h.querier.rule_queries(), vec!["//server"]);
    assert_eq!(
        h.build_tool.invocations(),
        vec![vec!["Run", "//server"], vec!["Run", "//server"]]
    );

    h.control.cleanup().await;
    assert!(!process.is_running().await);
}

#[tokio::test]
async fn failed_first_start_is_retried_on_next_change() {
    let querier = FakeQuerier::new().with_source_files(&["main.go"]);
    let mut h = Harness::with_launcher(
        Verb::Run,
        &["//server"],
        querier,
        Arc::new(FixedLauncher::new("sleep", &["30"])),
    );
    let process = h.control.process_handle();

    h.build_tool.set_failing(true);
    h.start().await;
    assert!(h.control.command().is_some());
    assert!(!process.is_running().await);

    h.build_tool.set_failing(false);
    h.watcher.source_changed("main.go");
    h.step_until(RunState::Watching).await;

    assert!(process.is_running().await);
    assert_eq!(h.querier.rule_queries().len(), 1);

    h.control.cleanup().await;
}

#[tokio::test]
async fn run_args_reach_the_child() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("args");
    let script = format!("echo \"$@\" > {}; sleep 30", out.display());

    let querier = FakeQuerier::new();
    let mut h = Harness::with_run_args(
        Verb::Run,
        &["//tool"],
        querier,
        Arc::new(FixedLauncher::new("sh", &["-c", &script, "sh"])),
        &["--port", "8080"],
    );

    h.start().await;
    eventually(|| fs::read_to_string(&out).is_ok_and(|s| s.ends_with('\n'))).await;
    assert_eq!(fs::read_to_string(&out).unwrap().trim(), "--port 8080");

    h.control.cleanup().await;
}
