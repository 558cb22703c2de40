// tests/debounce_property.rs

use std::path::PathBuf;

use proptest::prelude::*;

use ibazel::engine::{CoreLoop, LoopInput, RunState};
use ibazel::types::ChangeKind;

fn input_strategy() -> impl Strategy<Value = LoopInput> {
    prop_oneof![
        Just(LoopInput::QueryCompleted),
        Just(LoopInput::CommandCompleted),
        Just(LoopInput::DebounceElapsed),
        "[a-c]\\.rs".prop_map(|p| LoopInput::SourceChanged(PathBuf::from(p))),
        "(BUILD|a/BUILD)".prop_map(|p| LoopInput::GraphChanged(PathBuf::from(p))),
    ]
}

/// Bring a fresh loop into `Watching`.
fn watching() -> CoreLoop {
    let mut core = CoreLoop::new();
    core.step(LoopInput::QueryCompleted);
    core.step(LoopInput::CommandCompleted);
    core
}

proptest! {
    #[test]
    fn transitions_stay_on_the_table(inputs in proptest::collection::vec(input_strategy(), 0..64)) {
        let mut core = CoreLoop::new();

        for input in inputs {
            let step = core.step(input);

            // Listeners hear about a change only when leaving Watching.
            prop_assert_eq!(
                step.change.is_some(),
                step.from == RunState::Watching && step.to != RunState::Watching
            );

            if step.to == RunState::Executing && step.changed_state() {
                prop_assert!(matches!(
                    step.from,
                    RunState::QueryPending | RunState::DebounceSourceChange
                ));
            }
            if step.to == RunState::QueryPending && step.changed_state() {
                prop_assert_eq!(step.from, RunState::DebounceGraphChange);
            }
        }
    }

    #[test]
    fn any_source_burst_runs_exactly_once(
        paths in proptest::collection::vec("[a-z]{1,8}\\.go", 1..20)
    ) {
        let mut core = watching();
        let mut changes = 0;

        for path in paths {
            if core.step(LoopInput::SourceChanged(PathBuf::from(path))).change.is_some() {
                changes += 1;
            }
        }

        prop_assert_eq!(changes, 1);
        prop_assert_eq!(core.state(), RunState::DebounceSourceChange);
        prop_assert_eq!(core.step(LoopInput::DebounceElapsed).to, RunState::Executing);
    }

    #[test]
    fn graph_burst_always_requeries(count in 1usize..20, interleaved_sources in 0usize..5) {
        let mut core = watching();
        let first = core.step(LoopInput::GraphChanged(PathBuf::from("BUILD")));
        prop_assert_eq!(first.change.map(|c| c.kind), Some(ChangeKind::Graph));

        for _ in 1..count {
            core.step(LoopInput::GraphChanged(PathBuf::from("BUILD")));
        }
        // Source events do not move a graph debounce.
        for _ in 0..interleaved_sources {
            core.step(LoopInput::SourceChanged(PathBuf::from("x.go")));
        }

        prop_assert_eq!(core.state(), RunState::DebounceGraphChange);
        prop_assert_eq!(core.step(LoopInput::DebounceElapsed).to, RunState::QueryPending);
    }
}
