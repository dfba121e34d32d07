//! A single Empty node with Start=true runs Inactive -> Waiting ->
//! Executing -> IterationEnded -> Finished with outcome Success, driven
//! through the full macro-step loop rather than hand-stepped transitions.

mod common;

use common::RecordingInterface;
use plexil_exec::{Config, ExecContext};
use plexil_node::{ConditionKind, NodeBody};
use plexil_value::{NodeOutcome, NodeState, Value};

#[test]
fn single_empty_node_reaches_finished_success() {
    let mut exec = ExecContext::new(RecordingInterface::default(), Config::default());
    let id = exec.nodes.alloc("root", None, NodeBody::Empty);
    let start = exec.exprs.alloc_constant(Value::Bool(true));
    exec.nodes.get_mut(id).set_condition(ConditionKind::Start, start);

    exec.add_plan(id);
    exec.step();

    assert_eq!(exec.nodes.get(id).state, NodeState::Finished);
    assert_eq!(exec.nodes.get(id).outcome, NodeOutcome::Success);
    assert!(!exec.needs_step());
    assert_eq!(exec.active_root_count(), 0, "a Finished root is swept after the macro-step");
}
