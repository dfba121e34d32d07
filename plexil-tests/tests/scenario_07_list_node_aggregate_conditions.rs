//! A `List` node with three children: `add_plan` must synthesize
//! `AllChildrenFinished`/`AllChildrenWaitingOrFinished` over all three,
//! not just a single child the way a `LibraryCall` body would. The list
//! must not finish while any child is still running, even though two of
//! its three children finish immediately.

mod common;

use common::RecordingInterface;
use plexil_exec::{Config, ExecContext, InputRecord};
use plexil_node::{ConditionKind, NodeBody};
use plexil_value::{NodeOutcome, NodeState, State, Value};

#[test]
fn list_node_waits_for_every_child_before_finishing() {
    let mut exec = ExecContext::new(RecordingInterface::default(), Config::default());

    let start_true = exec.exprs.alloc_constant(Value::Bool(true));
    let root = exec.nodes.alloc("list", None, NodeBody::Empty);
    let a = exec.nodes.alloc("a", Some(root), NodeBody::Empty);
    let b = exec.nodes.alloc("b", Some(root), NodeBody::Empty);
    let c = exec.nodes.alloc("c", Some(root), NodeBody::Empty);

    exec.nodes.get_mut(root).body = NodeBody::List(vec![a, b, c]);
    exec.nodes.get_mut(root).set_condition(ConditionKind::Start, start_true);

    exec.nodes.get_mut(a).set_condition(ConditionKind::Start, start_true);
    exec.nodes.get_mut(b).set_condition(ConditionKind::Start, start_true);

    // c's End condition is gated behind an unanswered Lookup, so it alone
    // stays in Executing after the first macro-step.
    exec.nodes.get_mut(c).set_condition(ConditionKind::Start, start_true);
    let go = exec.exprs.alloc_lookup("Go", &[], false);
    exec.nodes.get_mut(c).set_condition(ConditionKind::End, go);

    exec.add_plan(root);
    exec.step();

    assert_eq!(exec.nodes.get(a).state, NodeState::Finished);
    assert_eq!(exec.nodes.get(b).state, NodeState::Finished);
    assert_eq!(exec.nodes.get(c).state, NodeState::Executing, "gated by an unanswered lookup");
    assert_eq!(
        exec.nodes.get(root).state,
        NodeState::Executing,
        "AllChildrenFinished must not read true while c is still running"
    );

    exec.input_queue.push(InputRecord::LookupReturn { state: State::new("Go", vec![]), value: Value::Bool(true) });
    exec.step();

    assert_eq!(exec.nodes.get(c).state, NodeState::Finished);
    assert_eq!(exec.nodes.get(root).state, NodeState::Finished);
    assert_eq!(exec.nodes.get(root).outcome, NodeOutcome::Success);
    assert!(!exec.needs_step());
}
