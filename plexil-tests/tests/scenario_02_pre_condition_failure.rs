//! Start=true, Pre=false yields Failure/PreConditionFailed without ever
//! entering Executing.

mod common;

use common::RecordingInterface;
use plexil_exec::{Config, ExecContext};
use plexil_node::{ConditionKind, NodeBody};
use plexil_value::{FailureType, NodeOutcome, NodeState, Value};

#[test]
fn pre_condition_false_skips_executing() {
    let mut exec = ExecContext::new(RecordingInterface::default(), Config::default());
    let id = exec.nodes.alloc("root", None, NodeBody::Empty);
    let start = exec.exprs.alloc_constant(Value::Bool(true));
    let pre = exec.exprs.alloc_constant(Value::Bool(false));
    exec.nodes.get_mut(id).set_condition(ConditionKind::Start, start);
    exec.nodes.get_mut(id).set_condition(ConditionKind::Pre, pre);

    exec.add_plan(id);
    exec.step();

    assert_eq!(exec.nodes.get(id).state, NodeState::Finished);
    assert_eq!(exec.nodes.get(id).outcome, NodeOutcome::Failure);
    assert_eq!(exec.nodes.get(id).failure_type, FailureType::PreConditionFailed);
    assert!(exec.interface().commands_executed.is_empty(), "never reached Executing, so nothing ran");
}
