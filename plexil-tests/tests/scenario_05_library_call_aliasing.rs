//! Library call with parameter aliasing: the body's "x" parameter is the
//! exact same `ExprId` the caller passed in (no copy), the body's ancestor
//! conditions reference the root's own conditions directly (again no
//! copy), and the call nesting is recorded through the ordinary `parent`
//! chain rather than a dedicated call-depth field. The root's
//! `ActionComplete`/`End` conditions are never authored here -- `add_plan`
//! synthesizes `AllChildrenFinished`/`AllChildrenWaitingOrFinished` over the
//! body's state automatically, the same as it would for a multi-child List
//! node.

mod common;

use common::RecordingInterface;
use plexil_exec::{Config, ExecContext};
use plexil_expr::Operator;
use plexil_node::{ConditionKind, NodeBody};
use plexil_value::{NodeOutcome, NodeState, Value};

fn ctx() -> ExecContext<RecordingInterface> {
    ExecContext::new(RecordingInterface::default(), Config::default())
}

#[test]
fn body_observes_aliased_parameter_and_shares_ancestor_conditions() {
    let mut exec = ctx();

    // The caller's actual argument: the library body will read this
    // ExprId directly wherever it refers to its "x" parameter.
    let x = exec.exprs.alloc_variable(Value::Int(3));

    // The root's own Exit condition -- the body's AncestorExit is wired to
    // this exact expression, not a fresh copy of its current value.
    let root_exit = exec.exprs.alloc_variable(Value::Bool(false));
    let start_true = exec.exprs.alloc_constant(Value::Bool(true));

    let root = exec.nodes.alloc("call", None, NodeBody::Empty);
    let body = exec.nodes.alloc("libBody", Some(root), NodeBody::Empty);

    let three = exec.exprs.alloc_constant(Value::Int(3));
    let x_eq_3 = exec.exprs.alloc_op(Operator::Eq, &[x, three]);

    exec.nodes.get_mut(root).body = NodeBody::LibraryCall { library: "Check".into(), aliases: vec![("x".into(), x)], body };
    exec.nodes.get_mut(root).set_condition(ConditionKind::Start, start_true);
    exec.nodes.get_mut(root).set_condition(ConditionKind::Exit, root_exit);

    exec.nodes.get_mut(body).set_condition(ConditionKind::Start, start_true);
    exec.nodes.get_mut(body).set_condition(ConditionKind::AncestorExit, root_exit);
    exec.nodes.get_mut(body).set_condition(ConditionKind::End, x_eq_3);

    exec.add_plan(root);
    exec.step();

    assert_eq!(exec.nodes.get(body).parent, Some(root), "call nesting recorded through the ordinary parent chain");
    assert_eq!(exec.nodes.get(body).state, NodeState::Finished);
    assert_eq!(exec.nodes.get(body).outcome, NodeOutcome::Success);
    assert_eq!(exec.nodes.get(root).state, NodeState::Finished);
    assert_eq!(exec.nodes.get(root).outcome, NodeOutcome::Success);
    assert!(!exec.needs_step());
}

#[test]
fn ancestor_exit_shared_with_root_interrupts_body_without_a_copy() {
    let mut exec = ctx();

    let x = exec.exprs.alloc_variable(Value::Int(3));
    // Lookup-backed so the test can flip it the same way a host would --
    // through the input queue -- rather than poking the arena directly.
    let root_exit = exec.exprs.alloc_lookup("Abort", &[], false);
    let start_true = exec.exprs.alloc_constant(Value::Bool(true));
    let never = exec.exprs.alloc_constant(Value::Bool(false));

    let root = exec.nodes.alloc("call", None, NodeBody::Empty);
    let body = exec.nodes.alloc("libBody", Some(root), NodeBody::Empty);

    exec.nodes.get_mut(root).body = NodeBody::LibraryCall { library: "Check".into(), aliases: vec![("x".into(), x)], body };
    exec.nodes.get_mut(root).set_condition(ConditionKind::Start, start_true);
    exec.nodes.get_mut(root).set_condition(ConditionKind::Exit, root_exit);

    exec.nodes.get_mut(body).set_condition(ConditionKind::Start, start_true);
    exec.nodes.get_mut(body).set_condition(ConditionKind::AncestorExit, root_exit);
    // Never satisfied on its own -- only the shared root_exit condition
    // should be able to move the body out of Executing.
    exec.nodes.get_mut(body).set_condition(ConditionKind::End, never);

    exec.input_queue.push(plexil_exec::InputRecord::LookupReturn {
        state: plexil_value::State::new("Abort", vec![]),
        value: Value::Bool(false),
    });
    exec.add_plan(root);
    exec.step();
    assert_eq!(exec.nodes.get(body).state, NodeState::Executing);

    exec.input_queue.push(plexil_exec::InputRecord::LookupReturn {
        state: plexil_value::State::new("Abort", vec![]),
        value: Value::Bool(true),
    });
    exec.step();

    assert_eq!(exec.nodes.get(body).outcome, NodeOutcome::Interrupted);
    assert_eq!(exec.nodes.get(body).failure_type, plexil_value::FailureType::ParentExited);
}
