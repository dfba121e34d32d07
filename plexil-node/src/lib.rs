//! The PLEXIL `Node` domain model: state machine, conditions, local
//! variables, and action bodies, built on top of `plexil-expr`'s generic
//! expression graph (`ExprArena<NodeId>`) without that crate ever knowing
//! about `Node` (SPEC_FULL.md DESIGN NOTES).

mod arena;
mod assignment;
mod command;
mod node;
mod resource;
mod transition;
mod update;

pub use arena::NodeArena;
pub use assignment::{Assignable, Assignment};
pub use command::Command;
pub use node::{synthesize_aggregate_conditions, ConditionKind, Node, NodeBody, NodeId, QueueStatus};
pub use resource::{ResourceSpec, ResourceValue};
pub use transition::{active_conditions, commit_transition, destination_state, Destination};
pub use update::Update;

#[cfg(test)]
mod tests {
    use super::*;
    use plexil_expr::ExprArena;
    use plexil_value::{NodeOutcome, NodeState, Value};

    /// Scenario 1 of spec.md §8: a single Empty node with Start=true runs
    /// Inactive -> Waiting -> Executing -> IterationEnded -> Finished with
    /// outcome Success.
    #[test]
    fn single_empty_node_reaches_success() {
        let mut exprs: ExprArena<NodeId> = ExprArena::new();
        let mut nodes = NodeArena::new();
        let id = nodes.alloc("root", None, NodeBody::Empty);

        let start = exprs.alloc_constant(Value::Bool(true));
        nodes.get_mut(id).set_condition(ConditionKind::Start, start);

        // Inactive -> Waiting: root has no parent, ancestor conditions default clear.
        let dest = destination_state(&nodes, &exprs, id).expect("should transition");
        assert_eq!(dest.0, NodeState::Waiting);
        commit_transition(&mut nodes, &mut exprs, id, dest.0, dest.1, dest.2, 0.0);

        // Waiting -> Executing: Start true, Pre/Exit/Invariant at their defaults.
        let dest = destination_state(&nodes, &exprs, id).expect("should transition");
        assert_eq!(dest.0, NodeState::Executing);
        commit_transition(&mut nodes, &mut exprs, id, dest.0, dest.1, dest.2, 0.1);

        // Executing -> IterationEnded: End/Post default true, no children.
        let dest = destination_state(&nodes, &exprs, id).expect("should transition");
        assert_eq!(dest.0, NodeState::IterationEnded);
        assert_eq!(dest.1, NodeOutcome::Success);
        commit_transition(&mut nodes, &mut exprs, id, dest.0, dest.1, dest.2, 0.2);

        // IterationEnded -> Finished: Repeat defaults false.
        let dest = destination_state(&nodes, &exprs, id).expect("should transition");
        assert_eq!(dest.0, NodeState::Finished);
        assert_eq!(dest.1, NodeOutcome::Success);
    }

    /// Scenario 2: Start=true, Pre=false yields Failure/PreConditionFailed
    /// without ever reaching Executing.
    #[test]
    fn pre_condition_false_skips_executing() {
        let mut exprs: ExprArena<NodeId> = ExprArena::new();
        let mut nodes = NodeArena::new();
        let id = nodes.alloc("root", None, NodeBody::Empty);

        let start = exprs.alloc_constant(Value::Bool(true));
        let pre = exprs.alloc_constant(Value::Bool(false));
        nodes.get_mut(id).set_condition(ConditionKind::Start, start);
        nodes.get_mut(id).set_condition(ConditionKind::Pre, pre);

        let dest = destination_state(&nodes, &exprs, id).unwrap();
        commit_transition(&mut nodes, &mut exprs, id, dest.0, dest.1, dest.2, 0.0);
        assert_eq!(nodes.get(id).state, NodeState::Waiting);

        let dest = destination_state(&nodes, &exprs, id).unwrap();
        assert_eq!(dest.0, NodeState::IterationEnded);
        assert_eq!(dest.1, NodeOutcome::Failure);
        assert_eq!(dest.2, plexil_value::FailureType::PreConditionFailed);
    }

    #[test]
    fn unknown_start_defers_transition() {
        let mut exprs: ExprArena<NodeId> = ExprArena::new();
        let mut nodes = NodeArena::new();
        let id = nodes.alloc("root", None, NodeBody::Empty);
        let start = exprs.alloc_variable(Value::Unknown);
        nodes.get_mut(id).set_condition(ConditionKind::Start, start);

        let dest = destination_state(&nodes, &exprs, id).unwrap();
        commit_transition(&mut nodes, &mut exprs, id, dest.0, dest.1, dest.2, 0.0);
        assert_eq!(nodes.get(id).state, NodeState::Waiting);

        assert!(destination_state(&nodes, &exprs, id).is_none(), "Unknown Start must defer, not satisfy or fail");
    }
}
