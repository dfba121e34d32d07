//! Destination-state computation and the five-step transition-commit
//! protocol (spec.md §4.3). Evaluates conditions in the documented order
//! -- ancestor exits -> ancestor invariants -> ancestor end -> node-
//! specific exits -> invariant -> end -> post -> repeat -- with Unknown
//! always deferring (no transition this candidate pass) rather than ever
//! being treated as satisfied or as tripped.

use plexil_expr::{ExprArena, Listener};
use plexil_value::{FailureType, NodeOutcome, NodeState, Value};

use crate::arena::NodeArena;
use crate::node::{ConditionKind, NodeId};

/// The outcome of evaluating a node's destination: either a transition to
/// commit, or `None` meaning "no viable destination yet" (Unknown-deferred
/// or genuinely not eligible) -- the candidate is simply discarded this
/// pass (spec.md §4.4 step 3a).
pub type Destination = Option<(NodeState, NodeOutcome, FailureType)>;

fn eval_cond(nodes: &NodeArena, exprs: &ExprArena<NodeId>, id: NodeId, kind: ConditionKind) -> Option<bool> {
    match nodes.get(id).condition(kind) {
        None => Some(kind.default_value()),
        Some(expr) => match exprs.value(expr) {
            Value::Bool(b) => Some(b),
            Value::Unknown => None,
            _ => None,
        },
    }
}

enum AncestorVerdict {
    ForceFinished(NodeOutcome, FailureType),
    Clear,
    Defer,
}

fn ancestor_verdict(nodes: &NodeArena, exprs: &ExprArena<NodeId>, id: NodeId) -> AncestorVerdict {
    match eval_cond(nodes, exprs, id, ConditionKind::AncestorExit) {
        Some(true) => return AncestorVerdict::ForceFinished(NodeOutcome::Interrupted, FailureType::ParentExited),
        None => return AncestorVerdict::Defer,
        Some(false) => {}
    }
    match eval_cond(nodes, exprs, id, ConditionKind::AncestorInvariant) {
        Some(false) => return AncestorVerdict::ForceFinished(NodeOutcome::Failure, FailureType::ParentFailed),
        None => return AncestorVerdict::Defer,
        Some(true) => {}
    }
    match eval_cond(nodes, exprs, id, ConditionKind::AncestorEnd) {
        Some(true) => return AncestorVerdict::ForceFinished(NodeOutcome::Skipped, FailureType::None),
        None => return AncestorVerdict::Defer,
        Some(false) => {}
    }
    AncestorVerdict::Clear
}

/// Compute `id`'s destination state given its current state, or `None` if
/// no transition is yet warranted (spec.md §4.3 "Destination-state
/// computation"). Self-loops are asserted against, never silently emitted
/// (spec.md §8: "No node transitions to its own current state").
pub fn destination_state(nodes: &NodeArena, exprs: &ExprArena<NodeId>, id: NodeId) -> Destination {
    let node = nodes.get(id);
    let dest = match node.state {
        NodeState::Inactive => inactive_destination(nodes, exprs, id),
        NodeState::Waiting => waiting_destination(nodes, exprs, id),
        NodeState::Executing => executing_destination(nodes, exprs, id),
        NodeState::Finishing => finishing_destination(nodes, exprs, id),
        NodeState::Failing => failing_destination(nodes, exprs, id, node),
        NodeState::IterationEnded => iteration_ended_destination(nodes, exprs, id, node),
        NodeState::Finished => None,
    };
    if let Some((next, _, _)) = dest {
        debug_assert_ne!(next, node.state, "node {:?} computed a self-loop transition", node.node_id);
    }
    dest
}

fn inactive_destination(nodes: &NodeArena, exprs: &ExprArena<NodeId>, id: NodeId) -> Destination {
    match ancestor_verdict(nodes, exprs, id) {
        AncestorVerdict::ForceFinished(o, f) => Some((NodeState::Finished, o, f)),
        AncestorVerdict::Defer => None,
        AncestorVerdict::Clear => Some((NodeState::Waiting, NodeOutcome::None, FailureType::None)),
    }
}

fn waiting_destination(nodes: &NodeArena, exprs: &ExprArena<NodeId>, id: NodeId) -> Destination {
    match ancestor_verdict(nodes, exprs, id) {
        AncestorVerdict::ForceFinished(o, f) => return Some((NodeState::Finished, o, f)),
        AncestorVerdict::Defer => return None,
        AncestorVerdict::Clear => {}
    }
    match eval_cond(nodes, exprs, id, ConditionKind::Skip)? {
        true => return Some((NodeState::IterationEnded, NodeOutcome::Skipped, FailureType::None)),
        false => {}
    }
    match eval_cond(nodes, exprs, id, ConditionKind::Start)? {
        false => return None,
        true => {}
    }
    match eval_cond(nodes, exprs, id, ConditionKind::Exit)? {
        true => return Some((NodeState::Failing, NodeOutcome::Interrupted, FailureType::Exited)),
        false => {}
    }
    match eval_cond(nodes, exprs, id, ConditionKind::Invariant)? {
        false => return Some((NodeState::Failing, NodeOutcome::Failure, FailureType::InvariantConditionFailed)),
        true => {}
    }
    match eval_cond(nodes, exprs, id, ConditionKind::Pre)? {
        false => Some((NodeState::IterationEnded, NodeOutcome::Failure, FailureType::PreConditionFailed)),
        true => Some((NodeState::Executing, NodeOutcome::None, FailureType::None)),
    }
}

fn own_exit_or_invariant_trip(nodes: &NodeArena, exprs: &ExprArena<NodeId>, id: NodeId) -> Option<Destination> {
    if eval_cond(nodes, exprs, id, ConditionKind::Exit)? {
        return Some(Some((NodeState::Failing, NodeOutcome::Interrupted, FailureType::Exited)));
    }
    if !eval_cond(nodes, exprs, id, ConditionKind::Invariant)? {
        return Some(Some((NodeState::Failing, NodeOutcome::Failure, FailureType::InvariantConditionFailed)));
    }
    Some(None)
}

fn executing_destination(nodes: &NodeArena, exprs: &ExprArena<NodeId>, id: NodeId) -> Destination {
    match ancestor_verdict(nodes, exprs, id) {
        AncestorVerdict::ForceFinished(o, f) => return Some((NodeState::Failing, o, f)),
        AncestorVerdict::Defer => return None,
        AncestorVerdict::Clear => {}
    }
    if let Some(tripped) = own_exit_or_invariant_trip(nodes, exprs, id)? {
        return Some(tripped);
    }
    let end = eval_cond(nodes, exprs, id, ConditionKind::End)?;
    if !end {
        return None;
    }
    let node = nodes.get(id);
    if node.body.has_children() {
        if !eval_cond(nodes, exprs, id, ConditionKind::ActionComplete)? {
            return Some((NodeState::Finishing, NodeOutcome::None, FailureType::None));
        }
    }
    match eval_cond(nodes, exprs, id, ConditionKind::Post)? {
        true => Some((NodeState::IterationEnded, NodeOutcome::Success, FailureType::None)),
        false => Some((NodeState::IterationEnded, NodeOutcome::Failure, FailureType::PostConditionFailed)),
    }
}

fn finishing_destination(nodes: &NodeArena, exprs: &ExprArena<NodeId>, id: NodeId) -> Destination {
    match ancestor_verdict(nodes, exprs, id) {
        AncestorVerdict::ForceFinished(o, f) => return Some((NodeState::Failing, o, f)),
        AncestorVerdict::Defer => return None,
        AncestorVerdict::Clear => {}
    }
    if let Some(tripped) = own_exit_or_invariant_trip(nodes, exprs, id)? {
        return Some(tripped);
    }
    if !eval_cond(nodes, exprs, id, ConditionKind::ActionComplete)? {
        return None;
    }
    match eval_cond(nodes, exprs, id, ConditionKind::Post)? {
        true => Some((NodeState::IterationEnded, NodeOutcome::Success, FailureType::None)),
        false => Some((NodeState::IterationEnded, NodeOutcome::Failure, FailureType::PostConditionFailed)),
    }
}

fn failing_destination(nodes: &NodeArena, exprs: &ExprArena<NodeId>, id: NodeId, node: &crate::node::Node) -> Destination {
    // Failing's destination depends only on AbortComplete plus the outcome
    // already committed by whatever transition entered Failing -- not on
    // Exit/Invariant again, since those already fired to get here.
    if !eval_cond(nodes, exprs, id, ConditionKind::AbortComplete)? {
        return None;
    }
    match node.failure_type {
        FailureType::ParentFailed | FailureType::ParentExited => Some((NodeState::Finished, node.outcome, node.failure_type)),
        _ => Some((NodeState::IterationEnded, node.outcome, node.failure_type)),
    }
}

fn iteration_ended_destination(nodes: &NodeArena, exprs: &ExprArena<NodeId>, id: NodeId, node: &crate::node::Node) -> Destination {
    match ancestor_verdict(nodes, exprs, id) {
        AncestorVerdict::ForceFinished(o, f) => return Some((NodeState::Finished, o, f)),
        AncestorVerdict::Defer => return None,
        AncestorVerdict::Clear => {}
    }
    match eval_cond(nodes, exprs, id, ConditionKind::Repeat)? {
        true => Some((NodeState::Waiting, NodeOutcome::None, FailureType::None)),
        false => Some((NodeState::Finished, node.outcome, node.failure_type)),
    }
}

/// Which condition kinds are active while a node sits in a given state,
/// per spec.md §4.6's worked example ("Executing activates End/Exit/
/// Invariant/Post; Finishing additionally activates ActionComplete;
/// leaving Executing deactivates Start/Skip/Pre").
pub fn active_conditions(state: NodeState, has_children: bool) -> &'static [ConditionKind] {
    use ConditionKind::*;
    match state {
        NodeState::Inactive => &[],
        NodeState::Waiting => &[AncestorExit, AncestorInvariant, AncestorEnd, Skip, Start, Exit, Invariant, Pre],
        NodeState::Executing => {
            if has_children {
                &[AncestorExit, AncestorInvariant, Exit, Invariant, End, Post, ActionComplete]
            } else {
                &[AncestorExit, AncestorInvariant, Exit, Invariant, End, Post]
            }
        }
        NodeState::Finishing => &[AncestorExit, AncestorInvariant, Exit, Invariant, ActionComplete, Post],
        NodeState::Failing => &[AbortComplete],
        NodeState::IterationEnded => &[AncestorExit, AncestorInvariant, AncestorEnd, Repeat],
        NodeState::Finished => &[],
    }
}

/// Apply the five-step commit protocol (spec.md §4.3 "Transition
/// execution"): deactivate retiring conditions, run exit side effects,
/// update state + timestamp, activate entering conditions, run entry side
/// effects. Returns the set of sibling/child node ids the caller
/// (`plexil-exec`) should additionally mark as candidates as a result of
/// this transition's entry side effects (e.g. a List node's children on
/// entering `Executing`).
pub fn commit_transition(
    nodes: &mut NodeArena,
    exprs: &mut ExprArena<NodeId>,
    id: NodeId,
    dest: NodeState,
    outcome: NodeOutcome,
    failure: FailureType,
    cycle_time: f64,
) -> Vec<NodeId> {
    let (old_state, has_children) = {
        let node = nodes.get(id);
        (node.state, node.body.has_children())
    };
    debug_assert_ne!(old_state, dest, "commit_transition called with a self-loop");

    // (1) deactivate conditions no longer needed. Each condition's root
    // expression carries this node as an external listener (registered in
    // step 4 the transition that activated it) so that a later change deep
    // in its operand tree -- a lookup answer, a variable write -- reaches
    // `ExprArena::notify` and re-queues this node; that listener comes off
    // here, symmetric with the activation below.
    for kind in active_conditions(old_state, has_children) {
        if let Some(expr) = nodes.get(id).condition(*kind) {
            exprs.remove_listener(expr, Listener::External(id));
            exprs.deactivate(expr);
        }
    }

    // (2) exit side effects. Finished-child cleanup is deferred to the
    // exec's post-step sweep (spec.md §4.4 step 5) rather than performed
    // synchronously here, since freeing arena slots mid-transition would
    // invalidate other nodes' `NodeId`s still queued this cycle.
    let mut newly_candidate = Vec::new();

    // (3) update state + timestamp.
    {
        let node = nodes.get_mut(id);
        node.state = dest;
        node.outcome = outcome;
        node.failure_type = failure;
        node.record_state_entry(cycle_time);
    }

    // (4) activate conditions needed in the new state.
    for kind in active_conditions(dest, has_children) {
        if let Some(expr) = nodes.get(id).condition(*kind) {
            exprs.activate(expr);
            exprs.add_listener(expr, Listener::External(id));
        }
    }

    // (5) entry side effects.
    match dest {
        NodeState::Waiting | NodeState::Executing => {
            if has_children {
                newly_candidate.extend_from_slice(nodes.children(id));
            }
        }
        _ => {}
    }

    newly_candidate
}
