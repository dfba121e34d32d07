//! The listener hub (spec.md §4.9): fans out one transition-record batch
//! and one assignment-record batch per macro-step, exactly once, at
//! `stepComplete`.

use plexil_expr::ExprId;
use plexil_node::NodeId;
use plexil_value::{FailureType, NodeOutcome, NodeState, Value};

#[derive(Debug, Clone)]
pub struct TransitionRecord {
    pub node: NodeId,
    pub old_state: NodeState,
    pub new_state: NodeState,
    pub outcome: NodeOutcome,
    pub failure: FailureType,
}

#[derive(Debug, Clone)]
pub struct AssignmentRecord {
    pub node: NodeId,
    pub variable: ExprId,
    pub value: Value,
}

pub trait PlanListener {
    /// Invoked exactly once per macro-step, from `ListenerHub::step_complete`
    /// (spec.md §8: "`stepComplete` observers are invoked exactly once per
    /// macro-step"). Must not block nor recurse into the exec (spec.md §5).
    fn step_complete(&mut self, transitions: &[TransitionRecord], assignments: &[AssignmentRecord]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

#[derive(Default)]
pub struct ListenerHub {
    listeners: Vec<(ListenerId, Box<dyn PlanListener>)>,
    pending_adds: Vec<(ListenerId, Box<dyn PlanListener>)>,
    pending_removes: Vec<ListenerId>,
    next_id: u32,
    transitions: Vec<TransitionRecord>,
    assignments: Vec<AssignmentRecord>,
}

impl ListenerHub {
    pub fn new() -> Self {
        ListenerHub::default()
    }

    /// Register a listener. Deferred until after the next `step_complete`
    /// finishes if called mid-cycle (spec.md §4.9 "Add/remove-listener
    /// during a cycle is deferred until `stepComplete` completes").
    pub fn add_listener(&mut self, listener: Box<dyn PlanListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.pending_adds.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) {
        self.pending_removes.push(id);
    }

    pub fn record_transition(&mut self, record: TransitionRecord) {
        self.transitions.push(record);
    }

    pub fn record_assignment(&mut self, record: AssignmentRecord) {
        self.assignments.push(record);
    }

    pub fn pending_transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Fan out the accumulated batches to every currently-registered
    /// listener exactly once, clear them, then apply any add/remove
    /// requests queued during the cycle just finished.
    pub fn step_complete(&mut self) {
        for (_, listener) in &mut self.listeners {
            listener.step_complete(&self.transitions, &self.assignments);
        }
        self.transitions.clear();
        self.assignments.clear();

        self.listeners.append(&mut self.pending_adds);
        if !self.pending_removes.is_empty() {
            let removed: std::collections::HashSet<ListenerId> = self.pending_removes.drain(..).collect();
            self.listeners.retain(|(id, _)| !removed.contains(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Counting(Arc<Mutex<usize>>);
    impl PlanListener for Counting {
        fn step_complete(&mut self, transitions: &[TransitionRecord], _assignments: &[AssignmentRecord]) {
            *self.0.lock().unwrap() += transitions.len();
        }
    }

    #[test]
    fn fans_out_exactly_once_and_clears_batches() {
        let calls = Arc::new(Mutex::new(0));
        let mut hub = ListenerHub::new();
        hub.add_listener(Box::new(Counting(calls.clone())));
        hub.step_complete(); // apply the deferred add

        hub.record_transition(TransitionRecord {
            node: plexil_node::NodeArena::new().alloc("x", None, plexil_node::NodeBody::Empty),
            old_state: NodeState::Waiting,
            new_state: NodeState::Executing,
            outcome: NodeOutcome::None,
            failure: FailureType::None,
        });
        hub.step_complete();
        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(hub.pending_transition_count(), 0);
    }
}
