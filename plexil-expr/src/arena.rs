//! The expression graph: a per-plan arena of lazily-evaluated nodes
//! addressed by stable indices (`ExprId`) instead of the original
//! PLEXIL's cyclic listener-pointer ownership graph (SPEC_FULL.md DESIGN
//! NOTES). No node ever caches a computed value across a `value()` call --
//! every read walks the graph fresh, which is a correctness contract
//! (spec.md §4.1: expressions are pure functions of their operands' current
//! values, re-evaluated on every read) rather than a missed optimization.

use crate::operator::{self, Operator};
use crate::state_cache::StateCache;
use arcstr::ArcStr;
use fxhash::{FxHashMap, FxHashSet};
use plexil_value::{NodeState, State, Value};
use smallvec::SmallVec;
use std::fmt::Debug;
use std::hash::Hash;

/// Which child-state predicate a `Aggregate` expression counts against
/// (spec.md §4.3: List/LibraryCall nodes synthesize `AllChildrenFinished`
/// and `AllChildrenWaitingOrFinished` from their children's state
/// variables).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    AllFinished,
    AllWaitingOrFinished,
}

impl AggregateKind {
    fn satisfied_by(self, state: NodeState) -> bool {
        match self {
            AggregateKind::AllFinished => state == NodeState::Finished,
            AggregateKind::AllWaitingOrFinished => matches!(state, NodeState::Waiting | NodeState::Finished),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn from_raw(n: u32) -> Self {
        ExprId(n)
    }
}

/// Who to notify when an expression's value changes: another expression in
/// the same arena (`Internal`), or a caller-defined id living outside the
/// expression graph entirely -- in `plexil-node` this is a `NodeId` marking
/// a node as an exec candidate (SPEC_FULL.md DESIGN NOTES: `plexil-expr`
/// never references `NodeId` directly, so the arena is generic over `L`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener<L> {
    Internal(ExprId),
    External(L),
}

#[derive(Debug, Clone)]
enum ExprKind {
    Constant(Value),
    Variable,
    ArrayRef { array: ExprId, index: ExprId },
    Lookup { name: ArcStr, params: SmallVec<[ExprId; 2]>, on_change: bool },
    Op { op: Operator, args: SmallVec<[ExprId; 4]> },
    /// A node's `AllChildrenFinished`/`AllChildrenWaitingOrFinished`
    /// condition, over its children's `NodeState` observer variables.
    /// Evaluated fresh on every read like every other node here, rather
    /// than through the running counter spec.md describes -- this arena's
    /// whole evaluation model is memoless by design (see module doc), and
    /// a handful of children per aggregate makes a full rescan free.
    Aggregate { kind: AggregateKind, children: SmallVec<[ExprId; 4]> },
}

struct ExprNode<L: Eq + Hash> {
    kind: ExprKind,
    value: Value,
    saved: Option<Value>,
    activation_count: u32,
    listeners: FxHashMap<Listener<L>, usize>,
    /// The `State` this node last subscribed under, set only while a
    /// `Lookup` node is active. Kept so deactivation can unsubscribe the
    /// same key even if `params` are themselves variable.
    lookup_state: Option<State>,
}

impl<L: Eq + Hash> ExprNode<L> {
    fn new(kind: ExprKind, value: Value) -> Self {
        ExprNode { kind, value, saved: None, activation_count: 0, listeners: FxHashMap::default(), lookup_state: None }
    }
}

pub struct ExprArena<L: Copy + Eq + Hash + Debug> {
    nodes: Vec<ExprNode<L>>,
    pub state_cache: StateCache,
}

impl<L: Copy + Eq + Hash + Debug> Default for ExprArena<L> {
    fn default() -> Self {
        ExprArena { nodes: Vec::new(), state_cache: StateCache::default() }
    }
}

impl<L: Copy + Eq + Hash + Debug> ExprArena<L> {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: ExprKind, value: Value) -> ExprId {
        self.nodes.push(ExprNode::new(kind, value));
        ExprId((self.nodes.len() - 1) as u32)
    }

    pub fn alloc_constant(&mut self, value: Value) -> ExprId {
        self.push(ExprKind::Constant(value), Value::Unknown)
    }

    pub fn alloc_variable(&mut self, initial: Value) -> ExprId {
        self.push(ExprKind::Variable, initial)
    }

    pub fn alloc_array_ref(&mut self, array: ExprId, index: ExprId) -> ExprId {
        self.push(ExprKind::ArrayRef { array, index }, Value::Unknown)
    }

    pub fn alloc_lookup(&mut self, name: impl Into<ArcStr>, params: &[ExprId], on_change: bool) -> ExprId {
        self.push(
            ExprKind::Lookup { name: name.into(), params: params.iter().copied().collect(), on_change },
            Value::Unknown,
        )
    }

    pub fn alloc_op(&mut self, op: Operator, args: &[ExprId]) -> ExprId {
        if let Some(n) = op.fixed_arity() {
            debug_assert_eq!(args.len(), n, "operator {op:?} requires {n} argument(s)");
        }
        self.push(ExprKind::Op { op, args: args.iter().copied().collect() }, Value::Unknown)
    }

    /// A node's aggregate child-state condition (spec.md §4.3). `children`
    /// are the children's `NodeState`-valued observer variables, not the
    /// children themselves -- this arena never references a `NodeId`
    /// directly (module doc).
    pub fn alloc_aggregate(&mut self, kind: AggregateKind, children: &[ExprId]) -> ExprId {
        self.push(ExprKind::Aggregate { kind, children: children.iter().copied().collect() }, Value::Unknown)
    }

    /// Evaluate `id`'s current value. Always recomputes from operands; see
    /// the module-level note on memoization.
    pub fn value(&self, id: ExprId) -> Value {
        let node = &self.nodes[id.index()];
        match &node.kind {
            ExprKind::Constant(v) => v.clone(),
            ExprKind::Variable => node.value.clone(),
            ExprKind::ArrayRef { array, index } => self.eval_array_ref(*array, *index),
            ExprKind::Lookup { name, params, .. } => self.eval_lookup(name, params),
            ExprKind::Op { op, args } => {
                let vals: SmallVec<[Value; 4]> = args.iter().map(|a| self.value(*a)).collect();
                operator::eval(*op, &vals)
            }
            ExprKind::Aggregate { kind, children } => self.eval_aggregate(*kind, children),
        }
    }

    /// Vacuously true for a childless aggregate, matching `ActionComplete`'s
    /// own `true`-when-absent default (spec.md §3 condition defaults).
    fn eval_aggregate(&self, kind: AggregateKind, children: &[ExprId]) -> Value {
        for child in children {
            let satisfied = matches!(self.value(*child), Value::NodeState(s) if kind.satisfied_by(s));
            if !satisfied {
                return Value::Bool(false);
            }
        }
        Value::Bool(true)
    }

    pub fn is_known(&self, id: ExprId) -> bool {
        self.value(id).is_known()
    }

    fn eval_array_ref(&self, array: ExprId, index: ExprId) -> Value {
        let idx = match self.value(index) {
            Value::Int(i) if i >= 0 => i as usize,
            _ => return Value::Unknown,
        };
        match self.value(array) {
            Value::BoolArray(a) => a.get(idx).map(|b| Value::Bool(*b)).unwrap_or(Value::Unknown),
            Value::IntArray(a) => a.get(idx).map(|i| Value::Int(*i)).unwrap_or(Value::Unknown),
            Value::RealArray(a) => a.get(idx).map(|r| Value::Real(*r)).unwrap_or(Value::Unknown),
            Value::StringArray(a) => a.get(idx).map(|s| Value::String(s.clone())).unwrap_or(Value::Unknown),
            _ => Value::Unknown,
        }
    }

    fn eval_lookup(&self, name: &ArcStr, params: &[ExprId]) -> Value {
        let param_vals: Vec<Value> = params.iter().map(|p| self.value(*p)).collect();
        let state = State::new(name.clone(), param_vals);
        self.state_cache.current_value(&state)
    }

    // -- activation ---------------------------------------------------

    fn operand_ids(&self, id: ExprId) -> SmallVec<[ExprId; 4]> {
        match &self.nodes[id.index()].kind {
            ExprKind::Constant(_) | ExprKind::Variable => SmallVec::new(),
            ExprKind::ArrayRef { array, index } => SmallVec::from_slice(&[*array, *index]),
            ExprKind::Lookup { params, .. } => params.iter().copied().collect(),
            ExprKind::Op { args, .. } => args.iter().copied().collect(),
            ExprKind::Aggregate { children, .. } => children.clone(),
        }
    }

    /// Mark `id` as having one more activator. On the 0->1 transition,
    /// recursively activates operands and (for `Lookup`) subscribes in the
    /// state cache (spec.md §4.1: "activation is refcounted ... live on
    /// first 0->1 transition").
    pub fn activate(&mut self, id: ExprId) {
        let became_active = {
            let node = &mut self.nodes[id.index()];
            node.activation_count += 1;
            node.activation_count == 1
        };
        if !became_active {
            return;
        }
        for child in self.operand_ids(id) {
            self.add_listener(child, Listener::Internal(id));
            self.activate(child);
        }
        if matches!(self.nodes[id.index()].kind, ExprKind::Lookup { .. }) {
            self.activate_lookup(id);
        }
    }

    /// Remove one activator from `id`. On the last 1->0 transition,
    /// recursively deactivates operands and unsubscribes lookups.
    pub fn deactivate(&mut self, id: ExprId) {
        let became_dormant = {
            let node = &mut self.nodes[id.index()];
            debug_assert!(node.activation_count > 0, "deactivate on an already-dormant expression");
            node.activation_count -= 1;
            node.activation_count == 0
        };
        if !became_dormant {
            return;
        }
        if matches!(self.nodes[id.index()].kind, ExprKind::Lookup { .. }) {
            self.deactivate_lookup(id);
        }
        for child in self.operand_ids(id) {
            self.remove_listener(child, Listener::Internal(id));
            self.deactivate(child);
        }
    }

    pub fn is_active(&self, id: ExprId) -> bool {
        self.nodes[id.index()].activation_count > 0
    }

    fn activate_lookup(&mut self, id: ExprId) {
        let (name, params) = match &self.nodes[id.index()].kind {
            ExprKind::Lookup { name, params, .. } => (name.clone(), params.clone()),
            _ => unreachable!(),
        };
        let param_vals: Vec<Value> = params.iter().map(|p| self.value(*p)).collect();
        let state = State::new(name, param_vals);
        self.state_cache.subscribe(state.clone(), id);
        self.nodes[id.index()].lookup_state = Some(state);
    }

    fn deactivate_lookup(&mut self, id: ExprId) {
        if let Some(state) = self.nodes[id.index()].lookup_state.take() {
            self.state_cache.unsubscribe(&state, id);
        }
    }

    // -- listeners ------------------------------------------------------

    pub fn add_listener(&mut self, id: ExprId, listener: Listener<L>) {
        *self.nodes[id.index()].listeners.entry(listener).or_insert(0) += 1;
    }

    pub fn remove_listener(&mut self, id: ExprId, listener: Listener<L>) {
        let node = &mut self.nodes[id.index()];
        if let Some(count) = node.listeners.get_mut(&listener) {
            *count -= 1;
            if *count == 0 {
                node.listeners.remove(&listener);
            }
        }
    }

    /// Walk the listener graph rooted at `id`, collecting every distinct
    /// external listener reachable through chains of `Internal` forwarding
    /// (spec.md §4.1: a change fans out to every expression whose value
    /// transitively depends on it). Does not itself recompute anything --
    /// callers re-read `value()` lazily once notified.
    pub fn notify(&self, id: ExprId) -> SmallVec<[L; 8]> {
        let mut out = SmallVec::new();
        let mut seen_external: FxHashSet<L> = FxHashSet::default();
        let mut seen_internal: FxHashSet<ExprId> = FxHashSet::default();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            for listener in self.nodes[cur.index()].listeners.keys() {
                match listener {
                    Listener::External(l) => {
                        if seen_external.insert(*l) {
                            out.push(*l);
                        }
                    }
                    Listener::Internal(next) => {
                        if seen_internal.insert(*next) {
                            stack.push(*next);
                        }
                    }
                }
            }
        }
        out
    }

    // -- variables --------------------------------------------------

    pub fn set_variable(&mut self, id: ExprId, value: Value) -> SmallVec<[L; 8]> {
        debug_assert!(matches!(self.nodes[id.index()].kind, ExprKind::Variable), "set_variable on a non-Variable expression");
        self.nodes[id.index()].value = value;
        self.notify(id)
    }

    pub fn variable_value(&self, id: ExprId) -> Value {
        self.value(id)
    }

    /// Stash the variable's current value (spec.md §4.1 node-entry save/
    /// restore law: a node's local variables are saved on entry to
    /// `Executing` and restored if the iteration is retried/reset).
    pub fn save_current_value(&mut self, id: ExprId) {
        let node = &mut self.nodes[id.index()];
        debug_assert!(matches!(node.kind, ExprKind::Variable));
        node.saved = Some(node.value.clone());
    }

    /// Restore the most recently saved value, if any. Returns `false` if
    /// nothing was saved (caller's invariant to check, not a hard error).
    pub fn restore_saved_value(&mut self, id: ExprId) -> bool {
        let node = &mut self.nodes[id.index()];
        debug_assert!(matches!(node.kind, ExprKind::Variable));
        match node.saved.take() {
            Some(v) => {
                node.value = v;
                true
            }
            None => false,
        }
    }

    // -- mutable array element access --------------------------------

    /// Write element `index` of the array held by `Variable` `id`. Returns
    /// `Err` when `index` is out of range, per spec.md §8: "an out-of-range
    /// *write* is a contract violation", distinct from the Unknown-on-read
    /// rule for out-of-range reads.
    pub fn set_array_element(&mut self, id: ExprId, index: usize, element: Value) -> Result<(), ()> {
        let node = &mut self.nodes[id.index()];
        debug_assert!(matches!(node.kind, ExprKind::Variable));
        let ok = match (&mut node.value, element) {
            (Value::BoolArray(a), Value::Bool(b)) => a.set(index, b),
            (Value::IntArray(a), Value::Int(i)) => a.set(index, i),
            (Value::RealArray(a), Value::Real(r)) => a.set(index, r),
            (Value::RealArray(a), Value::Int(i)) => a.set(index, i as f64),
            (Value::StringArray(a), Value::String(s)) => a.set(index, s),
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct NodeTag(u32);

    #[test]
    fn constant_and_op_compose() {
        let mut arena: ExprArena<NodeTag> = ExprArena::new();
        let a = arena.alloc_constant(Value::Int(2));
        let b = arena.alloc_constant(Value::Int(3));
        let sum = arena.alloc_op(Operator::Add, &[a, b]);
        assert_eq!(arena.value(sum), Value::Int(5));
    }

    #[test]
    fn variable_save_and_restore_round_trips() {
        let mut arena: ExprArena<NodeTag> = ExprArena::new();
        let v = arena.alloc_variable(Value::Int(1));
        arena.save_current_value(v);
        arena.set_variable(v, Value::Int(99));
        assert_eq!(arena.value(v), Value::Int(99));
        assert!(arena.restore_saved_value(v));
        assert_eq!(arena.value(v), Value::Int(1));
    }

    #[test]
    fn activation_is_refcounted_and_propagates_to_operands() {
        let mut arena: ExprArena<NodeTag> = ExprArena::new();
        let v = arena.alloc_variable(Value::Bool(true));
        let not_v = arena.alloc_op(Operator::Not, &[v]);
        arena.activate(not_v);
        arena.activate(not_v);
        assert!(arena.is_active(v));
        arena.deactivate(not_v);
        assert!(arena.is_active(v), "still referenced by the second activator");
        arena.deactivate(not_v);
        assert!(!arena.is_active(v));
    }

    #[test]
    fn set_variable_notifies_external_listener_through_op_chain() {
        let mut arena: ExprArena<NodeTag> = ExprArena::new();
        let v = arena.alloc_variable(Value::Bool(false));
        let not_v = arena.alloc_op(Operator::Not, &[v]);
        arena.activate(not_v);
        arena.add_listener(not_v, Listener::External(NodeTag(7)));
        let woken = arena.set_variable(v, Value::Bool(true));
        assert_eq!(&woken[..], &[NodeTag(7)]);
    }

    #[test]
    fn aggregate_tracks_children_and_wakes_its_listener_on_each_edge() {
        let mut arena: ExprArena<NodeTag> = ExprArena::new();
        let a = arena.alloc_variable(Value::NodeState(NodeState::Inactive));
        let b = arena.alloc_variable(Value::NodeState(NodeState::Inactive));
        let all_finished = arena.alloc_aggregate(AggregateKind::AllFinished, &[a, b]);

        arena.activate(all_finished);
        arena.add_listener(all_finished, Listener::External(NodeTag(1)));
        assert_eq!(arena.value(all_finished), Value::Bool(false));

        let woken = arena.set_variable(a, Value::NodeState(NodeState::Finished));
        assert_eq!(&woken[..], &[NodeTag(1)], "b is still Inactive, but the aggregate must recheck");
        assert_eq!(arena.value(all_finished), Value::Bool(false));

        let woken = arena.set_variable(b, Value::NodeState(NodeState::Finished));
        assert_eq!(&woken[..], &[NodeTag(1)]);
        assert_eq!(arena.value(all_finished), Value::Bool(true));
    }

    #[test]
    fn aggregate_over_no_children_is_vacuously_true() {
        let mut arena: ExprArena<NodeTag> = ExprArena::new();
        let all_finished = arena.alloc_aggregate(AggregateKind::AllFinished, &[]);
        assert_eq!(arena.value(all_finished), Value::Bool(true));
    }

    #[test]
    fn array_read_out_of_range_is_unknown_but_write_errors() {
        let mut arena: ExprArena<NodeTag> = ExprArena::new();
        let arr = arena.alloc_variable(Value::IntArray(plexil_value::ValueArray::from_known(vec![1, 2, 3])));
        let idx = arena.alloc_constant(Value::Int(10));
        let read = arena.alloc_array_ref(arr, idx);
        assert_eq!(arena.value(read), Value::Unknown);
        assert!(arena.set_array_element(arr, 10, Value::Int(5)).is_err());
        assert!(arena.set_array_element(arr, 0, Value::Int(5)).is_ok());
    }
}
