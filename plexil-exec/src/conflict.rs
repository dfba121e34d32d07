//! Per-variable assignment conflict sets (spec.md §3 "Conflict set", §4.5).
//! Arena-indexed rather than the original's allocate/release pool
//! (SPEC_FULL.md §2, grounded on `VariableConflictSet.hh`): a conflict set
//! is just a `Vec` kept weakly sorted by priority, stable within a
//! priority tier by insertion order.

use fxhash::FxHashMap;
use plexil_expr::ExprId;
use plexil_node::NodeId;

struct Entry {
    priority: i64,
    node: NodeId,
}

/// The contenders for one assignable variable this cycle (spec.md
/// Glossary "Conflict set").
#[derive(Default)]
pub struct ConflictSet {
    entries: Vec<Entry>,
}

impl ConflictSet {
    /// Insert `node` at `priority`, behind any existing entries at the
    /// same priority (spec.md §3: "stable within priority by insertion
    /// order"). Re-registering a node already present replaces its entry
    /// rather than duplicating it -- a node re-evaluated across several
    /// macro-steps while it waits out a conflict registers again every
    /// pass.
    pub fn push(&mut self, node: NodeId, priority: i64) {
        self.entries.retain(|e| e.node != node);
        let insert_at = self.entries.partition_point(|e| e.priority <= priority);
        self.entries.insert(insert_at, Entry { priority, node });
    }

    /// The lowest-priority (highest-precedence) contender, if any.
    pub fn front(&self) -> Option<NodeId> {
        self.entries.first().map(|e| e.node)
    }

    /// How many entries are tied with the front priority (spec.md §4.5:
    /// ties at the front priority level are resolved by insertion order,
    /// but the tie itself is diagnostic-worthy).
    pub fn front_count(&self) -> usize {
        match self.entries.first() {
            None => 0,
            Some(front) => self.entries.iter().take_while(|e| e.priority == front.priority).count(),
        }
    }

    pub fn remove(&mut self, node: NodeId) {
        self.entries.retain(|e| e.node != node);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every contender except the front, in stable order -- re-queued as
    /// candidates for the next cycle (spec.md §4.5).
    pub fn losers(&self) -> Vec<NodeId> {
        self.entries.iter().skip(1).map(|e| e.node).collect()
    }
}

/// One `ConflictSet` per assignable destination, keyed by the destination
/// variable's `ExprId`.
#[derive(Default)]
pub struct ConflictRegistry {
    sets: FxHashMap<ExprId, ConflictSet>,
}

impl ConflictRegistry {
    pub fn new() -> Self {
        ConflictRegistry::default()
    }

    pub fn register(&mut self, variable: ExprId, node: NodeId, priority: i64) {
        self.sets.entry(variable).or_default().push(node, priority);
    }

    pub fn get(&self, variable: ExprId) -> Option<&ConflictSet> {
        self.sets.get(&variable)
    }

    pub fn get_mut(&mut self, variable: ExprId) -> Option<&mut ConflictSet> {
        self.sets.get_mut(&variable)
    }

    pub fn remove(&mut self, variable: ExprId, node: NodeId) {
        if let Some(set) = self.sets.get_mut(&variable) {
            set.remove(node);
        }
    }

    pub fn contested_variables(&self) -> impl Iterator<Item = ExprId> + '_ {
        self.sets.iter().filter(|(_, s)| s.len() > 1).map(|(v, _)| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexil_node::{NodeArena, NodeBody};

    #[test]
    fn lowest_priority_wins_front_and_ties_are_insertion_stable() {
        let mut arena = NodeArena::new();
        let a = arena.alloc("a", None, NodeBody::Empty);
        let b = arena.alloc("b", None, NodeBody::Empty);
        let c = arena.alloc("c", None, NodeBody::Empty);

        let mut set = ConflictSet::default();
        set.push(a, 2);
        set.push(b, 1);
        set.push(c, 1);
        assert_eq!(set.front(), Some(b));
        assert_eq!(set.front_count(), 2);
        assert_eq!(set.losers(), vec![c, a]);
    }
}
