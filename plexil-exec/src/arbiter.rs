//! The command resource arbiter (spec.md §4.7), including the hierarchy
//! text format SPEC_FULL.md §2 supplements from `ResourceArbiterInterface.cc`:
//! `name max_consumable [child1_weight child1_name ...]` per line.

use arcstr::ArcStr;
use fxhash::FxHashMap;
use plexil_node::{NodeId, ResourceValue};

struct ResourceNode {
    max_consumable: f64,
    children: Vec<(f64, ArcStr)>,
}

#[derive(thiserror::Error, Debug)]
pub enum HierarchyParseError {
    #[error("line {line}: expected at least a resource name and capacity")]
    TooFewFields { line: usize },
    #[error("line {line}: capacity {value:?} is not a number")]
    BadCapacity { line: usize, value: String },
    #[error("line {line}: child weight {value:?} is not a number")]
    BadWeight { line: usize, value: String },
    #[error("line {line}: a child weight is missing its resource name")]
    DanglingWeight { line: usize },
}

#[derive(Default)]
pub struct ResourceArbiter {
    hierarchy: FxHashMap<ArcStr, ResourceNode>,
    /// Aggregate demand currently locked by accepted, still-running
    /// commands (spec.md §4.7 step 2/4).
    committed: FxHashMap<ArcStr, f64>,
    locked_by_command: FxHashMap<NodeId, Vec<(ArcStr, f64)>>,
}

impl ResourceArbiter {
    pub fn new() -> Self {
        ResourceArbiter::default()
    }

    pub fn load_hierarchy_text(text: &str) -> Result<Self, HierarchyParseError> {
        let mut hierarchy = FxHashMap::default();
        for (i, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 2 {
                return Err(HierarchyParseError::TooFewFields { line: i + 1 });
            }
            let name: ArcStr = fields[0].into();
            let max_consumable: f64 = fields[1]
                .parse()
                .map_err(|_| HierarchyParseError::BadCapacity { line: i + 1, value: fields[1].to_string() })?;
            let mut children = Vec::new();
            let rest = &fields[2..];
            let mut j = 0;
            while j < rest.len() {
                let weight: f64 = rest[j]
                    .parse()
                    .map_err(|_| HierarchyParseError::BadWeight { line: i + 1, value: rest[j].to_string() })?;
                let child_name = rest.get(j + 1).ok_or(HierarchyParseError::DanglingWeight { line: i + 1 })?;
                children.push((weight, ArcStr::from(*child_name)));
                j += 2;
            }
            hierarchy.insert(name, ResourceNode { max_consumable, children });
        }
        Ok(ResourceArbiter { hierarchy, committed: FxHashMap::default(), locked_by_command: FxHashMap::default() })
    }

    fn capacity(&self, name: &str) -> f64 {
        self.hierarchy.get(name).map(|n| n.max_consumable).unwrap_or(1.0)
    }

    /// Expand `amount` of resource `name` across the hierarchy: `name`
    /// itself is charged `amount`, and each declared child is charged
    /// `amount * edge_weight`, recursively (spec.md §4.7: "a parent
    /// resource transitively consumes capacity of its children with
    /// per-edge weight").
    fn expand(&self, name: &ArcStr, amount: f64, out: &mut Vec<(ArcStr, f64)>) {
        out.push((name.clone(), amount));
        if let Some(node) = self.hierarchy.get(name) {
            for (weight, child) in &node.children {
                self.expand(child, amount * weight, out);
            }
        }
    }

    /// Partition `commands` (already priority-fixed) into accepted and
    /// rejected, per the four-step algorithm of spec.md §4.7. `commands`
    /// is `(node, resources, priority)`; lower numeric priority wins ties
    /// on order of consideration only -- every command is still evaluated
    /// independently against the running committed total.
    pub fn arbitrate(&mut self, mut commands: Vec<(NodeId, Vec<ResourceValue>, i64)>) -> (Vec<NodeId>, Vec<NodeId>) {
        commands.sort_by_key(|(_, _, priority)| *priority);
        let mut local_committed = self.committed.clone();
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for (node, resources, _priority) in commands {
            let mut demand: Vec<(ArcStr, f64)> = Vec::new();
            for r in &resources {
                let signed = if r.upper_bound != 0.0 { r.upper_bound } else { r.lower_bound };
                self.expand(&r.name, signed, &mut demand);
            }
            let mut per_resource: FxHashMap<ArcStr, f64> = FxHashMap::default();
            for (name, amount) in &demand {
                *per_resource.entry(name.clone()).or_insert(0.0) += amount;
            }

            let within_bounds = per_resource.iter().all(|(name, amount)| {
                let cap = self.capacity(name);
                let projected = local_committed.get(name).copied().unwrap_or(0.0) + amount;
                projected <= cap && projected >= -cap
            });

            if within_bounds {
                for (name, amount) in &per_resource {
                    *local_committed.entry(name.clone()).or_insert(0.0) += amount;
                }
                self.locked_by_command.insert(node, per_resource.into_iter().collect());
                accepted.push(node);
            } else {
                rejected.push(node);
            }
        }

        self.committed = local_committed;
        (accepted, rejected)
    }

    /// Release a previously accepted command's locked demand (spec.md
    /// §4.7 step 4: "remain so until `releaseResourcesForCommand` is
    /// called at command termination").
    pub fn release_resources_for_command(&mut self, node: NodeId) {
        if let Some(locked) = self.locked_by_command.remove(&node) {
            for (name, amount) in locked {
                if let Some(level) = self.committed.get_mut(&name) {
                    *level -= amount;
                }
            }
        }
    }
}
