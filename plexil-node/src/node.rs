//! The `Node`: state machine, owned conditions, owned variables, and body
//! (spec.md §3 "Node"). `Node` itself never touches the expression arena
//! directly in its constructors -- callers build conditions/variables in a
//! shared `plexil_expr::ExprArena<NodeId>` first and hand back the `ExprId`s,
//! keeping this crate ignorant of arena internals (SPEC_FULL.md DESIGN
//! NOTES' explicit-context redesign applied one layer down).

use arcstr::ArcStr;
use plexil_expr::{AggregateKind, ExprArena, ExprId};
use plexil_value::{FailureType, NodeOutcome, NodeState, Value};

use crate::arena::NodeArena;

use crate::assignment::Assignment;
use crate::command::Command;
use crate::update::Update;

/// An index into a plan's `NodeArena`, also the listener-id type plugged
/// into `plexil_expr::ExprArena<NodeId>` (SPEC_FULL.md: "plexil-node
/// instantiates ExprArena<NodeId>").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_raw(n: u32) -> Self {
        NodeId(n)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Condition-kind index into a node's fixed condition table (spec.md §3
/// "Condition kinds"). Order here fixes the evaluation order in
/// `transition::destination_state` is independent of this enum's
/// declaration order -- it is driven explicitly, not by iterating variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    AncestorExit,
    AncestorInvariant,
    AncestorEnd,
    Skip,
    Start,
    Pre,
    Exit,
    Invariant,
    End,
    Post,
    Repeat,
    ActionComplete,
    AbortComplete,
}

impl ConditionKind {
    pub const COUNT: usize = 13;

    pub fn index(self) -> usize {
        use ConditionKind::*;
        match self {
            AncestorExit => 0,
            AncestorInvariant => 1,
            AncestorEnd => 2,
            Skip => 3,
            Start => 4,
            Pre => 5,
            Exit => 6,
            Invariant => 7,
            End => 8,
            Post => 9,
            Repeat => 10,
            ActionComplete => 11,
            AbortComplete => 12,
        }
    }

    /// The truth value a condition is taken to have when the node carries
    /// no expression for it (PLEXIL's documented per-kind defaults).
    pub fn default_value(self) -> bool {
        use ConditionKind::*;
        match self {
            AncestorExit => false,
            AncestorInvariant => true,
            AncestorEnd => false,
            Skip => false,
            Start => true,
            Pre => true,
            Exit => false,
            Invariant => true,
            End => true,
            Post => true,
            Repeat => false,
            ActionComplete => true,
            AbortComplete => true,
        }
    }
}

/// The four-ish-as-five queue disposition of a node (spec.md §3, carried
/// unchanged from `NodeImpl.hh`'s `QUEUE_*` constants per SPEC_FULL §2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    None,
    Check,
    Transition,
    TransitionCheck,
    Delete,
}

/// Variant-specific payload. The presence of a particular variant *is* the
/// node's variant tag (spec.md §3's `Empty/Assignment/Command/Update/
/// NodeList/LibraryCall`); there is no separate discriminant to keep in
/// sync.
#[derive(Debug)]
pub enum NodeBody {
    Empty,
    Assignment(Assignment),
    Command(Command),
    Update(Update),
    List(Vec<NodeId>),
    LibraryCall { library: ArcStr, aliases: Vec<(ArcStr, ExprId)>, body: NodeId },
}

impl NodeBody {
    /// List and LibraryCall nodes synthesize the `AllChildrenFinished`/
    /// `AllChildrenWaitingOrFinished` aggregates and can occupy the
    /// `Finishing` state (spec.md §4.3); every other variant skips it.
    pub fn has_children(&self) -> bool {
        matches!(self, NodeBody::List(_) | NodeBody::LibraryCall { .. })
    }

    pub fn children(&self) -> &[NodeId] {
        match self {
            NodeBody::List(c) => c,
            NodeBody::LibraryCall { body, .. } => std::slice::from_ref(body),
            _ => &[],
        }
    }
}

pub struct Node {
    pub id: NodeId,
    /// The plan-authored stable identifier (spec.md §3: "stable node id
    /// (string)"), distinct from the arena-local `NodeId` index.
    pub node_id: ArcStr,
    pub parent: Option<NodeId>,
    pub state: NodeState,
    pub outcome: NodeOutcome,
    pub failure_type: FailureType,
    conditions: [Option<ExprId>; ConditionKind::COUNT],
    pub local_vars: Vec<ExprId>,
    pub var_names: fxhash::FxHashMap<ArcStr, ExprId>,
    pub body: NodeBody,
    pub queue_status: QueueStatus,
    /// Intrusive singly-linked queue slot (spec.md §3 "Queues ... singly
    /// linked, intrusively threaded through the queued object").
    pub next: Option<NodeId>,
    pub state_timestamps: [Option<f64>; NodeState::COUNT],
    /// Assignment nodes only; lower numeric value is higher precedence
    /// (spec.md §3, §4.5).
    pub priority: Option<i64>,

    /// Variables exposing this node's own state/outcome/failure to other
    /// nodes' conditions (e.g. a sibling's `AncestorEnd` referencing this
    /// node's `NodeState`), grounded on the original `NodeStateVariable`/
    /// `NodeOutcomeVariable`/`NodeFailureTypeVariable` (`Node.hh`). Left
    /// unset for nodes no other expression depends on.
    pub state_variable: Option<ExprId>,
    pub outcome_variable: Option<ExprId>,
    pub failure_variable: Option<ExprId>,
}

impl Node {
    pub fn new(id: NodeId, node_id: impl Into<ArcStr>, parent: Option<NodeId>, body: NodeBody) -> Self {
        Node {
            id,
            node_id: node_id.into(),
            parent,
            state: NodeState::Inactive,
            outcome: NodeOutcome::None,
            failure_type: FailureType::None,
            conditions: [None; ConditionKind::COUNT],
            local_vars: Vec::new(),
            var_names: fxhash::FxHashMap::default(),
            body,
            queue_status: QueueStatus::None,
            next: None,
            state_timestamps: [None; NodeState::COUNT],
            priority: None,
            state_variable: None,
            outcome_variable: None,
            failure_variable: None,
        }
    }

    /// Wire up this node's state/outcome/failure-observing variables, for
    /// conditions elsewhere in the plan that reference them.
    pub fn set_observers(&mut self, state: Option<ExprId>, outcome: Option<ExprId>, failure: Option<ExprId>) {
        self.state_variable = state;
        self.outcome_variable = outcome;
        self.failure_variable = failure;
    }

    pub fn condition(&self, kind: ConditionKind) -> Option<ExprId> {
        self.conditions[kind.index()]
    }

    pub fn set_condition(&mut self, kind: ConditionKind, expr: ExprId) {
        self.conditions[kind.index()] = Some(expr);
    }

    pub fn is_assignment(&self) -> bool {
        matches!(self.body, NodeBody::Assignment(_))
    }

    pub fn record_state_entry(&mut self, cycle_time: f64) {
        self.state_timestamps[self.state.index()] = Some(cycle_time);
    }
}

/// Wire up the default `ActionComplete`/`End` conditions for every
/// `has_children()` node in the subtree rooted at `id` -- `AllChildrenFinished`
/// and `AllChildrenWaitingOrFinished` respectively, over the children's
/// `NodeState` observer variables (spec.md §4.3 condition defaults) -- unless
/// the plan author already supplied an explicit condition for that slot.
/// Recurses first so a nested List/LibraryCall body gets its own aggregates
/// before its parent reads its `state_variable`.
pub fn synthesize_aggregate_conditions(nodes: &mut NodeArena, exprs: &mut ExprArena<NodeId>, id: NodeId) {
    let children: Vec<NodeId> = nodes.get(id).body.children().to_vec();
    for &child in &children {
        synthesize_aggregate_conditions(nodes, exprs, child);
    }

    if !nodes.get(id).body.has_children() {
        return;
    }

    let state_vars: Vec<ExprId> = children
        .iter()
        .map(|&child| match nodes.get(child).state_variable {
            Some(var) => var,
            None => {
                let var = exprs.alloc_variable(Value::NodeState(nodes.get(child).state));
                nodes.get_mut(child).state_variable = Some(var);
                var
            }
        })
        .collect();

    if nodes.get(id).condition(ConditionKind::ActionComplete).is_none() {
        let agg = exprs.alloc_aggregate(AggregateKind::AllFinished, &state_vars);
        nodes.get_mut(id).set_condition(ConditionKind::ActionComplete, agg);
    }
    if nodes.get(id).condition(ConditionKind::End).is_none() {
        let agg = exprs.alloc_aggregate(AggregateKind::AllWaitingOrFinished, &state_vars);
        nodes.get_mut(id).set_condition(ConditionKind::End, agg);
    }
}
