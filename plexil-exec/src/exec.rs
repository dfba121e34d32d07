//! `ExecContext`: owns every piece of per-plan state and drives the
//! macro-step / micro-step contract of spec.md §4.4.

use std::collections::VecDeque;

use arcstr::ArcStr;
use fxhash::{FxHashMap, FxHashSet};
use plexil_expr::{ExprArena, ExprId};
use plexil_node::{
    active_conditions, commit_transition, destination_state, synthesize_aggregate_conditions, Assignable, NodeArena, NodeBody, NodeId,
    ResourceValue,
};
use plexil_value::{CommandHandle, NodeOutcome, NodeState, Value};

use crate::conflict::ConflictRegistry;
use crate::arbiter::ResourceArbiter;
use crate::config::Config;
use crate::error::ContractViolation;
use crate::input_queue::{InputQueue, InputRecord};
use crate::interface::ExternalInterface;
use crate::listener::{AssignmentRecord, ListenerHub, TransitionRecord};
use crate::{fatal, plexil_debug};

pub struct ExecContext<I: ExternalInterface> {
    pub nodes: NodeArena,
    pub exprs: ExprArena<NodeId>,
    pub conflicts: ConflictRegistry,
    pub arbiter: ResourceArbiter,
    pub input_queue: InputQueue,
    pub listeners: ListenerHub,
    pub config: Config,
    interface: I,
    cycle: u64,
    time: f64,
    roots: Vec<NodeId>,
    candidates: VecDeque<NodeId>,
    queued: FxHashSet<NodeId>,
}

impl<I: ExternalInterface> ExecContext<I> {
    pub fn new(interface: I, config: Config) -> Self {
        ExecContext {
            nodes: NodeArena::new(),
            exprs: ExprArena::new(),
            conflicts: ConflictRegistry::new(),
            arbiter: ResourceArbiter::new(),
            input_queue: InputQueue::new(),
            listeners: ListenerHub::new(),
            config,
            interface,
            cycle: 0,
            time: 0.0,
            roots: Vec::new(),
            candidates: VecDeque::new(),
            queued: FxHashSet::default(),
        }
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// The host-supplied `ExternalInterface`, for a host that needs to poll
    /// its own side-effects between steps (e.g. a test double's recorded
    /// calls, or a live adapter's connection state).
    pub fn interface(&self) -> &I {
        &self.interface
    }

    pub fn interface_mut(&mut self) -> &mut I {
        &mut self.interface
    }

    /// True while there is work the exec could still do without external
    /// input (spec.md §4.4: "the host calls `step` again whenever
    /// `needsStep` becomes true").
    pub fn needs_step(&self) -> bool {
        !self.candidates.is_empty() || !self.input_queue.is_empty()
    }

    fn add_candidate_node(&mut self, id: NodeId) {
        if self.queued.insert(id) {
            self.candidates.push_back(id);
        }
    }

    /// Register a freshly-allocated plan root and queue it for its first
    /// `Inactive -> Waiting` transition (spec.md §4.8 `AddPlan`). The root
    /// and its subtree must already be fully built in `self.nodes`/
    /// `self.exprs` by the caller -- plan parsing is out of scope here
    /// (SPEC_FULL.md "AddPlan" design note).
    pub fn add_plan(&mut self, root: NodeId) {
        synthesize_aggregate_conditions(&mut self.nodes, &mut self.exprs, root);
        self.roots.push(root);
        self.add_candidate_node(root);
    }

    // -- the macro step -------------------------------------------------

    /// Run one macro-step (spec.md §4.4): latch time, drain the input
    /// queue, quiesce through micro-steps, fan out listeners exactly once.
    /// Returns the number of transitions committed this macro-step.
    pub fn step(&mut self) -> usize {
        self.cycle += 1;
        self.time = self.interface.current_time();
        plexil_debug!(self.config, "exec.step", "beginning cycle {}", self.cycle);

        for record in self.input_queue.drain() {
            self.apply_input_record(record);
        }

        let mut committed_total = 0;
        let mut deferred_losers: Vec<NodeId> = Vec::new();

        loop {
            if self.candidates.is_empty() {
                break;
            }
            let batch: Vec<NodeId> = self.candidates.drain(..).collect();
            for id in &batch {
                self.queued.remove(id);
            }

            let mut committed_this_pass = false;
            let mut pending: FxHashMap<NodeId, (NodeState, NodeOutcome, plexil_value::FailureType)> = FxHashMap::default();
            let mut contested: FxHashSet<ExprId> = FxHashSet::default();
            let mut pending_command_requests: Vec<(NodeId, Vec<ResourceValue>, i64)> = Vec::new();

            // Phase 1: compute every candidate's destination against the
            // state as it stood at the top of this pass -- no commits yet.
            // spec.md §4.4 / SPEC_FULL.md §3: "within a cycle, all
            // candidates are considered before any transitions fire", so a
            // later candidate here must never observe an earlier one's
            // already-committed state.
            let mut destinations: Vec<(NodeId, NodeState, NodeOutcome, plexil_value::FailureType)> = Vec::with_capacity(batch.len());
            for id in &batch {
                if let Some((dest, outcome, failure)) = destination_state(&self.nodes, &self.exprs, *id) {
                    destinations.push((*id, dest, outcome, failure));
                }
            }

            // Phase 2: classify and commit. Assignment/resourced-command
            // candidates are held back for arbitration below; everything
            // else commits here.
            for (id, dest, outcome, failure) in destinations {
                if dest == NodeState::Executing {
                    if let Some(var) = self.assignment_destination_var(id) {
                        let priority = self.assignment_priority(id);
                        self.conflicts.register(var, id, priority);
                        pending.insert(id, (dest, outcome, failure));
                        contested.insert(var);
                        continue;
                    }
                    if let Some((resources, priority)) = self.fix_command_if_any(id) {
                        if !resources.is_empty() {
                            pending_command_requests.push((id, resources, priority));
                            continue;
                        }
                    }
                }

                self.commit(id, dest, outcome, failure);
                committed_this_pass = true;
            }

            for var in contested {
                let front = self.conflicts.get(var).and_then(|s| s.front());
                match front {
                    Some(front) => {
                        if let Some((d, o, f)) = pending.remove(&front) {
                            // `commit` itself clears this registration now.
                            self.commit(front, d, o, f);
                            committed_this_pass = true;
                        }
                    }
                    None => fatal!(ContractViolation::EmptyConflictSet),
                }
            }
            deferred_losers.extend(pending.into_keys());

            if !pending_command_requests.is_empty() {
                let (accepted, rejected) = self.arbiter.arbitrate(pending_command_requests);
                for id in accepted {
                    if let Some((dest, outcome, failure)) = destination_state(&self.nodes, &self.exprs, id) {
                        self.commit(id, dest, outcome, failure);
                        committed_this_pass = true;
                    }
                }
                for id in rejected {
                    self.deny_command(id);
                    self.add_candidate_node(id);
                }
            }

            if committed_this_pass {
                committed_total += 1;
            } else {
                break;
            }
        }

        for id in deferred_losers {
            self.add_candidate_node(id);
        }

        self.listeners.step_complete();
        self.sweep_finished_roots();
        committed_total
    }

    // -- input queue application -----------------------------------------

    fn apply_input_record(&mut self, record: InputRecord) {
        match record {
            InputRecord::LookupReturn { state, value } => {
                let woken = self.exprs.state_cache.set_value(state, value, self.cycle);
                for expr in woken {
                    for l in self.exprs.notify(expr) {
                        self.add_candidate_node(l);
                    }
                }
            }
            InputRecord::CommandAck { command, handle } => {
                let handle_var = match &mut self.nodes.get_mut(command).body {
                    NodeBody::Command(cmd) => {
                        cmd.record_handle(handle);
                        Some(cmd.handle_var)
                    }
                    _ => None,
                };
                if let Some(var) = handle_var {
                    let woken = self.exprs.set_variable(var, Value::CommandHandle(handle));
                    for l in woken {
                        self.add_candidate_node(l);
                    }
                }
                self.add_candidate_node(command);
            }
            InputRecord::CommandReturn { command, value } => {
                let destination = match &self.nodes.get(command).body {
                    NodeBody::Command(cmd) => cmd.destination,
                    _ => None,
                };
                if let Some(var) = destination {
                    let woken = self.exprs.set_variable(var, value);
                    for l in woken {
                        self.add_candidate_node(l);
                    }
                }
            }
            InputRecord::CommandAbort { command, acknowledged } => {
                let abort_complete = match &self.nodes.get(command).body {
                    NodeBody::Command(cmd) => Some(cmd.abort_complete),
                    _ => None,
                };
                if let Some(var) = abort_complete {
                    let woken = self.exprs.set_variable(var, Value::Bool(acknowledged));
                    for l in woken {
                        self.add_candidate_node(l);
                    }
                }
                self.add_candidate_node(command);
            }
            InputRecord::UpdateAck { update, acknowledged } => {
                let ack = match &self.nodes.get(update).body {
                    NodeBody::Update(u) => Some(u.ack),
                    _ => None,
                };
                if let Some(var) = ack {
                    let woken = self.exprs.set_variable(var, Value::Bool(acknowledged));
                    for l in woken {
                        self.add_candidate_node(l);
                    }
                }
            }
            InputRecord::AddPlan { root } => self.add_plan(root),
            InputRecord::Mark { .. } => {}
        }
    }

    // -- commit + entry/exit side effects --------------------------------

    fn commit(&mut self, id: NodeId, dest: NodeState, outcome: NodeOutcome, failure: plexil_value::FailureType) {
        let old_state = self.nodes.get(id).state;
        if old_state == dest {
            fatal!(ContractViolation::SelfLoop { node: self.nodes.get(id).node_id.clone(), from: old_state });
        }

        // An assignment node can be registered in its destination
        // variable's conflict set (phase 2 above) and then, on a later
        // pass, leave the Executing/assignment path entirely -- e.g. an
        // ancestor's Exit condition trips it straight to Failing. Clear its
        // registration on every commit, not only the winning one: a dead
        // entry left at the front of the set would starve every live
        // contender for that variable forever.
        if let Some(var) = self.assignment_destination_var(id) {
            self.conflicts.remove(var, id);
        }

        let newly_candidate = commit_transition(&mut self.nodes, &mut self.exprs, id, dest, outcome, failure, self.time);

        self.sync_observer_variables(id, dest, outcome, failure);

        self.listeners.record_transition(TransitionRecord { node: id, old_state, new_state: dest, outcome, failure });

        for child in newly_candidate {
            self.add_candidate_node(child);
        }
        // The node itself may still have further transitions ready this
        // same macro-step (e.g. Inactive -> Waiting -> Executing when
        // every gating condition is already true).
        self.add_candidate_node(id);

        if dest == NodeState::Executing {
            self.run_entry_effects(id);
        }
        if dest == NodeState::Finished {
            self.run_finished_effects(id);
        }
    }

    /// Push this node's own state/outcome/failure out to whatever
    /// expressions other nodes' conditions built on top of its observer
    /// variables (spec.md §4.1 fan-out law, applied to node-state
    /// observation per `Node.hh`'s `NodeStateVariable` et al.).
    fn sync_observer_variables(&mut self, id: NodeId, dest: NodeState, outcome: NodeOutcome, failure: plexil_value::FailureType) {
        let (state_var, outcome_var, failure_var) = {
            let node = self.nodes.get(id);
            (node.state_variable, node.outcome_variable, node.failure_variable)
        };
        let mut woken = smallvec::SmallVec::<[NodeId; 8]>::new();
        if let Some(var) = state_var {
            woken.extend(self.exprs.set_variable(var, Value::NodeState(dest)));
        }
        if let Some(var) = outcome_var {
            woken.extend(self.exprs.set_variable(var, Value::NodeOutcome(outcome)));
        }
        if let Some(var) = failure_var {
            woken.extend(self.exprs.set_variable(var, Value::FailureType(failure)));
        }
        for l in woken {
            self.add_candidate_node(l);
        }
    }

    fn run_entry_effects(&mut self, id: NodeId) {
        match &self.nodes.get(id).body {
            NodeBody::Assignment(_) => self.assignment_entry(id),
            NodeBody::Command(_) => self.command_entry(id),
            NodeBody::Update(_) => self.update_entry(id),
            NodeBody::Empty | NodeBody::List(_) | NodeBody::LibraryCall { .. } => {}
        }
    }

    fn run_finished_effects(&mut self, id: NodeId) {
        let release = matches!(&self.nodes.get(id).body, NodeBody::Command(cmd) if cmd.fixed_resources.iter().any(|r| r.release_at_termination));
        if release {
            self.arbiter.release_resources_for_command(id);
        }
    }

    fn assignment_entry(&mut self, id: NodeId) {
        let (destination, rhs, ack) = match &self.nodes.get(id).body {
            NodeBody::Assignment(a) => (a.destination, a.rhs, a.ack),
            _ => unreachable!(),
        };
        let value = self.exprs.value(rhs);
        match destination {
            Assignable::Variable(var) => {
                self.exprs.save_current_value(var);
                for l in self.exprs.set_variable(var, value.clone()) {
                    self.add_candidate_node(l);
                }
                self.listeners.record_assignment(AssignmentRecord { node: id, variable: var, value: value.clone() });
            }
            Assignable::ArrayElement { array, index } => {
                if let Value::Int(i) = self.exprs.value(index) {
                    if i >= 0 {
                        let _ = self.exprs.set_array_element(array, i as usize, value.clone());
                        // Array-element writes don't fan out through
                        // `notify` in the current arena (only whole-
                        // variable `set_variable` does); readers of
                        // individual elements re-evaluate lazily next
                        // time they're activated/read.
                    }
                }
                self.listeners.record_assignment(AssignmentRecord { node: id, variable: array, value });
            }
        }
        for l in self.exprs.set_variable(ack, Value::Bool(true)) {
            self.add_candidate_node(l);
        }
    }

    fn assignment_destination_var(&self, id: NodeId) -> Option<ExprId> {
        match &self.nodes.get(id).body {
            NodeBody::Assignment(a) => Some(match a.destination {
                Assignable::Variable(v) => v,
                Assignable::ArrayElement { array, .. } => array,
            }),
            _ => None,
        }
    }

    fn assignment_priority(&self, id: NodeId) -> i64 {
        match &self.nodes.get(id).body {
            NodeBody::Assignment(a) => a.priority,
            _ => i64::MAX,
        }
    }

    /// Evaluate a `Command`'s name/args/resources into concrete scalars
    /// ("fixing", spec.md Glossary) the first time it enters `Executing`.
    /// Returns the fixed resource demands and the command's priority so
    /// the caller can decide whether arbitration is needed.
    fn fix_command_if_any(&mut self, id: NodeId) -> Option<(Vec<ResourceValue>, i64)> {
        let already_fixed = matches!(&self.nodes.get(id).body, NodeBody::Command(c) if c.fixed);
        if already_fixed {
            return match &self.nodes.get(id).body {
                NodeBody::Command(c) => Some((c.fixed_resources.clone(), c.fixed_resources.first().map(|r| r.priority).unwrap_or(0))),
                _ => None,
            };
        }

        let (name, args, resources) = match &self.nodes.get(id).body {
            NodeBody::Command(cmd) => (cmd.name, cmd.args.clone(), cmd.resources.clone()),
            _ => return None,
        };

        let fixed_name = match self.exprs.value(name) {
            Value::String(s) => s,
            _ => ArcStr::from(""),
        };
        let fixed_args: Vec<Value> = args.iter().map(|a| self.exprs.value(*a)).collect();
        let mut fixed_resources = Vec::with_capacity(resources.len());
        for r in &resources {
            let priority = match self.exprs.value(r.priority) {
                Value::Int(i) => i as i64,
                _ => 0,
            };
            let lower_bound = self.exprs.value(r.lower_bound).promote_to_real().unwrap_or(0.0);
            let upper_bound = self.exprs.value(r.upper_bound).promote_to_real().unwrap_or(0.0);
            let release_at_termination = matches!(self.exprs.value(r.release_at_termination), Value::Bool(true));
            let name = match self.exprs.value(r.name) {
                Value::String(s) => s,
                _ => ArcStr::from(""),
            };
            fixed_resources.push(ResourceValue { name, priority, lower_bound, upper_bound, release_at_termination });
        }

        let priority = fixed_resources.first().map(|r| r.priority).unwrap_or(0);
        if let NodeBody::Command(cmd) = &mut self.nodes.get_mut(id).body {
            cmd.fixed_name = Some(fixed_name);
            cmd.fixed_args = fixed_args;
            cmd.fixed_resources = fixed_resources.clone();
            cmd.fixed = true;
        }
        Some((fixed_resources, priority))
    }

    /// Dispatch a command that is either resource-free or already
    /// accepted by the arbiter (spec.md §4.7: arbitration for resourced
    /// commands runs in `step`'s per-pass resolution, before this point).
    fn command_entry(&mut self, id: NodeId) {
        self.fix_command_if_any(id);
        let (name, args) = match &self.nodes.get(id).body {
            NodeBody::Command(cmd) => (cmd.fixed_name.clone().unwrap_or_default(), cmd.fixed_args.clone()),
            _ => return,
        };
        if let NodeBody::Command(cmd) = &mut self.nodes.get_mut(id).body {
            cmd.active = true;
        }
        self.interface.execute_command(id, &name, &args);
    }

    fn deny_command(&mut self, id: NodeId) {
        let handle_var = match &self.nodes.get(id).body {
            NodeBody::Command(cmd) => Some(cmd.handle_var),
            _ => None,
        };
        if let Some(var) = handle_var {
            if let NodeBody::Command(cmd) = &mut self.nodes.get_mut(id).body {
                cmd.record_handle(CommandHandle::Denied);
            }
            for l in self.exprs.set_variable(var, Value::CommandHandle(CommandHandle::Denied)) {
                self.add_candidate_node(l);
            }
        }
    }

    fn update_entry(&mut self, id: NodeId) {
        let pairs: Vec<(ArcStr, Value)> = match &self.nodes.get(id).body {
            NodeBody::Update(u) => u.pairs.iter().map(|(k, v)| (k.clone(), self.exprs.value(*v))).collect(),
            _ => return,
        };
        self.interface.execute_update(id, &pairs);
    }

    /// After the cycle quiesces, free arena-adjacent bookkeeping for roots
    /// that reached `Finished` (spec.md §4.4 step 5: "collect Finished
    /// roots for deletion"). The `NodeArena` slots themselves are never
    /// compacted -- `NodeId`s remain valid for the life of the process, a
    /// deliberate simplification over the original's reference-counted
    /// node deletion (SPEC_FULL.md DESIGN NOTES).
    fn sweep_finished_roots(&mut self) {
        self.roots.retain(|id| self.nodes.get(*id).state != NodeState::Finished);
    }

    pub fn active_root_count(&self) -> usize {
        self.roots.len()
    }

    /// Ensure every condition a node needs in its current state is
    /// activated -- used once at plan-ingestion time for a freshly added
    /// root (spec.md §4.1: activation starts at the root and follows
    /// `has_children`).
    pub fn activate_conditions_for(&mut self, id: NodeId) {
        let (state, has_children) = {
            let node = self.nodes.get(id);
            (node.state, node.body.has_children())
        };
        for kind in active_conditions(state, has_children) {
            if let Some(expr) = self.nodes.get(id).condition(*kind) {
                self.exprs.activate(expr);
                self.exprs.add_listener(expr, plexil_expr::Listener::External(id));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::test_support::RecordingInterface;
    use plexil_node::ConditionKind;

    fn ctx() -> ExecContext<RecordingInterface> {
        ExecContext::new(RecordingInterface::default(), Config::default())
    }

    /// Scenario 1 of spec.md §8 driven through the full macro-step loop
    /// instead of by hand: a single Empty node with Start=true runs to
    /// completion across macro-steps.
    #[test]
    fn single_empty_node_runs_to_finished_through_step() {
        let mut exec = ctx();
        let id = exec.nodes.alloc("root", None, NodeBody::Empty);
        let start = exec.exprs.alloc_constant(Value::Bool(true));
        exec.nodes.get_mut(id).set_condition(ConditionKind::Start, start);
        exec.add_plan(id);

        exec.step();
        assert_eq!(exec.nodes.get(id).state, NodeState::Finished);
        assert_eq!(exec.nodes.get(id).outcome, NodeOutcome::Success);
        assert!(!exec.needs_step());
    }

    #[test]
    fn assignment_entry_writes_destination_and_acks() {
        let mut exec = ctx();
        let id = exec.nodes.alloc("assign", None, NodeBody::Empty);
        let var = exec.exprs.alloc_variable(Value::Int(0));
        let rhs = exec.exprs.alloc_constant(Value::Int(42));
        let ack = exec.exprs.alloc_variable(Value::Bool(false));
        let abort_complete = exec.exprs.alloc_constant(Value::Bool(true));
        let start = exec.exprs.alloc_constant(Value::Bool(true));
        exec.nodes.get_mut(id).body =
            NodeBody::Assignment(plexil_node::Assignment::new(Assignable::Variable(var), rhs, 0, ack, abort_complete));
        exec.nodes.get_mut(id).set_condition(ConditionKind::Start, start);
        exec.add_plan(id);

        exec.step();
        assert_eq!(exec.exprs.value(var), Value::Int(42));
    }

    #[test]
    fn two_assignments_to_same_variable_resolve_by_priority() {
        let mut exec = ctx();
        let var = exec.exprs.alloc_variable(Value::Int(0));
        let start = exec.exprs.alloc_constant(Value::Bool(true));
        let abort_complete = exec.exprs.alloc_constant(Value::Bool(true));

        let rhs_a = exec.exprs.alloc_constant(Value::Int(1));
        let ack_a = exec.exprs.alloc_variable(Value::Bool(false));
        let a = exec.nodes.alloc("a", None, NodeBody::Empty);
        exec.nodes.get_mut(a).body = NodeBody::Assignment(plexil_node::Assignment::new(Assignable::Variable(var), rhs_a, 1, ack_a, abort_complete));
        exec.nodes.get_mut(a).set_condition(ConditionKind::Start, start);

        let rhs_b = exec.exprs.alloc_constant(Value::Int(2));
        let ack_b = exec.exprs.alloc_variable(Value::Bool(false));
        let b = exec.nodes.alloc("b", None, NodeBody::Empty);
        exec.nodes.get_mut(b).body = NodeBody::Assignment(plexil_node::Assignment::new(Assignable::Variable(var), rhs_b, 2, ack_b, abort_complete));
        exec.nodes.get_mut(b).set_condition(ConditionKind::Start, start);

        exec.add_plan(a);
        exec.add_plan(b);
        exec.step();

        assert_eq!(exec.exprs.value(var), Value::Int(1), "lower numeric priority (1) should win over (2)");
    }
}
