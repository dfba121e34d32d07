//! Shared test double for `ExternalInterface`, used by every scenario test
//! in this crate (spec.md §8 "End-to-end scenarios").

use std::collections::VecDeque;

use arcstr::ArcStr;
use plexil_exec::ExternalInterface;
use plexil_node::NodeId;
use plexil_value::{State, Value};

#[derive(Default)]
pub struct RecordingInterface {
    pub times: VecDeque<f64>,
    pub commands_executed: Vec<(NodeId, ArcStr, Vec<Value>)>,
    pub aborts: Vec<NodeId>,
    pub updates: Vec<(NodeId, Vec<(ArcStr, Value)>)>,
    pub subscriptions: Vec<State>,
}

impl ExternalInterface for RecordingInterface {
    fn lookup_now(&mut self, _state: &State) -> Value {
        Value::Unknown
    }

    fn subscribe(&mut self, state: &State) {
        self.subscriptions.push(state.clone());
    }

    fn unsubscribe(&mut self, _state: &State) {}

    fn set_thresholds(&mut self, _state: &State, _low: f64, _high: f64) {}

    fn execute_command(&mut self, node: NodeId, name: &str, args: &[Value]) {
        self.commands_executed.push((node, name.into(), args.to_vec()));
    }

    fn invoke_abort(&mut self, node: NodeId) {
        self.aborts.push(node);
    }

    fn execute_update(&mut self, node: NodeId, pairs: &[(ArcStr, Value)]) {
        self.updates.push((node, pairs.to_vec()));
    }

    fn current_time(&mut self) -> f64 {
        self.times.pop_front().unwrap_or(0.0)
    }
}
