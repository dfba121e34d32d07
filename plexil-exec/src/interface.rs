//! The seam between the exec and its host application (spec.md §6
//! "External interface"). Everything on the other side of this trait --
//! telemetry lookup, command dispatch, plan-file loading -- is out of
//! scope (spec.md §1 Non-goals); the exec only ever calls through it.

use arcstr::ArcStr;
use plexil_node::NodeId;
use plexil_value::{State, Value};

/// One call site per row of spec.md §6's external-interface table. Every
/// method is a request the exec fires and forgets -- the corresponding
/// answer, if any, comes back asynchronously through an `InputRecord`
/// (spec.md §4.8), never as this trait's return value. The `NodeId`
/// passed to the command/update methods is the correlation handle the
/// host must echo back in the matching `InputRecord` later.
pub trait ExternalInterface {
    /// Synchronous, one-shot read (spec.md §6: "`LookupNow` ... answered
    /// before the call returns"). Every other lookup kind is asynchronous
    /// and flows back through `InputRecord::LookupReturn`.
    fn lookup_now(&mut self, state: &State) -> Value;

    fn subscribe(&mut self, state: &State);
    fn unsubscribe(&mut self, state: &State);

    /// Numeric low/high thresholds for a `LookupOnChange` subscriber
    /// (spec.md §6). A host with no threshold-aware telemetry path may
    /// treat this as a no-op.
    fn set_thresholds(&mut self, state: &State, low: f64, high: f64);

    fn execute_command(&mut self, node: NodeId, name: &str, args: &[Value]);
    fn invoke_abort(&mut self, node: NodeId);
    fn execute_update(&mut self, node: NodeId, pairs: &[(ArcStr, Value)]);

    /// The host's current time source, read once per macro-step (spec.md
    /// §4.4 step 1: "latch the cycle's time from the external time
    /// source").
    fn current_time(&mut self) -> f64;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::VecDeque;

    /// A deterministic, in-memory stand-in used only by this crate's own
    /// tests -- never a production interface.
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
}
