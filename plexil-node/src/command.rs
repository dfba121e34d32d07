//! `Command` bodies (spec.md §3 "Command").

use crate::resource::{ResourceSpec, ResourceValue};
use arcstr::ArcStr;
use plexil_expr::ExprId;
use plexil_value::CommandHandle;
use smallvec::SmallVec;

#[derive(Debug)]
pub struct Command {
    pub name: ExprId,
    pub args: SmallVec<[ExprId; 4]>,
    pub destination: Option<ExprId>,
    pub resources: Vec<ResourceSpec>,
    pub handle_var: ExprId,
    pub abort_complete: ExprId,

    /// Set at fixing time (spec.md §3 "fixed-name, fixed-arg-values,
    /// fixed-resources, active/fixed flags").
    pub fixed_name: Option<ArcStr>,
    pub fixed_args: Vec<plexil_value::Value>,
    pub fixed_resources: Vec<ResourceValue>,
    pub active: bool,
    pub fixed: bool,

    /// The handle value last observed, tracked only to enforce the
    /// monotonic-ladder invariant (SPEC_FULL.md §2, grounded on
    /// `Command.hh`) -- the ladder's ground truth still lives in the
    /// `handle_var` expression.
    last_handle: Option<CommandHandle>,
}

impl Command {
    pub fn new(name: ExprId, args: SmallVec<[ExprId; 4]>, destination: Option<ExprId>, resources: Vec<ResourceSpec>, handle_var: ExprId, abort_complete: ExprId) -> Self {
        Command {
            name,
            args,
            destination,
            resources,
            handle_var,
            abort_complete,
            fixed_name: None,
            fixed_args: Vec::new(),
            fixed_resources: Vec::new(),
            active: false,
            fixed: false,
            last_handle: None,
        }
    }

    /// Record a newly observed handle, asserting it does not move backward
    /// through `SentToSystem -> Accepted -> ReceivedBySystem -> {terminal}`.
    pub fn record_handle(&mut self, handle: CommandHandle) {
        if let Some(prev) = self.last_handle {
            debug_assert!(
                prev.can_advance_to(handle),
                "command handle regressed from {prev:?} to {handle:?}"
            );
        }
        self.last_handle = Some(handle);
    }

    pub fn current_handle(&self) -> Option<CommandHandle> {
        self.last_handle
    }
}
