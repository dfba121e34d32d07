//! `Assignment` bodies (spec.md §3 "Assignment").

use plexil_expr::ExprId;
use plexil_value::Value;

/// Where an assignment's result lands: a plain variable, or a specific
/// element of an array variable (spec.md §3: "Destination may be a plain
/// variable or a mutable array reference").
#[derive(Debug, Clone, Copy)]
pub enum Assignable {
    Variable(ExprId),
    ArrayElement { array: ExprId, index: ExprId },
}

#[derive(Debug)]
pub struct Assignment {
    pub destination: Assignable,
    pub rhs: ExprId,
    pub priority: i64,
    pub ack: ExprId,
    pub abort_complete: ExprId,
    /// Captured before commit, restored if the assignment is later aborted
    /// (spec.md §4.5: "A successful commit records the previous value into
    /// the variable's saved slot before overwrite").
    pub saved_value: Option<Value>,
}

impl Assignment {
    pub fn new(destination: Assignable, rhs: ExprId, priority: i64, ack: ExprId, abort_complete: ExprId) -> Self {
        Assignment { destination, rhs, priority, ack, abort_complete, saved_value: None }
    }
}
