//! Planner `Update` bodies (spec.md §3 "Update").

use arcstr::ArcStr;
use plexil_expr::ExprId;

#[derive(Debug)]
pub struct Update {
    pub pairs: Vec<(ArcStr, ExprId)>,
    pub ack: ExprId,
}

impl Update {
    pub fn new(pairs: Vec<(ArcStr, ExprId)>, ack: ExprId) -> Self {
        Update { pairs, ack }
    }
}
