//! Per-command resource declarations (spec.md §3 "Resource specification").

use plexil_expr::ExprId;
use arcstr::ArcStr;

/// As authored: every field is an expression, evaluated at "fixing" time
/// (spec.md Glossary: "Fixing. Capturing the current values of a command's
/// name, arguments, and resources into concrete scalars").
#[derive(Debug, Clone)]
pub struct ResourceSpec {
    pub name: ExprId,
    pub priority: ExprId,
    pub lower_bound: ExprId,
    pub upper_bound: ExprId,
    pub release_at_termination: ExprId,
}

/// After fixing: expressions replaced by the concrete scalars read at that
/// instant (spec.md §3: "a `ResourceValue` replaces expressions with
/// concrete scalars").
#[derive(Debug, Clone)]
pub struct ResourceValue {
    pub name: ArcStr,
    pub priority: i64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub release_at_termination: bool,
}
