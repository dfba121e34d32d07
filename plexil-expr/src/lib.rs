//! The lazily-evaluated, activation-refcounted expression graph and state
//! cache that back every condition, variable, and lookup in a PLEXIL plan.
//!
//! This crate knows nothing about `Node`s or plans: it is a generic
//! dataflow graph parametrized over an external listener id (`L`), so the
//! domain model in `plexil-node` can plug in its own `NodeId` without
//! `plexil-expr` depending back on it (SPEC_FULL.md DESIGN NOTES).

mod arena;
mod operator;
mod state_cache;

pub use arena::{AggregateKind, ExprArena, ExprId, Listener};
pub use operator::{eval as eval_operator, result_type as operator_result_type, Operator};
pub use state_cache::StateCache;
