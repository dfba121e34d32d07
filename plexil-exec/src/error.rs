//! The error taxonomy of spec.md §7, realized as distinct Rust types
//! rather than stringly-typed errors (SPEC_FULL.md §1 "Errors").

use thiserror::Error;

/// Class 1: structural/semantic plan defects caught at ingestion. Never
/// raised once a plan has entered the node tree (spec.md §7: "Reported
/// before the plan runs; the offending plan is rejected").
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("node id {0:?} already present in this plan")]
    DuplicateNodeId(arcstr::ArcStr),
    #[error("library node {0:?} is not defined")]
    UnknownLibrary(arcstr::ArcStr),
    #[error("circular library reference through {0:?}")]
    CircularLibraryReference(arcstr::ArcStr),
    #[error("plan tree is empty")]
    EmptyPlan,
}

/// Class 4: internal invariant violations (spec.md §7: "abort the exec
/// with a fatal error, because they indicate a defect in the executive
/// itself"). Every construction site logs at `error!` before the caller
/// invokes `fatal!` to panic, mirroring the teacher's `err!`/`errf!`
/// macros.
#[derive(Debug, Error)]
pub enum ContractViolation {
    #[error("attempted to transition node {node:?} from {from:?} to itself")]
    SelfLoop { node: arcstr::ArcStr, from: plexil_value::NodeState },
    #[error("conflict set for a variable is empty at resolution time")]
    EmptyConflictSet,
}

/// Log `$violation` at `error!` and panic, per spec.md §7's "fatal
/// contract violations panic/abort the process".
#[macro_export]
macro_rules! fatal {
    ($violation:expr) => {{
        let v = $violation;
        log::error!("contract violation: {v}");
        panic!("contract violation: {v}");
    }};
}
