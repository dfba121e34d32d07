use serde::{Deserialize, Serialize};
use std::fmt;

/// A node's position in its state machine (spec.md §3, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeState {
    Inactive,
    Waiting,
    Executing,
    IterationEnded,
    Finished,
    Failing,
    Finishing,
}

impl NodeState {
    pub const COUNT: usize = 7;

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The terminal disposition of a node's most recent iteration (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeOutcome {
    None,
    Success,
    Failure,
    Skipped,
    Interrupted,
}

impl fmt::Display for NodeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Why a node's outcome was `Failure` (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FailureType {
    None,
    PreConditionFailed,
    PostConditionFailed,
    InvariantConditionFailed,
    ParentFailed,
    ParentExited,
    Exited,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The state of a dispatched `Command`, reported by the external interface
/// through the input queue (spec.md §3). Handles only ever advance forward
/// through this ladder; see `plexil-node`'s `Command::set_handle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CommandHandle {
    SentToSystem,
    Accepted,
    ReceivedBySystem,
    Success,
    Failed,
    Denied,
    InterfaceError,
    InvalidCommandName,
}

impl CommandHandle {
    /// True once the command has reached any of its terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CommandHandle::Success
                | CommandHandle::Failed
                | CommandHandle::Denied
                | CommandHandle::InterfaceError
                | CommandHandle::InvalidCommandName
        )
    }

    fn rank(self) -> u8 {
        match self {
            CommandHandle::SentToSystem => 0,
            CommandHandle::Accepted => 1,
            CommandHandle::ReceivedBySystem => 2,
            CommandHandle::Success
            | CommandHandle::Failed
            | CommandHandle::Denied
            | CommandHandle::InterfaceError
            | CommandHandle::InvalidCommandName => 3,
        }
    }

    /// Is `next` a legal successor of `self` in the monotonic handle
    /// ladder described in SPEC_FULL.md §2 (derived from `Command.hh`)?
    pub fn can_advance_to(self, next: CommandHandle) -> bool {
        next.rank() >= self.rank()
    }
}

impl fmt::Display for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
