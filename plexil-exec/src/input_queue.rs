//! The bounded, typed FIFO of external events (spec.md §4.8). The
//! single-threaded `InputQueue` is a plain `VecDeque`; `ThreadSafeInputQueue`
//! wraps it in `parking_lot::Mutex` for a threaded host's producer side
//! (spec.md §5: "the input queue is the only structure shared between the
//! exec and external-event producers").

use std::collections::VecDeque;

use parking_lot::Mutex;
use plexil_node::NodeId;
use plexil_value::{CommandHandle, State, Value};

/// One of the seven record variants of spec.md §4.8.
#[derive(Debug, Clone)]
pub enum InputRecord {
    LookupReturn { state: State, value: Value },
    CommandAck { command: NodeId, handle: CommandHandle },
    CommandReturn { command: NodeId, value: Value },
    CommandAbort { command: NodeId, acknowledged: bool },
    UpdateAck { update: NodeId, acknowledged: bool },
    /// The root of an already-built node tree, pre-allocated into the
    /// exec's shared node/expression arenas by the caller (plan XML
    /// parsing and tree construction are out of scope per spec.md §1;
    /// this crate never builds a `Node` itself).
    AddPlan { root: NodeId },
    Mark { sequence: u64 },
}

#[derive(Default)]
pub struct InputQueue {
    records: VecDeque<InputRecord>,
    next_mark: u64,
    last_mark_drained: u64,
}

impl InputQueue {
    pub fn new() -> Self {
        InputQueue::default()
    }

    pub fn push(&mut self, record: InputRecord) {
        self.records.push_back(record);
    }

    /// Allocate and enqueue the next monotonic mark sequence number,
    /// returning it to the caller so it can correlate completion later.
    pub fn push_mark(&mut self) -> u64 {
        let seq = self.next_mark;
        self.next_mark += 1;
        self.records.push_back(InputRecord::Mark { sequence: seq });
        seq
    }

    /// Drain everything currently queued, in FIFO order. Non-blocking:
    /// processes exactly what is present at call time (spec.md §4.8).
    pub fn drain(&mut self) -> Vec<InputRecord> {
        let mut out: Vec<InputRecord> = self.records.drain(..).collect();
        for r in &out {
            if let InputRecord::Mark { sequence } = r {
                self.last_mark_drained = self.last_mark_drained.max(*sequence);
            }
        }
        out.shrink_to_fit();
        out
    }

    pub fn get_last_mark(&self) -> u64 {
        self.last_mark_drained
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Mutex-guarded producer-side handle for a threaded host (spec.md §5).
/// Only `push`/`push_mark` are exposed here -- draining remains the exec's
/// exclusive, single-threaded responsibility.
pub struct ThreadSafeInputQueue {
    inner: Mutex<InputQueue>,
}

impl ThreadSafeInputQueue {
    pub fn new() -> Self {
        ThreadSafeInputQueue { inner: Mutex::new(InputQueue::new()) }
    }

    pub fn push(&self, record: InputRecord) {
        self.inner.lock().push(record);
    }

    pub fn push_mark(&self) -> u64 {
        self.inner.lock().push_mark()
    }

    /// Detach and return the entire backing queue's contents, for the exec
    /// to fold into its own (non-shared) `InputQueue` at drain time.
    pub fn take_all(&self) -> Vec<InputRecord> {
        self.inner.lock().drain()
    }
}

impl Default for ThreadSafeInputQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_fifo_order_and_tracks_last_mark() {
        let mut q = InputQueue::new();
        q.push(InputRecord::LookupReturn { state: State::new("A", vec![]), value: Value::Int(1) });
        let m = q.push_mark();
        q.push(InputRecord::LookupReturn { state: State::new("B", vec![]), value: Value::Int(2) });
        let drained = q.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(q.get_last_mark(), m);
        assert!(q.is_empty());
    }
}
