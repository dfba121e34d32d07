//! The state cache: the last known value of every external state the plan
//! has looked up, plus who is subscribed to each one. Keyed by [`State`]
//! rather than a hash map because `Value` (and so `State`) has no sound
//! `Hash` impl once `RealArray`/`f64` are involved -- see
//! `plexil-value::Value`'s `Ord` impl, which this relies on instead
//! (SPEC_FULL.md §"plexil-expr").

use crate::arena::ExprId;
use fxhash::FxHashSet;
use plexil_value::{State, Value};
use smallvec::SmallVec;
use std::collections::BTreeMap;

struct StateCacheEntry {
    value: Value,
    subscribers: FxHashSet<ExprId>,
    thresholds: Option<(f64, f64)>,
    /// The quiescence cycle this entry was last updated in, enforcing
    /// spec.md §4.1's "refreshed at most once per cycle" rule: a second
    /// `LookupReturn` for the same state arriving mid-cycle updates
    /// nothing further and re-notifies no one.
    refreshed_in_cycle: Option<u64>,
}

impl Default for StateCacheEntry {
    fn default() -> Self {
        StateCacheEntry {
            value: Value::Unknown,
            subscribers: FxHashSet::default(),
            thresholds: None,
            refreshed_in_cycle: None,
        }
    }
}

#[derive(Default)]
pub struct StateCache {
    entries: BTreeMap<State, StateCacheEntry>,
}

impl StateCache {
    pub fn current_value(&self, state: &State) -> Value {
        self.entries.get(state).map(|e| e.value.clone()).unwrap_or(Value::Unknown)
    }

    /// Register `id` as caring about `state`'s value. Returns `true` if
    /// this is the first subscriber (the caller, `ExprArena`, uses this to
    /// decide whether an `ExternalInterface::subscribe` call is owed).
    pub fn subscribe(&mut self, state: State, id: ExprId) -> bool {
        let entry = self.entries.entry(state).or_default();
        let was_empty = entry.subscribers.is_empty();
        entry.subscribers.insert(id);
        was_empty
    }

    /// Unregister `id`. Returns `true` if that was the last subscriber
    /// (caller should issue `ExternalInterface::unsubscribe`).
    pub fn unsubscribe(&mut self, state: &State, id: ExprId) -> bool {
        match self.entries.get_mut(state) {
            Some(entry) => {
                entry.subscribers.remove(&id);
                entry.subscribers.is_empty()
            }
            None => true,
        }
    }

    pub fn subscriber_count(&self, state: &State) -> usize {
        self.entries.get(state).map(|e| e.subscribers.len()).unwrap_or(0)
    }

    /// Apply an externally-reported value for `state` at `cycle`. No-ops
    /// (and returns no subscribers to wake) if `state` was already
    /// refreshed this cycle.
    pub fn set_value(&mut self, state: State, value: Value, cycle: u64) -> SmallVec<[ExprId; 8]> {
        let entry = self.entries.entry(state).or_default();
        if entry.refreshed_in_cycle == Some(cycle) {
            return SmallVec::new();
        }
        entry.value = value;
        entry.refreshed_in_cycle = Some(cycle);
        entry.subscribers.iter().copied().collect()
    }

    /// Numeric threshold pair for a `LookupOnChange`, used by
    /// `ExternalInterface::set_thresholds` (spec.md §6). A no-op when the
    /// state has no subscribers with numeric interest (SPEC_FULL.md Open
    /// Question resolution).
    pub fn set_thresholds(&mut self, state: State, low: f64, high: f64) {
        self.entries.entry(state).or_default().thresholds = Some((low, high));
    }

    pub fn thresholds(&self, state: &State) -> Option<(f64, f64)> {
        self.entries.get(state).and_then(|e| e.thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsubscribed_state_reads_as_unknown() {
        let cache = StateCache::default();
        assert_eq!(cache.current_value(&State::new("Battery", vec![])), Value::Unknown);
    }

    #[test]
    fn subscribe_reports_first_and_last() {
        let mut cache = StateCache::default();
        let s = State::new("Battery", vec![]);
        assert!(cache.subscribe(s.clone(), ExprId::from_raw(1)));
        assert!(!cache.subscribe(s.clone(), ExprId::from_raw(2)));
        assert!(!cache.unsubscribe(&s, ExprId::from_raw(1)));
        assert!(cache.unsubscribe(&s, ExprId::from_raw(2)));
    }

    #[test]
    fn second_update_in_same_cycle_is_dropped() {
        let mut cache = StateCache::default();
        let s = State::new("Battery", vec![]);
        cache.subscribe(s.clone(), ExprId::from_raw(1));
        let woken = cache.set_value(s.clone(), Value::Real(50.0), 0);
        assert_eq!(woken.len(), 1);
        let woken2 = cache.set_value(s.clone(), Value::Real(10.0), 0);
        assert!(woken2.is_empty());
        assert_eq!(cache.current_value(&s), Value::Real(50.0));
        let woken3 = cache.set_value(s, Value::Real(10.0), 1);
        assert_eq!(woken3.len(), 1);
    }
}
