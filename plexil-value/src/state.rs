use crate::Value;
use arcstr::ArcStr;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `(name, params)`, the key used for state-cache entries, subscriptions,
/// and threshold registrations (spec.md §3). Carries a total order so it
/// can key an ordered map; `ArcStr` for the name matches the teacher's
/// (`graphix`) preference for cheap-clone interned-like strings over
/// `String` on hot paths.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct State {
    pub name: ArcStr,
    pub params: Vec<Value>,
}

impl State {
    pub fn new(name: impl Into<ArcStr>, params: Vec<Value>) -> Self {
        State { name: name.into(), params }
    }

    /// The special state naming the current time source (spec.md §3:
    /// "The special state `time()` is the current time source.").
    pub fn time() -> Self {
        State::new("time", Vec::new())
    }

    pub fn is_time(&self) -> bool {
        self.name == "time" && self.params.is_empty()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ")")
    }
}
