use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// An array of scalars with a parallel known-bitmap, so individual elements
/// may be `Unknown` even though the array itself is known (spec.md §3:
/// "Arrays carry a parallel known-bitmap so individual elements may be
/// Unknown").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueArray<T> {
    values: Vec<T>,
    known: Vec<bool>,
}

impl<T: Default + Clone> ValueArray<T> {
    /// A new array of `len` elements, all `Unknown`.
    pub fn new_unknown(len: usize) -> Self {
        ValueArray { values: vec![T::default(); len], known: vec![false; len] }
    }
}

impl<T: Clone> ValueArray<T> {
    pub fn from_known(values: Vec<T>) -> Self {
        let known = vec![true; values.len()];
        ValueArray { values, known }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Read element `i`. Returns `None` for an out-of-range or unknown
    /// index (spec.md §8 boundary behavior: "Array read at index < 0 or
    /// >= size returns Unknown").
    pub fn get(&self, i: usize) -> Option<&T> {
        if i >= self.values.len() || !self.known[i] {
            None
        } else {
            Some(&self.values[i])
        }
    }

    pub fn is_known_at(&self, i: usize) -> bool {
        i < self.known.len() && self.known[i]
    }

    /// Write element `i`. Caller (the mutable-array-reference write path
    /// in `plexil-expr`) is responsible for rejecting out-of-range writes
    /// as a contract violation per spec.md §8 ("... write) is an error").
    pub fn set(&mut self, i: usize, value: T) -> bool {
        if i >= self.values.len() {
            return false;
        }
        self.values[i] = value;
        self.known[i] = true;
        true
    }

    pub fn set_unknown(&mut self, i: usize) -> bool {
        if i >= self.known.len() {
            return false;
        }
        self.known[i] = false;
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&T>> {
        (0..self.values.len()).map(move |i| self.get(i))
    }
}

/// Exact (non-lenient) equality and total order, used for every element
/// type except `f64` (which has no total order and gets the lenient
/// comparator below).
macro_rules! exact_ord_impls {
    ($t:ty) => {
        impl PartialEq for ValueArray<$t> {
            fn eq(&self, other: &Self) -> bool {
                self.known == other.known && self.values == other.values
            }
        }
        impl Eq for ValueArray<$t> {}
        impl Ord for ValueArray<$t> {
            fn cmp(&self, other: &Self) -> Ordering {
                self.len().cmp(&other.len()).then_with(|| {
                    self.known
                        .cmp(&other.known)
                        .then_with(|| self.values.cmp(&other.values))
                })
            }
        }
        impl PartialOrd for ValueArray<$t> {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }
    };
}

exact_ord_impls!(bool);
exact_ord_impls!(i32);
exact_ord_impls!(arcstr::ArcStr);

impl<T: PartialOrd> ValueArray<T> {
    /// Non-`Ord` variant used for `RealArray`, since `f64` has no total
    /// order; ties resolve to `Equal` the same way scalar `Real` does.
    pub fn partial_cmp_lenient(&self, other: &Self) -> Ordering {
        if self.len() != other.len() {
            return self.len().cmp(&other.len());
        }
        for i in 0..self.len() {
            match (self.known.get(i), other.known.get(i)) {
                (Some(true), Some(true)) => {
                    if let Some(o) = self.values[i].partial_cmp(&other.values[i]) {
                        if o != Ordering::Equal {
                            return o;
                        }
                    }
                }
                (Some(a), Some(b)) if a != b => return a.cmp(b),
                _ => {}
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for ValueArray<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_array(self, f)
    }
}

impl fmt::Display for ValueArray<bool> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_array(self, f)
    }
}

impl fmt::Display for ValueArray<i32> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_array(self, f)
    }
}

impl fmt::Display for ValueArray<arcstr::ArcStr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_array(self, f)
    }
}

fn display_array<T: fmt::Display>(a: &ValueArray<T>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#(")?;
    for i in 0..a.len() {
        if i > 0 {
            write!(f, " ")?;
        }
        match a.get(i) {
            Some(v) => write!(f, "{v}")?,
            None => write!(f, "UNKNOWN")?,
        }
    }
    write!(f, ")")
}

// `RealArray` uses the partial-ordering-via-Equal-fallback comparator so the
// outer `Value` can still implement a total `Ord` (needed for `State` keys).
impl PartialOrd for ValueArray<f64> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.partial_cmp_lenient(other))
    }
}
impl Ord for ValueArray<f64> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp_lenient(other)
    }
}
impl PartialEq for ValueArray<f64> {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp_lenient(other) == Ordering::Equal
    }
}
impl Eq for ValueArray<f64> {}
