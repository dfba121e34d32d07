//! The tagged value and type system shared by every layer of the PLEXIL
//! quiescence engine: [`Value`] is the single currency that flows through
//! the expression graph, node conditions, and the external interface.

mod array;
mod enums;
mod state;

pub use array::ValueArray;
pub use enums::{CommandHandle, FailureType, NodeOutcome, NodeState};
pub use state::State;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// The scalar + array-of-scalar + internal-enumeration type set a [`Value`]
/// may carry, plus the distinguished absence of a type for `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    Int,
    Real,
    String,
    NodeState,
    NodeOutcome,
    FailureType,
    CommandHandle,
    BoolArray,
    IntArray,
    RealArray,
    StringArray,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueType::Bool => "Bool",
            ValueType::Int => "Int",
            ValueType::Real => "Real",
            ValueType::String => "String",
            ValueType::NodeState => "NodeState",
            ValueType::NodeOutcome => "NodeOutcome",
            ValueType::FailureType => "FailureType",
            ValueType::CommandHandle => "CommandHandle",
            ValueType::BoolArray => "BoolArray",
            ValueType::IntArray => "IntArray",
            ValueType::RealArray => "RealArray",
            ValueType::StringArray => "StringArray",
        };
        f.write_str(s)
    }
}

/// A discriminated union over the PLEXIL value domain, with a distinguished
/// `Unknown` state distinct from any in-type value (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Unknown,
    Bool(bool),
    Int(i32),
    Real(f64),
    String(ArcStr),
    NodeState(NodeState),
    NodeOutcome(NodeOutcome),
    FailureType(FailureType),
    CommandHandle(CommandHandle),
    BoolArray(ValueArray<bool>),
    IntArray(ValueArray<i32>),
    RealArray(ValueArray<f64>),
    StringArray(ValueArray<ArcStr>),
}

/// Error raised by [`Value`] operations that have no sensible fallback
/// (type-mismatched comparisons, casts between incompatible types). These
/// correspond to "plan error"/"contract violation" class faults per
/// spec.md §7, never to a runtime outcome.
#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: ValueType, found: ValueType },
    #[error("no implicit conversion from {from} to {to}")]
    NoPromotion { from: ValueType, to: ValueType },
}

impl Value {
    /// The `ValueType` of this value, or `None` if the value is `Unknown`
    /// (Unknown carries no type information of its own).
    pub fn value_type(&self) -> Option<ValueType> {
        Some(match self {
            Value::Unknown => return None,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Real(_) => ValueType::Real,
            Value::String(_) => ValueType::String,
            Value::NodeState(_) => ValueType::NodeState,
            Value::NodeOutcome(_) => ValueType::NodeOutcome,
            Value::FailureType(_) => ValueType::FailureType,
            Value::CommandHandle(_) => ValueType::CommandHandle,
            Value::BoolArray(_) => ValueType::BoolArray,
            Value::IntArray(_) => ValueType::IntArray,
            Value::RealArray(_) => ValueType::RealArray,
            Value::StringArray(_) => ValueType::StringArray,
        })
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Value::Unknown)
    }

    /// Apply the single permitted implicit conversion (Integer -> Real).
    /// Any other attempt to promote across types is an error; spec.md §3:
    /// "A limited promotion applies: Integer->Real is implicit; no other
    /// cross-type conversions."
    pub fn promote_to_real(&self) -> Result<f64, ValueError> {
        match self {
            Value::Real(r) => Ok(*r),
            Value::Int(i) => Ok(*i as f64),
            Value::Unknown => Ok(f64::NAN), // caller must check is_known first
            other => Err(ValueError::NoPromotion {
                from: other.value_type().unwrap_or(ValueType::Real),
                to: ValueType::Real,
            }),
        }
    }

    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(ValueError::TypeMismatch {
                expected: ValueType::Bool,
                found: other.value_type().unwrap_or(ValueType::Bool),
            }),
        }
    }
}

/// Equality matches the §8 round-trip law: `Unknown == Unknown`, and two
/// known values are equal iff same type and same content. This is *not*
/// the three-valued logic used by the `==` *operator* expression in the
/// plan language (which yields Unknown when either side is Unknown) --
/// that lives in `plexil-expr`'s operator nodes, built on top of this.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unknown, Value::Unknown) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::NodeState(a), Value::NodeState(b)) => a == b,
            (Value::NodeOutcome(a), Value::NodeOutcome(b)) => a == b,
            (Value::FailureType(a), Value::FailureType(b)) => a == b,
            (Value::CommandHandle(a), Value::CommandHandle(b)) => a == b,
            (Value::BoolArray(a), Value::BoolArray(b)) => a == b,
            (Value::IntArray(a), Value::IntArray(b)) => a == b,
            (Value::RealArray(a), Value::RealArray(b)) => a == b,
            (Value::StringArray(a), Value::StringArray(b)) => a == b,
            // Int/Real cross comparison uses the implicit promotion.
            (Value::Int(a), Value::Real(b)) => (*a as f64) == *b,
            (Value::Real(a), Value::Int(b)) => *a == (*b as f64),
            _ => false,
        }
    }
}

/// A total order over `Value`, required so `State` (name, params) can be
/// used as a map/set key (spec.md §3). Cross-variant ordering is by
/// discriminant rank; this is an engineering convenience, not a
/// plan-visible comparison operator.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for Value {}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Unknown => 0,
                Value::Bool(_) => 1,
                Value::Int(_) => 2,
                Value::Real(_) => 3,
                Value::String(_) => 4,
                Value::NodeState(_) => 5,
                Value::NodeOutcome(_) => 6,
                Value::FailureType(_) => 7,
                Value::CommandHandle(_) => 8,
                Value::BoolArray(_) => 9,
                Value::IntArray(_) => 10,
                Value::RealArray(_) => 11,
                Value::StringArray(_) => 12,
            }
        }
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Real(a), Value::Real(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Value::Int(a), Value::Real(b)) => {
                (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Value::Real(a), Value::Int(b)) => {
                a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::NodeState(a), Value::NodeState(b)) => a.cmp(b),
            (Value::NodeOutcome(a), Value::NodeOutcome(b)) => a.cmp(b),
            (Value::FailureType(a), Value::FailureType(b)) => a.cmp(b),
            (Value::CommandHandle(a), Value::CommandHandle(b)) => a.cmp(b),
            (Value::BoolArray(a), Value::BoolArray(b)) => a.cmp(b),
            (Value::IntArray(a), Value::IntArray(b)) => a.cmp(b),
            (Value::RealArray(a), Value::RealArray(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Value::StringArray(a), Value::StringArray(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unknown => write!(f, "UNKNOWN"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::String(s) => write!(f, "{s}"),
            Value::NodeState(s) => write!(f, "{s}"),
            Value::NodeOutcome(o) => write!(f, "{o}"),
            Value::FailureType(t) => write!(f, "{t}"),
            Value::CommandHandle(h) => write!(f, "{h}"),
            Value::BoolArray(a) => write!(f, "{a}"),
            Value::IntArray(a) => write!(f, "{a}"),
            Value::RealArray(a) => write!(f, "{a}"),
            Value::StringArray(a) => write!(f, "{a}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_equals_unknown() {
        assert_eq!(Value::Unknown, Value::Unknown);
    }

    #[test]
    fn int_real_promotion_compares_equal() {
        assert_eq!(Value::Int(3), Value::Real(3.0));
    }

    #[test]
    fn serde_round_trip_preserves_equality() {
        for v in [
            Value::Unknown,
            Value::Bool(true),
            Value::Int(-7),
            Value::Real(2.5),
            Value::String("hello".into()),
            Value::NodeState(NodeState::Executing),
        ] {
            let bytes = serde_json::to_string(&v).unwrap();
            let back: Value = serde_json::from_str(&bytes).unwrap();
            assert_eq!(v, back, "round trip changed value");
        }
    }

    #[test]
    fn type_mismatch_is_an_error_not_a_panic() {
        let e = Value::String("x".into()).as_bool().unwrap_err();
        assert!(matches!(e, ValueError::TypeMismatch { .. }));
    }
}
