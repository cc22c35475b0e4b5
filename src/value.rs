//! # Value Kinds
//!
//! Helpers over `serde_json::Value`, which doubles as the runtime value
//! model: validation input, enum members, defaults and examples all use it.

use derive_more::Display;
use serde_json::{Number, Value};

/// The closed set of runtime value kinds.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// JSON `null`.
    #[display("null")]
    Null,
    /// `true` / `false`.
    #[display("boolean")]
    Bool,
    /// Any numeric value; integer-ness is a property, not a kind.
    #[display("number")]
    Number,
    /// A text value.
    #[display("string")]
    String,
    /// An ordered sequence.
    #[display("array")]
    Array,
    /// A string-keyed mapping.
    #[display("object")]
    Object,
}

impl ValueKind {
    /// Returns the kind of a value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }
}

/// Returns true when a numeric value carries no fractional part.
///
/// Integer schemas accept `2.0` but reject `2.5`.
pub(crate) fn is_integral(number: &Number) -> bool {
    if number.is_i64() || number.is_u64() {
        return true;
    }
    number
        .as_f64()
        .map_or(false, |f| f.is_finite() && f.fract() == 0.0)
}

/// Deep equality where numeric comparison ignores representation
/// (`1`, `1.0` and `1u64` are all equal).
///
/// Used for `enum` membership and `uniqueItems`.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            // Insertion order is irrelevant for equality.
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).map_or(false, |y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
