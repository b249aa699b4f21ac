//! Dynamic argument and result values.
//!
//! A substitute sees every argument as a [`Value`]. Values compare by
//! structural equality, and floats go through [`OrderedFloat`] so that the
//! whole model is `Eq + Hash + Ord`. [`ValueKind`] names the declared type
//! of a parameter or return slot; [`Fault`] is what a substitute "throws".

use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single argument or result value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// No value (void results, `null` in scenario files).
    Unit,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A float with a total order.
    Float(OrderedFloat<f64>),
    /// A string.
    Str(String),
    /// A list of values.
    List(Vec<Value>),
}

impl Value {
    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Unit => ValueKind::Unit,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::List(_) => ValueKind::List,
        }
    }

    /// Returns true if both values are the same variant.
    pub fn same_kind(&self, other: &Value) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Returns the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer payload, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(OrderedFloat(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// The declared type of a parameter or return slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Accepts any value; defaults to `Unit`.
    Any,
    /// The unit type (void).
    #[default]
    Unit,
    Bool,
    Int,
    Float,
    Str,
    List,
}

impl ValueKind {
    /// The value an unset setup returns for this kind.
    pub fn default_value(self) -> Value {
        match self {
            ValueKind::Any | ValueKind::Unit => Value::Unit,
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Int => Value::Int(0),
            ValueKind::Float => Value::Float(OrderedFloat(0.0)),
            ValueKind::Str => Value::Str(String::new()),
            ValueKind::List => Value::List(Vec::new()),
        }
    }

    /// Check if a value conforms to this kind.
    pub fn admits(self, value: &Value) -> bool {
        self == ValueKind::Any || value.kind() == self
    }

    /// Returns the lowercase name used in signatures and scenario files.
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Any => "any",
            ValueKind::Unit => "unit",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Str => "str",
            ValueKind::List => "list",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-level error raised by a predicate, a callback, or a throw setup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct Fault {
    /// A short classifier, e.g. `InvalidOperation`.
    pub kind: String,
    /// Human-readable detail.
    pub message: String,
}

impl Fault {
    /// Creates a new fault.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Fault raised when a typed argument accessor sees the wrong kind.
    pub fn argument_type(position: usize, expected: &str, found: &Value) -> Self {
        Self::new(
            "ArgumentType",
            format!(
                "argument {} is {}, expected {}",
                position,
                found.kind(),
                expected
            ),
        )
    }
}

/// Conversion from a borrowed [`Value`] into a Rust type.
pub trait FromValue: Sized {
    /// Name of the expected kind, used in fault messages.
    const EXPECTED: &'static str;

    /// Converts the value, or returns `None` if the kind does not fit.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    const EXPECTED: &'static str = "any";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(x.into_inner()),
            _ => None,
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "str";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Vec<Value> {
    const EXPECTED: &'static str = "list";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => Some(items.clone()),
            _ => None,
        }
    }
}

/// The arguments handed to a callback or factory.
///
/// Holds exactly as many leading call arguments as the callback declared.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    values: &'a [Value],
}

impl<'a> Args<'a> {
    /// Wraps an argument slice.
    pub fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    /// Number of arguments visible to the callback.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the callback sees no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the raw argument slice.
    pub fn as_slice(&self) -> &'a [Value] {
        self.values
    }

    /// Returns the argument at `position`, if present.
    pub fn get(&self, position: usize) -> Option<&'a Value> {
        self.values.get(position)
    }

    /// Extracts a typed argument.
    ///
    /// A missing position or a kind mismatch surfaces as an `ArgumentType`
    /// fault, which the dispatcher reports like any other callback fault.
    pub fn arg<T: FromValue>(&self, position: usize) -> Result<T, Fault> {
        let value = self.values.get(position).ok_or_else(|| {
            Fault::new(
                "ArgumentType",
                format!("argument {} is out of range ({} visible)", position, self.values.len()),
            )
        })?;
        T::from_value(value).ok_or_else(|| Fault::argument_type(position, T::EXPECTED, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(ValueKind::Bool.default_value(), Value::Bool(false));
        assert_eq!(ValueKind::Int.default_value(), Value::Int(0));
        assert_eq!(ValueKind::Str.default_value(), Value::Str(String::new()));
        assert_eq!(ValueKind::Unit.default_value(), Value::Unit);
        assert_eq!(ValueKind::Any.default_value(), Value::Unit);
    }

    #[test]
    fn test_admits() {
        assert!(ValueKind::Any.admits(&Value::from("x")));
        assert!(ValueKind::Str.admits(&Value::from("x")));
        assert!(!ValueKind::Int.admits(&Value::from("x")));
    }

    #[test]
    fn test_float_equality_is_total() {
        let nan = Value::from(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_ne!(Value::from(1.0), Value::from(1));
    }

    #[test]
    fn test_typed_args() {
        let values = vec![Value::from("a"), Value::from(5)];
        let args = Args::new(&values);

        assert_eq!(args.arg::<String>(0).unwrap(), "a");
        assert_eq!(args.arg::<i64>(1).unwrap(), 5);

        let err = args.arg::<bool>(1).unwrap_err();
        assert_eq!(err.kind, "ArgumentType");
        assert!(args.arg::<Value>(2).is_err());
    }

    #[test]
    fn test_display() {
        let list = Value::from(vec![Value::from(1), Value::from("two"), Value::Unit]);
        assert_eq!(list.to_string(), "[1, \"two\", ()]");
        assert_eq!(Fault::new("Boom", "it broke").to_string(), "Boom: it broke");
    }

    #[test]
    fn test_untagged_serde() {
        let v: Value = serde_json::from_str("[1, 2.5, \"x\", true, null]").unwrap();
        assert_eq!(
            v,
            Value::List(vec![
                Value::Int(1),
                Value::from(2.5),
                Value::from("x"),
                Value::Bool(true),
                Value::Unit,
            ])
        );
    }
}
