//! SNUG value representation.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// A SNUG value.
///
/// Objects preserve key insertion order, which is the textual order of the
/// source document. `Null` and `Undefined` are distinct values.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Undefined value. Distinct from `Null`.
    Undefined,
    /// Boolean value.
    Bool(bool),
    /// 64-bit floating-point number.
    Number(f64),
    /// UTF-8 string.
    String(String),
    /// Timestamp with millisecond resolution.
    Date(DateTime<Utc>),
    /// Array of values.
    Array(Vec<Value>),
    /// Object (insertion-ordered key-value map).
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Returns `true` if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns `true` if this value is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns `true` if this value is an object.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Returns the boolean value if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the numeric value if this is a `Number`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the timestamp if this is a `Date`.
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns a reference to the array if this is an `Array`.
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Returns a reference to the object if this is an `Object`.
    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Deep copy of this value with every `Date` replaced by its ISO-8601
    /// string form (millisecond precision, `Z` suffix). All other scalars
    /// copy unchanged; arrays and objects copy structurally.
    pub fn to_plain(&self) -> Value {
        match self {
            Value::Date(d) => Value::String(iso_timestamp(d)),
            Value::Array(arr) => Value::Array(arr.iter().map(Value::to_plain).collect()),
            Value::Object(obj) => Value::Object(
                obj.iter()
                    .map(|(k, v)| (k.clone(), v.to_plain()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

/// Format a timestamp as ISO-8601 with millisecond precision and `Z` suffix.
pub(crate) fn iso_timestamp(d: &DateTime<Utc>) -> String {
    d.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(arr: Vec<Value>) -> Self {
        Value::Array(arr)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(obj: IndexMap<String, Value>) -> Self {
        Value::Object(obj)
    }
}
