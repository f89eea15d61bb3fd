//! Tri-state field value.

use std::fmt;

use serde_json::Value;

/// Value of a declared field: supplied (possibly explicit null) or MISSING.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Field declared but never supplied
    Missing,
    /// Supplied value, `Value::Null` being the explicit-null state
    Value(Value),
}

/// The MISSING sentinel
pub const MISSING: Field = Field::Missing;

impl Field {
    /// Check if the field was not supplied
    pub fn is_missing(&self) -> bool {
        matches!(self, Field::Missing)
    }

    /// Check if the field holds a value (including explicit null)
    pub fn is_present(&self) -> bool {
        !self.is_missing()
    }

    /// Check if the field holds an explicit null
    pub fn is_null(&self) -> bool {
        matches!(self, Field::Value(Value::Null))
    }

    /// Borrow the supplied value
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Missing => None,
            Field::Value(value) => Some(value),
        }
    }

    /// Take the supplied value
    pub fn into_value(self) -> Option<Value> {
        match self {
            Field::Missing => None,
            Field::Value(value) => Some(value),
        }
    }

    /// Boolean reading: MISSING, null, false, zero and empty values are falsy
    pub fn is_truthy(&self) -> bool {
        match self {
            Field::Missing => false,
            Field::Value(value) => match value {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
                Value::String(s) => !s.is_empty(),
                Value::Array(items) => !items.is_empty(),
                Value::Object(map) => !map.is_empty(),
            },
        }
    }
}

impl From<Option<Value>> for Field {
    fn from(value: Option<Value>) -> Self {
        value.map(Field::Value).unwrap_or(Field::Missing)
    }
}

impl PartialEq<Value> for Field {
    fn eq(&self, other: &Value) -> bool {
        match self {
            Field::Missing => false,
            Field::Value(value) => value == other,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Missing => write!(f, "MISSING"),
            Field::Value(value) => write!(f, "{}", value),
        }
    }
}
