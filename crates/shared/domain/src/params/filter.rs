//! Filter parameters.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::bunch::{Bunch, Fallback};
use crate::constants::LOOKUP_SEPARATOR;
use crate::error::{DomainError, DomainResult};
use crate::field::Field;

/// Comparison applied by one filter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOp {
    /// `field`: equal (or IS NULL for a null value)
    Exact,
    /// `field__ne`: not equal
    Ne,
    /// `field__in`: member of a list
    In,
    /// `field__min`: greater than or equal
    Min,
    /// `field__max`: less than or equal
    Max,
    /// `field__gt`: strictly greater
    Gt,
    /// `field__lt`: strictly less
    Lt,
    /// `field__isnull`: null check driven by a bool
    IsNull,
    /// `field__contains`: substring match
    Contains,
    /// `field__startswith`: prefix match
    StartsWith,
}

impl LookupOp {
    /// Parse an operator token (the part after `__`)
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "ne" => LookupOp::Ne,
            "in" => LookupOp::In,
            "min" => LookupOp::Min,
            "max" => LookupOp::Max,
            "gt" => LookupOp::Gt,
            "lt" => LookupOp::Lt,
            "isnull" => LookupOp::IsNull,
            "contains" => LookupOp::Contains,
            "startswith" => LookupOp::StartsWith,
            _ => return None,
        };
        Some(op)
    }

    pub fn token(&self) -> &'static str {
        match self {
            LookupOp::Exact => "",
            LookupOp::Ne => "ne",
            LookupOp::In => "in",
            LookupOp::Min => "min",
            LookupOp::Max => "max",
            LookupOp::Gt => "gt",
            LookupOp::Lt => "lt",
            LookupOp::IsNull => "isnull",
            LookupOp::Contains => "contains",
            LookupOp::StartsWith => "startswith",
        }
    }

    /// Shape the comparison value must have, if any
    fn expected(&self) -> Option<(&'static str, fn(&Value) -> bool)> {
        match self {
            LookupOp::In => Some(("array", Value::is_array)),
            LookupOp::IsNull => Some(("bool", Value::is_boolean)),
            LookupOp::Contains | LookupOp::StartsWith => Some(("string", Value::is_string)),
            _ => None,
        }
    }
}

/// A parsed filter key: field name plus operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub field: String,
    pub op: LookupOp,
}

impl Lookup {
    /// Parse `field[__op]`; unknown operator tokens are an error.
    pub fn parse(key: &str, owner: impl ToString) -> DomainResult<Self> {
        match key.rsplit_once(LOOKUP_SEPARATOR) {
            None => Ok(Self {
                field: key.to_string(),
                op: LookupOp::Exact,
            }),
            Some((field, token)) => match LookupOp::from_token(token) {
                Some(op) if !field.is_empty() => Ok(Self {
                    field: field.to_string(),
                    op,
                }),
                _ => Err(DomainError::UnknownLookup {
                    lookup: key.to_string(),
                    owner: owner.to_string(),
                }),
            },
        }
    }
}

/// Constraint mapping narrowing row selection.
///
/// Keys are `field[__op]`; absent keys read back as MISSING.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FilterParams(Bunch);

impl Default for FilterParams {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterParams {
    /// Empty filter (no constraint)
    pub fn new() -> Self {
        Self(Bunch::with_fallback(Fallback::Missing).named("FilterParams"))
    }

    /// Build from `(key, value)` pairs
    pub fn try_from_iter<K, V, I>(iter: I) -> DomainResult<Self>
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value)?;
        }
        Ok(params)
    }

    /// Chaining form of `insert`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> DomainResult<Self> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> DomainResult<Option<Value>> {
        self.0.insert(key, value)
    }

    /// Read a key; absent keys are MISSING
    pub fn get(&self, key: &str) -> Field {
        self.0
            .get_value(key)
            .cloned()
            .map(Field::Value)
            .unwrap_or(Field::Missing)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter()
    }

    /// Merge another filter in; `other` wins on key collision.
    pub fn merge(&mut self, other: &FilterParams) {
        self.0.merge(&other.0);
    }

    /// Consuming form of `merge`
    pub fn merged(mut self, other: &FilterParams) -> Self {
        self.merge(other);
        self
    }

    /// Parse every key into a lookup, checking the value shape per operator.
    pub fn lookups(&self) -> DomainResult<Vec<(Lookup, &Value)>> {
        self.iter()
            .map(|(key, value)| {
                let lookup = Lookup::parse(key, self)?;
                if let Some((expected, matches)) = lookup.op.expected() {
                    if !matches(value) {
                        return Err(DomainError::InvalidValue {
                            entity: "FilterParams".to_string(),
                            field: key.to_string(),
                            expected: expected.to_string(),
                            value: value.to_string(),
                        });
                    }
                }
                Ok((lookup, value))
            })
            .collect()
    }
}

impl TryFrom<Value> for FilterParams {
    type Error = DomainError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => FilterParams::try_from_iter(map),
            other => Err(DomainError::NotAnObject {
                owner: "FilterParams".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for FilterParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
