//! Named mapping with validated keys.
//!
//! A `Bunch` is an ordered `key -> value` mapping whose keys must be valid
//! identifiers. The `Fallback` decides what an absent key reads back as,
//! which covers the strict, default (MISSING), null and constant-default
//! flavours with one type.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::constants::is_reserved_keyword;
use crate::error::{DomainError, DomainResult};
use crate::field::Field;

static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("key pattern is valid"));

/// Validate a key (or field name).
pub fn validate_key(key: &str) -> DomainResult<()> {
    if !KEY_PATTERN.is_match(key) || is_reserved_keyword(key) {
        return Err(DomainError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Read-back policy for absent keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Fallback {
    /// Absent key is an error
    #[default]
    Raise,
    /// Absent key reads as MISSING
    Missing,
    /// Absent key reads as explicit null
    Null,
    /// Absent key reads as the given value
    Value(Value),
}

/// Ordered mapping of validated keys to JSON values.
#[derive(Debug, Clone, PartialEq)]
pub struct Bunch {
    name: &'static str,
    fallback: Fallback,
    items: Map<String, Value>,
}

impl Default for Bunch {
    fn default() -> Self {
        Self::new()
    }
}

impl Bunch {
    /// Create an empty strict bunch
    pub fn new() -> Self {
        Self {
            name: "Bunch",
            fallback: Fallback::Raise,
            items: Map::new(),
        }
    }

    /// Create an empty bunch with the given fallback
    pub fn with_fallback(fallback: Fallback) -> Self {
        Self {
            fallback,
            ..Self::new()
        }
    }

    /// Rename the bunch (used by `Display` and error messages)
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Build from `(key, value)` pairs, validating every key.
    pub fn try_from_iter<K, V, I>(iter: I) -> DomainResult<Self>
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut bunch = Self::new();
        for (key, value) in iter {
            bunch.insert(key, value)?;
        }
        Ok(bunch)
    }

    /// Name of this mapping
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read-back policy for absent keys
    pub fn fallback(&self) -> &Fallback {
        &self.fallback
    }

    /// Insert a value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> DomainResult<Option<Value>> {
        let key = key.into();
        validate_key(&key)?;
        Ok(self.items.insert(key, value.into()))
    }

    /// Read a key, applying the fallback when it is absent.
    pub fn get(&self, key: &str) -> DomainResult<Field> {
        if let Some(value) = self.items.get(key) {
            return Ok(Field::Value(value.clone()));
        }
        match &self.fallback {
            Fallback::Raise => Err(DomainError::UnknownKey {
                key: key.to_string(),
                owner: self.to_string(),
            }),
            Fallback::Missing => Ok(Field::Missing),
            Fallback::Null => Ok(Field::Value(Value::Null)),
            Fallback::Value(value) => Ok(Field::Value(value.clone())),
        }
    }

    /// Borrow a stored value without applying the fallback
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.items.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.items.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.items.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Merge another mapping into this one; `other` wins on collision.
    pub fn merge(&mut self, other: &Bunch) {
        for (key, value) in other.items.iter() {
            self.items.insert(key.clone(), value.clone());
        }
    }

    /// Consuming form of `merge`
    pub fn merged(mut self, other: &Bunch) -> Self {
        self.merge(other);
        self
    }

    /// Borrow the underlying ordered map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.items
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.items
    }
}

impl TryFrom<Value> for Bunch {
    type Error = DomainError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Bunch::try_from_iter(map),
            other => Err(DomainError::NotAnObject {
                owner: "Bunch".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl Serialize for Bunch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl fmt::Display for Bunch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.items.keys().collect();
        keys.sort();
        let body = keys
            .into_iter()
            .map(|key| format!("'{}': {}", key, self.items[key.as_str()]))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({{{}}})", self.name, body)
    }
}
