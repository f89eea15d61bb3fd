//! Scoping parameters.

use std::fmt;

use crate::error::DomainResult;
use crate::schema::Schema;

/// Ordered set of field names to load.
///
/// Reads with a scope return partial entities carrying exactly these fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopingParams {
    attrs: Vec<String>,
}

impl ScopingParams {
    /// Create from field names; duplicates are dropped, first position wins.
    pub fn new<I, S>(attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for attr in attrs {
            let attr = attr.into();
            if !unique.contains(&attr) {
                unique.push(attr);
            }
        }
        Self { attrs: unique }
    }

    pub fn attrs(&self) -> &[String] {
        &self.attrs
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attrs.iter().any(|attr| attr == name)
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Resolve every attr against `schema`, returning field positions.
    ///
    /// An empty scope selects every field.
    pub fn resolve(&self, schema: &Schema) -> DomainResult<Vec<usize>> {
        if self.attrs.is_empty() {
            return Ok((0..schema.fields().len()).collect());
        }
        self.attrs
            .iter()
            .map(|attr| schema.check_field(attr, self))
            .collect()
    }
}

impl fmt::Display for ScopingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attrs = self
            .attrs
            .iter()
            .map(|attr| format!("'{attr}'"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "ScopingParams(attrs=[{attrs}])")
    }
}
