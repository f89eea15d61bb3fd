//! Sorting parameters.

use std::fmt;

use crate::constants::DESCENDING_PREFIX;
use crate::error::DomainResult;
use crate::schema::Schema;

/// One ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// Parse `field` or `-field`
    pub fn parse(key: &str) -> Self {
        match key.strip_prefix(DESCENDING_PREFIX) {
            Some(field) => Self::desc(field),
            None => Self::asc(key),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "{}{}", DESCENDING_PREFIX, self.field)
        } else {
            f.write_str(&self.field)
        }
    }
}

/// Ordered sort keys, `-` prefix meaning descending.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortingParams {
    by: Vec<String>,
}

impl SortingParams {
    pub fn new<I, S>(by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            by: by.into_iter().map(Into::into).collect(),
        }
    }

    pub fn by(&self) -> &[String] {
        &self.by
    }

    pub fn is_empty(&self) -> bool {
        self.by.is_empty()
    }

    pub fn keys(&self) -> Vec<SortKey> {
        self.by.iter().map(|key| SortKey::parse(key)).collect()
    }

    /// Parse every key, checking its field (sans `-`) exists in `schema`.
    pub fn resolve(&self, schema: &Schema) -> DomainResult<Vec<SortKey>> {
        self.keys()
            .into_iter()
            .map(|key| {
                schema.check_field(&key.field, self)?;
                Ok(key)
            })
            .collect()
    }
}

impl fmt::Display for SortingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let by = self
            .by
            .iter()
            .map(|key| format!("'{key}'"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "SortingParams(by=[{by}])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use crate::schema::{FieldDef, FieldKind};

    #[test]
    fn test_parse_direction() {
        assert_eq!(SortKey::parse("id"), SortKey::asc("id"));
        assert_eq!(SortKey::parse("-id"), SortKey::desc("id"));
        assert_eq!(SortKey::desc("id").to_string(), "-id");
    }

    #[test]
    fn test_resolve_checks_fields() {
        let schema = Schema::builder("User")
            .field(FieldDef::required("id", FieldKind::Integer))
            .field(FieldDef::required("username", FieldKind::Text))
            .build()
            .unwrap();

        let sorting = SortingParams::new(["-username", "id"]);
        assert_eq!(
            sorting.resolve(&schema).unwrap(),
            vec![SortKey::desc("username"), SortKey::asc("id")]
        );

        let sorting = SortingParams::new(["-age"]);
        assert_eq!(
            sorting.resolve(&schema).unwrap_err(),
            DomainError::UnknownField {
                field: "age".to_string(),
                owner: "SortingParams(by=['-age'])".to_string(),
            }
        );
    }
}
