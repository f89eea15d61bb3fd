//! Query policies.
//!
//! Filter and sort keys come from callers and end up in SQL, so each
//! concrete repository decides which fields may be filtered or sorted on.
//! `Unrestricted` accepts any declared field and is meant for trusted
//! callers only; untrusted input goes through an `AllowList`.

use std::collections::HashSet;

use domain::{DomainError, DomainResult, FilterParams, Lookup, Schema, SortKey, SortingParams};
use once_cell::sync::OnceCell;

/// Validation hooks run on every filter lookup and sort key.
///
/// Field existence is already checked against the schema when a hook runs.
pub trait QueryPolicy: Send + Sync + 'static {
    fn check_filter(
        &self,
        _schema: &Schema,
        _lookup: &Lookup,
        _params: &FilterParams,
    ) -> DomainResult<()> {
        Ok(())
    }

    fn check_sort(
        &self,
        _schema: &Schema,
        _key: &SortKey,
        _params: &SortingParams,
    ) -> DomainResult<()> {
        Ok(())
    }
}

static UNRESTRICTED_WARNING: OnceCell<()> = OnceCell::new();

/// Accepts every declared field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

impl QueryPolicy for Unrestricted {
    fn check_filter(
        &self,
        schema: &Schema,
        _lookup: &Lookup,
        _params: &FilterParams,
    ) -> DomainResult<()> {
        UNRESTRICTED_WARNING.get_or_init(|| {
            tracing::warn!(
                entity = schema.name(),
                "Filtering without an allow-list; do not expose this repository to untrusted input"
            );
        });
        Ok(())
    }
}

/// Explicit sets of filterable and sortable fields.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    filterable: HashSet<String>,
    sortable: HashSet<String>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow filtering on `fields` (any lookup operator)
    pub fn filter_on<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filterable.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Allow sorting on `fields` (either direction)
    pub fn sort_on<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sortable.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn is_filterable(&self, field: &str) -> bool {
        self.filterable.contains(field)
    }

    pub fn is_sortable(&self, field: &str) -> bool {
        self.sortable.contains(field)
    }
}

impl QueryPolicy for AllowList {
    fn check_filter(
        &self,
        _schema: &Schema,
        lookup: &Lookup,
        params: &FilterParams,
    ) -> DomainResult<()> {
        if self.is_filterable(&lookup.field) {
            Ok(())
        } else {
            Err(DomainError::not_allowed(&lookup.field, params))
        }
    }

    fn check_sort(&self, _schema: &Schema, key: &SortKey, params: &SortingParams) -> DomainResult<()> {
        if self.is_sortable(&key.field) {
            Ok(())
        } else {
            Err(DomainError::not_allowed(&key.field, params))
        }
    }
}
