//! Slicing parameters.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Window over an ordered result: skip `offset` rows, take `limit` rows.
///
/// `None` means no offset / no limit. A limit of 0 selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlicingParams {
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}

impl SlicingParams {
    pub fn new(offset: Option<u64>, limit: Option<u64>) -> Self {
        Self { offset, limit }
    }

    /// First `limit` rows
    pub fn limit(limit: u64) -> Self {
        Self::new(None, Some(limit))
    }

    /// Everything after the first `offset` rows
    pub fn offset(offset: u64) -> Self {
        Self::new(Some(offset), None)
    }

    /// `limit` rows starting at `offset`
    pub fn window(offset: u64, limit: u64) -> Self {
        Self::new(Some(offset), Some(limit))
    }

    /// One-based page of `per_page` rows, capped at `MAX_PAGE_SIZE`.
    ///
    /// A zero `per_page` falls back to `DEFAULT_PAGE_SIZE`.
    pub fn page(page: u64, per_page: u64) -> Self {
        let per_page = match per_page {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        };
        Self::window(page.saturating_sub(1).saturating_mul(per_page), per_page)
    }

    /// Offset to apply, zero treated as none
    pub fn effective_offset(&self) -> Option<u64> {
        self.offset.filter(|offset| *offset > 0)
    }

    /// True when the window selects every row
    pub fn is_unbounded(&self) -> bool {
        self.effective_offset().is_none() && self.limit.is_none()
    }
}
