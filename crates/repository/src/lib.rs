//! Repository layer - data access abstraction.
//!
//! `Repository` is the backend-agnostic contract: count, list, create,
//! update and delete driven by filter / scope / sort / slice parameters.
//! `RelationalRepo` realises it over a sea-orm entity, taking exclusive
//! row locks for every bulk mutation.

pub mod contract;
pub mod db;
pub mod policy;
pub mod relational;

pub use contract::Repository;
pub use db::Database;
pub use policy::{AllowList, QueryPolicy, Unrestricted};
pub use relational::RelationalRepo;

// Export mock for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use contract::MockRepo;
