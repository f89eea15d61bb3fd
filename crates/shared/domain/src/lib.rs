//! Domain layer - record shapes and query parameters.
//!
//! This crate contains the data model moving through the repository layer
//! with no infrastructure dependencies:
//! - named mappings with a MISSING sentinel (`bunch`, `field`)
//! - entity schemas, full and partial entities (`schema`, `entity`)
//! - filter / scope / sort / slice descriptors (`params`)

pub mod bunch;
pub mod constants;
pub mod entity;
pub mod error;
pub mod field;
pub mod params;
pub mod schema;

pub use bunch::{Bunch, Fallback};
pub use constants::*;
pub use entity::{Entity, EntityBuilder, Item, ParaEntity, Record};
pub use error::{DomainError, DomainResult};
pub use field::{Field, MISSING};
pub use params::{
    FilterParams, Lookup, LookupOp, ScopingParams, SlicingParams, SortKey, SortingParams,
};
pub use schema::{FieldDef, FieldKind, Schema, SchemaBuilder};
