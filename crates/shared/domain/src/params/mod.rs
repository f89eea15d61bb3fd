//! Query parameter descriptors.
//!
//! All four are transient values built per call: what subset (`filter`),
//! which fields (`scoping`), in what order (`sorting`) and which window
//! (`slicing`) a repository operation works on.

mod filter;
mod scoping;
mod slicing;
mod sorting;

pub use filter::{FilterParams, Lookup, LookupOp};
pub use scoping::ScopingParams;
pub use slicing::SlicingParams;
pub use sorting::{SortKey, SortingParams};
