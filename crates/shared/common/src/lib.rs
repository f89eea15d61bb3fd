//! Common utilities shared by the repository crates.
//!
//! This crate provides:
//! - Unified error handling (`AppError`)
//! - Configuration loaded from the environment
//! - Tracing subscriber initialisation

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::*;
pub use error::{AppError, AppResult};
