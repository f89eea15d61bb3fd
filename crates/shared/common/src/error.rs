//! Unified error handling.
//!
//! Configuration mistakes (unknown fields, bad lookups, wrong value kinds)
//! arrive as `DomainError` and are kept intact. Backend failures pass
//! through unmodified inside `AppError::Database`.

use domain::DomainError;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller supplied parameters or records the schema rejects
    #[error(transparent)]
    Configuration(#[from] DomainError),

    #[error("{0}")]
    Validation(String),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get user-facing message (hides backend details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Configuration(err) => err.to_string(),
            AppError::Validation(msg) => msg.clone(),

            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
        }
    }

    /// Domain error carried by a configuration failure
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            AppError::Configuration(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, AppError::Configuration(_))
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Convenience constructors
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
