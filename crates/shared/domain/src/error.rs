//! Domain-level errors.
//!
//! These errors are configuration mistakes made by the caller: unknown or
//! malformed names, missing required fields, values of the wrong kind.
//! They are independent of infrastructure concerns (database, transport).

use thiserror::Error;

/// Domain-specific errors for invalid record shapes and parameters.
///
/// Every variant names the offending field (or key) and the object it
/// was referenced from, so integration mistakes are diagnosable at once.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Key is not a valid identifier
    #[error(
        "Invalid key: '{0}'. Only letters, digits and underscores are allowed, \
         the first char can not be a digit. Reserved words like 'type', 'fn' \
         are not allowed, use 'type_', 'fn_' instead"
    )]
    InvalidKey(String),

    /// Key read from a strict mapping that does not hold it
    #[error("{owner} has no key '{key}'")]
    UnknownKey { key: String, owner: String },

    /// Field name not declared by the entity schema
    #[error("Unknown field '{field}' referenced by {owner}")]
    UnknownField { field: String, owner: String },

    /// Required field not supplied on construction
    #[error("{entity}.{field} is required")]
    MissingField { entity: String, field: String },

    /// Value does not match the declared field kind
    #[error("Invalid value for {entity}.{field}: expected {expected}, got {value}")]
    InvalidValue {
        entity: String,
        field: String,
        expected: String,
        value: String,
    },

    /// Lookup operator token not recognised
    #[error("Unknown lookup '{lookup}' in {owner}")]
    UnknownLookup { lookup: String, owner: String },

    /// Field exists but the query policy refuses it
    #[error("Field '{field}' is not allowed in {owner}")]
    NotAllowed { field: String, owner: String },

    /// Mapping built from something that is not a JSON object
    #[error("{owner} expects a JSON object, got {value}")]
    NotAnObject { owner: String, value: String },

    /// Schema definition is inconsistent
    #[error("Invalid schema {entity}: {reason}")]
    InvalidSchema { entity: String, reason: String },
}

impl DomainError {
    /// Create an unknown field error
    pub fn unknown_field(field: impl Into<String>, owner: impl ToString) -> Self {
        DomainError::UnknownField {
            field: field.into(),
            owner: owner.to_string(),
        }
    }

    /// Create a not allowed error
    pub fn not_allowed(field: impl Into<String>, owner: impl ToString) -> Self {
        DomainError::NotAllowed {
            field: field.into(),
            owner: owner.to_string(),
        }
    }

    /// Create a missing required field error
    pub fn missing_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        DomainError::MissingField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create an invalid schema error
    pub fn invalid_schema(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::InvalidSchema {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field or key, when the error has one
    pub fn field(&self) -> Option<&str> {
        match self {
            DomainError::InvalidKey(key) => Some(key),
            DomainError::UnknownKey { key, .. } => Some(key),
            DomainError::UnknownField { field, .. }
            | DomainError::MissingField { field, .. }
            | DomainError::InvalidValue { field, .. }
            | DomainError::NotAllowed { field, .. } => Some(field),
            DomainError::UnknownLookup { lookup, .. } => Some(lookup),
            DomainError::NotAnObject { .. } | DomainError::InvalidSchema { .. } => None,
        }
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
