//! Entity schemas.
//!
//! A `Schema` is the named, ordered, fixed field set of one entity type.
//! Entities share their schema through an `Arc`, so building one is the
//! only place field names and kinds are validated.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::bunch::validate_key;
use crate::constants::DEFAULT_IDENTITY_FIELD;
use crate::error::{DomainError, DomainResult};

/// Kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Any,
    Bool,
    Integer,
    Float,
    Text,
    Json,
}

impl FieldKind {
    /// Check if a non-null value matches this kind
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::Any | FieldKind::Json => true,
            FieldKind::Bool => value.is_boolean(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Float => value.is_number(),
            FieldKind::Text => value.is_string(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Any => "any",
            FieldKind::Bool => "bool",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Text => "text",
            FieldKind::Json => "json",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of one entity field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    name: String,
    kind: FieldKind,
    nullable: bool,
    default: Option<Value>,
}

impl FieldDef {
    /// Field that must be supplied on construction
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            default: None,
        }
    }

    /// Field with a declared default
    pub fn optional(name: impl Into<String>, kind: FieldKind, default: impl Into<Value>) -> Self {
        let default = default.into();
        Self {
            nullable: default.is_null(),
            name: name.into(),
            kind,
            default: Some(default),
        }
    }

    /// Allow explicit null values
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// Validate a value assigned to this field of `entity`.
    pub fn check(&self, entity: &str, value: &Value) -> DomainResult<()> {
        let valid = if value.is_null() {
            self.nullable || self.kind == FieldKind::Any
        } else {
            self.kind.accepts(value)
        };
        if valid {
            return Ok(());
        }
        let expected = if self.nullable {
            format!("{} or null", self.kind)
        } else {
            self.kind.to_string()
        };
        Err(DomainError::InvalidValue {
            entity: entity.to_string(),
            field: self.name.clone(),
            expected,
            value: value.to_string(),
        })
    }
}

/// Named, ordered field set of an entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    fields: Vec<FieldDef>,
    identity: String,
}

impl Schema {
    /// Start building a schema for the entity type `name`
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            identity: DEFAULT_IDENTITY_FIELD.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Name of the identity field
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldDef::name)
    }

    /// Position of a field in declaration order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Position of the identity field
    pub fn identity_position(&self) -> usize {
        // identity presence is checked by the builder
        self.position(&self.identity).unwrap_or(0)
    }

    /// Resolve a field referenced by `owner`, failing on unknown names.
    pub fn check_field(&self, name: &str, owner: impl ToString) -> DomainResult<usize> {
        self.position(name)
            .ok_or_else(|| DomainError::unknown_field(name, owner))
    }
}

/// Builder for `Schema`.
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDef>,
    identity: String,
}

impl SchemaBuilder {
    /// Append a field declaration
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Use another field as identity (default `id`)
    pub fn identity(mut self, name: impl Into<String>) -> Self {
        self.identity = name.into();
        self
    }

    pub fn build(self) -> DomainResult<Arc<Schema>> {
        if self.fields.is_empty() {
            return Err(DomainError::invalid_schema(&self.name, "no fields declared"));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            validate_key(field.name())?;
            if !seen.insert(field.name()) {
                return Err(DomainError::invalid_schema(
                    &self.name,
                    format!("duplicate field '{}'", field.name()),
                ));
            }
            if let Some(default) = field.default() {
                field.check(&self.name, default)?;
            }
        }

        if !seen.contains(self.identity.as_str()) {
            return Err(DomainError::invalid_schema(
                &self.name,
                format!("identity field '{}' is not declared", self.identity),
            ));
        }

        Ok(Arc::new(Schema {
            name: self.name,
            fields: self.fields,
            identity: self.identity,
        }))
    }
}
