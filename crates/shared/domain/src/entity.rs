//! Full and partial entities.
//!
//! Both shapes store one `Field` per schema field, in declaration order.
//! They differ only in what construction demands:
//! - `Entity`: every required field supplied (explicit MISSING allowed),
//!   optional fields fall back to their declared default
//! - `ParaEntity`: only the identity field supplied, everything else
//!   reads as MISSING until set
//!
//! The `Record` trait is the capability interface the repository layer
//! works against, so it never needs to know which shape it holds.

use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{DomainError, DomainResult};
use crate::field::Field;
use crate::schema::Schema;

/// Read access shared by every record shape.
pub trait Record {
    /// Schema the record was built against
    fn schema(&self) -> &Arc<Schema>;

    /// Field values in schema order
    fn values(&self) -> &[Field];

    /// Partial records may hold MISSING for any non-identity field
    fn is_partial(&self) -> bool;

    /// Read a field by name; unknown names are an error.
    fn get(&self, name: &str) -> DomainResult<&Field> {
        let schema = self.schema();
        let position = schema.check_field(name, schema.name())?;
        Ok(&self.values()[position])
    }

    /// Identity field value
    fn id(&self) -> &Field {
        &self.values()[self.schema().identity_position()]
    }

    /// Supplied fields as `(name, value)` pairs, in schema order
    fn present(&self) -> Vec<(&str, &Value)> {
        self.schema()
            .field_names()
            .zip(self.values())
            .filter_map(|(name, field)| field.as_value().map(|value| (name, value)))
            .collect()
    }

    /// JSON object of the supplied fields
    fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .present()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        Value::Object(map)
    }
}

fn assign(schema: &Schema, values: &mut [Field], name: &str, value: Value) -> DomainResult<()> {
    let position = schema.check_field(name, schema.name())?;
    schema.fields()[position].check(schema.name(), &value)?;
    values[position] = Field::Value(value);
    Ok(())
}

fn json_pairs(owner: &str, value: Value) -> DomainResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DomainError::NotAnObject {
            owner: owner.to_string(),
            value: other.to_string(),
        }),
    }
}

// =============================================================================
// Entity
// =============================================================================

/// Full entity: every declared field holds a value or an explicit MISSING.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    schema: Arc<Schema>,
    values: Vec<Field>,
}

impl Entity {
    /// Start building an entity of `schema`
    pub fn builder(schema: &Arc<Schema>) -> EntityBuilder {
        EntityBuilder::new(schema)
    }

    /// Build a full entity from a JSON object.
    pub fn from_json(schema: &Arc<Schema>, value: Value) -> DomainResult<Self> {
        let mut builder = EntityBuilder::new(schema);
        for (name, value) in json_pairs(schema.name(), value)? {
            builder = builder.set(name, value);
        }
        builder.build()
    }

    /// Assign a field
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> DomainResult<()> {
        assign(&self.schema, &mut self.values, name, value.into())
    }

    /// Mark a field as MISSING, leaving it to storage defaults on insert
    pub fn set_missing(&mut self, name: &str) -> DomainResult<()> {
        let position = self.schema.check_field(name, self.schema.name())?;
        self.values[position] = Field::Missing;
        Ok(())
    }

    /// Restore the declared default; required fields have none.
    pub fn reset(&mut self, name: &str) -> DomainResult<()> {
        let position = self.schema.check_field(name, self.schema.name())?;
        let default = self.schema.fields()[position]
            .default()
            .cloned()
            .ok_or_else(|| DomainError::missing_field(self.schema.name(), name))?;
        self.values[position] = Field::Value(default);
        Ok(())
    }

    /// Convert into a partial entity holding the same values
    pub fn into_para(self) -> ParaEntity {
        ParaEntity {
            schema: self.schema,
            values: self.values,
        }
    }
}

impl Record for Entity {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn values(&self) -> &[Field] {
        &self.values
    }

    fn is_partial(&self) -> bool {
        false
    }
}

// =============================================================================
// ParaEntity
// =============================================================================

/// Partial entity: identity required, every other field may be MISSING.
///
/// Identity-less partials (`ParaEntity::patch`) describe a set of field
/// values to apply to many rows at once.
#[derive(Debug, Clone, PartialEq)]
pub struct ParaEntity {
    schema: Arc<Schema>,
    values: Vec<Field>,
}

impl ParaEntity {
    /// Partial entity holding only its identity
    pub fn new(schema: &Arc<Schema>, id: impl Into<Value>) -> DomainResult<Self> {
        let mut para = Self::patch(schema);
        let identity = schema.identity().to_string();
        para.set(&identity, id)?;
        Ok(para)
    }

    /// Partial entity with no field supplied, identity included
    pub fn patch(schema: &Arc<Schema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            values: vec![Field::Missing; schema.fields().len()],
        }
    }

    /// Build a partial entity from a JSON object holding the identity.
    pub fn from_json(schema: &Arc<Schema>, value: Value) -> DomainResult<Self> {
        let para = Self::patch_from_json(schema, value)?;
        if para.id().is_missing() {
            return Err(DomainError::missing_field(schema.name(), schema.identity()));
        }
        Ok(para)
    }

    /// Build an identity-less partial entity from a JSON object.
    pub fn patch_from_json(schema: &Arc<Schema>, value: Value) -> DomainResult<Self> {
        let mut para = Self::patch(schema);
        for (name, value) in json_pairs(schema.name(), value)? {
            para.set(&name, value)?;
        }
        Ok(para)
    }

    /// Assign a field
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> DomainResult<()> {
        assign(&self.schema, &mut self.values, name, value.into())
    }

    /// Mark a field as MISSING again
    pub fn unset(&mut self, name: &str) -> DomainResult<()> {
        let position = self.schema.check_field(name, self.schema.name())?;
        self.values[position] = Field::Missing;
        Ok(())
    }

    /// Check if this partial carries no identity
    pub fn is_patch(&self) -> bool {
        self.id().is_missing()
    }

    /// Complete into a full entity, filling defaults for MISSING fields.
    pub fn into_entity(self) -> DomainResult<Entity> {
        let mut builder = EntityBuilder::new(&self.schema);
        for (name, field) in self.schema.field_names().zip(self.values.iter()) {
            if let Field::Value(value) = field {
                builder = builder.set(name, value.clone());
            }
        }
        builder.build()
    }
}

impl Record for ParaEntity {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn values(&self) -> &[Field] {
        &self.values
    }

    fn is_partial(&self) -> bool {
        true
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder collecting field values before the shape is chosen.
///
/// The first invalid assignment is kept and returned by `build*`.
#[derive(Debug)]
pub struct EntityBuilder {
    schema: Arc<Schema>,
    supplied: Vec<Option<Field>>,
    error: Option<DomainError>,
}

impl EntityBuilder {
    fn new(schema: &Arc<Schema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            supplied: vec![None; schema.fields().len()],
            error: None,
        }
    }

    fn supply(mut self, name: &str, field: Field) -> Self {
        if self.error.is_some() {
            return self;
        }
        let checked = self
            .schema
            .check_field(name, self.schema.name())
            .and_then(|position| {
                if let Field::Value(value) = &field {
                    self.schema.fields()[position].check(self.schema.name(), value)?;
                }
                Ok(position)
            });
        match checked {
            Ok(position) => self.supplied[position] = Some(field),
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Supply a field value
    pub fn set(self, name: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.supply(name.as_ref(), Field::Value(value.into()))
    }

    /// Supply a field as explicit MISSING
    pub fn missing(self, name: impl AsRef<str>) -> Self {
        self.supply(name.as_ref(), Field::Missing)
    }

    /// Build a full entity; unsupplied required fields are an error.
    pub fn build(self) -> DomainResult<Entity> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut values = Vec::with_capacity(self.supplied.len());
        for (def, supplied) in self.schema.fields().iter().zip(self.supplied) {
            let field = match (supplied, def.default()) {
                (Some(field), _) => field,
                (None, Some(default)) => Field::Value(default.clone()),
                (None, None) => {
                    return Err(DomainError::missing_field(self.schema.name(), def.name()))
                }
            };
            values.push(field);
        }
        Ok(Entity {
            schema: self.schema,
            values,
        })
    }

    /// Build a partial entity; the identity must be supplied.
    pub fn build_para(self) -> DomainResult<ParaEntity> {
        let identity = self.schema.identity_position();
        let has_identity = matches!(self.supplied.get(identity), Some(Some(Field::Value(_))));
        if self.error.is_none() && !has_identity {
            return Err(DomainError::missing_field(
                self.schema.name(),
                self.schema.identity(),
            ));
        }
        self.build_patch()
    }

    /// Build an identity-less partial entity.
    pub fn build_patch(self) -> DomainResult<ParaEntity> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(ParaEntity {
            schema: self.schema,
            values: self
                .supplied
                .into_iter()
                .map(|field| field.unwrap_or(Field::Missing))
                .collect(),
        })
    }
}

// =============================================================================
// Item
// =============================================================================

/// Either record shape, as returned by reads and accepted by list updates.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Entity(Entity),
    Para(ParaEntity),
}

impl Item {
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Item::Entity(entity) => Some(entity),
            Item::Para(_) => None,
        }
    }

    pub fn as_para(&self) -> Option<&ParaEntity> {
        match self {
            Item::Entity(_) => None,
            Item::Para(para) => Some(para),
        }
    }

    pub fn into_entity(self) -> Option<Entity> {
        match self {
            Item::Entity(entity) => Some(entity),
            Item::Para(_) => None,
        }
    }

    pub fn into_para(self) -> ParaEntity {
        match self {
            Item::Entity(entity) => entity.into_para(),
            Item::Para(para) => para,
        }
    }
}

impl From<Entity> for Item {
    fn from(entity: Entity) -> Self {
        Item::Entity(entity)
    }
}

impl From<ParaEntity> for Item {
    fn from(para: ParaEntity) -> Self {
        Item::Para(para)
    }
}

impl Record for Item {
    fn schema(&self) -> &Arc<Schema> {
        match self {
            Item::Entity(entity) => entity.schema(),
            Item::Para(para) => para.schema(),
        }
    }

    fn values(&self) -> &[Field] {
        match self {
            Item::Entity(entity) => entity.values(),
            Item::Para(para) => para.values(),
        }
    }

    fn is_partial(&self) -> bool {
        matches!(self, Item::Para(_))
    }
}

macro_rules! serialize_as_json {
    ($($ty:ty),*) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    self.to_json().serialize(serializer)
                }
            }
        )*
    };
}

serialize_as_json!(Entity, ParaEntity, Item);
