//! Row <-> entity mapping.

use std::collections::HashMap;

use common::{AppError, AppResult};
use domain::{Entity, EntityBuilder, Field, Item, Record};
use sea_orm::sea_query::{InsertStatement, Query, SimpleExpr};
use sea_orm::EntityTrait;
use serde_json::Value as Json;

use super::RelationalRepo;
use crate::policy::QueryPolicy;

/// Key identifying a row by its identity value
pub(super) fn row_key(id: &Json) -> String {
    match id {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Positions of the fields a record supplies
fn present_positions(entity: &Entity) -> Vec<usize> {
    entity
        .values()
        .iter()
        .enumerate()
        .filter(|(_, field)| field.is_present())
        .map(|(position, _)| position)
        .collect()
}

/// Split `items` into runs supplying the same fields, in input order.
///
/// Items supplying no field at all are inserted one by one, since
/// `DEFAULT VALUES` covers a single row.
pub(super) fn insert_groups(items: &[Entity]) -> Vec<&[Entity]> {
    let mut groups = Vec::new();
    let mut start = 0;
    for end in 1..=items.len() {
        let fields = present_positions(&items[start]);
        let split = end == items.len()
            || fields.is_empty()
            || present_positions(&items[end]) != fields;
        if split {
            groups.push(&items[start..end]);
            start = end;
        }
    }
    groups
}

impl<E, P> RelationalRepo<E, P>
where
    E: EntityTrait,
    P: QueryPolicy,
{
    fn row_builder(&self, row: Json, positions: &[usize]) -> AppResult<EntityBuilder> {
        let Json::Object(mut row) = row else {
            return Err(AppError::internal(format!(
                "{} row is not an object",
                self.table
            )));
        };

        let mut builder = Entity::builder(&self.schema);
        for &position in positions {
            let name = self.schema.fields()[position].name();
            if let Some(value) = row.remove(name) {
                builder = builder.set(name, value);
            }
        }
        Ok(builder)
    }

    /// Build a full entity from a row carrying every schema field
    pub(super) fn row_to_entity(&self, row: Json) -> AppResult<Entity> {
        let builder = self.row_builder(row, &self.all_positions())?;
        Ok(builder.build()?)
    }

    /// Build a record from a row read over `positions`.
    ///
    /// The shape depends only on whether a projection applied: projected
    /// rows become partial entities, whichever fields they carry.
    pub(super) fn row_to_item(&self, row: Json, positions: &[usize], projected: bool) -> AppResult<Item> {
        let builder = self.row_builder(row, positions)?;
        if projected {
            Ok(builder.build_patch()?.into())
        } else {
            Ok(builder.build()?.into())
        }
    }

    /// Index rows by their identity value
    pub(super) fn rows_by_key(&self, rows: Vec<Json>) -> HashMap<String, Json> {
        let identity = self.schema.identity();
        rows.into_iter()
            .map(|row| (row_key(&row[identity]), row))
            .collect()
    }

    /// Multi-row INSERT for a group from `insert_groups`, returning the
    /// identity of every row.
    ///
    /// MISSING fields are left out so the backend assigns them.
    pub(super) fn insert_statement(&self, group: &[Entity]) -> AppResult<InsertStatement> {
        let mut insert = Query::insert();
        insert.into_table(E::default());

        let positions = group.first().map(present_positions).unwrap_or_default();
        if positions.is_empty() {
            insert.or_default_values();
        } else {
            insert.columns(positions.iter().map(|&position| self.columns[position]));
            for entity in group {
                let mut values = Vec::with_capacity(positions.len());
                for &position in &positions {
                    let def = &self.schema.fields()[position];
                    let Field::Value(value) = &entity.values()[position] else {
                        return Err(AppError::internal(format!(
                            "{} insert group mixes field sets",
                            self.table
                        )));
                    };
                    values.push(SimpleExpr::from(self.bind(position, def.name(), value)?));
                }
                insert
                    .values(values)
                    .map_err(|e| AppError::internal(e.to_string()))?;
            }
        }
        insert.returning_col(self.identity_column());
        Ok(insert)
    }

    /// Reject records built against another schema
    pub(super) fn check_schema(&self, record: &impl Record) -> AppResult<()> {
        if record.schema().as_ref() == self.schema.as_ref() {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "{} record passed to the {} repository",
                record.schema().name(),
                self.schema.name()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(fields: serde_json::Value) -> Entity {
        let schema = domain::Schema::builder("User")
            .field(domain::FieldDef::required("id", domain::FieldKind::Integer))
            .field(domain::FieldDef::optional("name", domain::FieldKind::Text, ""))
            .build()
            .unwrap();
        let mut builder = Entity::builder(&schema).missing("id");
        for (name, value) in fields.as_object().unwrap() {
            builder = builder.set(name, value.clone());
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_insert_groups_split_on_field_set() {
        let a = user(json!({"name": "a"}));
        let b = user(json!({"name": "b"}));
        let c = user(json!({"id": 7, "name": "c"}));
        let d = user(json!({"name": "d"}));
        let items = vec![a, b, c, d];

        let sizes: Vec<usize> = insert_groups(&items).iter().map(|group| group.len()).collect();
        assert_eq!(sizes, vec![2, 1, 1]);
        assert!(insert_groups(&[]).is_empty());
    }

    #[test]
    fn test_insert_groups_isolate_empty_rows() {
        let schema = domain::Schema::builder("Counter")
            .field(domain::FieldDef::required("id", domain::FieldKind::Integer))
            .build()
            .unwrap();
        let empty = || Entity::builder(&schema).missing("id").build().unwrap();
        let items = vec![empty(), empty()];

        let sizes: Vec<usize> = insert_groups(&items).iter().map(|group| group.len()).collect();
        assert_eq!(sizes, vec![1, 1]);
    }

    #[test]
    fn test_row_key() {
        assert_eq!(row_key(&json!(4)), "4");
        assert_eq!(row_key(&json!("a1b2")), "a1b2");
        assert_eq!(row_key(&json!(null)), "null");
    }
}
