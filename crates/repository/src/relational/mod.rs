//! Relational repository over a sea-orm entity.
//!
//! Reads go filter -> projection -> sort -> slice and come back as JSON
//! rows mapped onto the schema. Every mutation runs in one transaction;
//! bulk mutations lock exactly the rows they resolve (`SELECT ... FOR
//! UPDATE`) before touching any of them.

mod mapper;
mod query;
mod value;

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AppError, AppResult};
use domain::{
    DomainError, Entity, Field, FilterParams, Item, ParaEntity, Record, Schema, ScopingParams,
    SlicingParams, SortingParams,
};
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityName,
    EntityTrait, FromQueryResult, IdenStatic, Iterable, JsonValue, PaginatorTrait,
    PrimaryKeyToColumn, QueryFilter, QuerySelect, Select, TransactionTrait, Value,
};

use crate::contract::Repository;
use crate::policy::{QueryPolicy, Unrestricted};
use mapper::{insert_groups, row_key};

/// `Repository` implementation for the sea-orm entity `E`.
///
/// The schema must name table columns only, and its identity field must
/// be the table's single primary key column.
pub struct RelationalRepo<E, P = Unrestricted>
where
    E: EntityTrait,
    P: QueryPolicy,
{
    db: Arc<DatabaseConnection>,
    schema: Arc<Schema>,
    /// Column of each schema field, in schema order
    columns: Vec<E::Column>,
    /// Position of the identity field
    identity: usize,
    table: String,
    policy: P,
    _entity: PhantomData<fn() -> E>,
}

impl<E> RelationalRepo<E, Unrestricted>
where
    E: EntityTrait,
{
    /// Create a repository accepting filters and sorts on any field
    pub fn new(db: impl Into<Arc<DatabaseConnection>>, schema: Arc<Schema>) -> AppResult<Self> {
        Self::with_policy(db, schema, Unrestricted)
    }
}

impl<E, P> RelationalRepo<E, P>
where
    E: EntityTrait,
    P: QueryPolicy,
{
    /// Create a repository whose filters and sorts go through `policy`.
    pub fn with_policy(
        db: impl Into<Arc<DatabaseConnection>>,
        schema: Arc<Schema>,
        policy: P,
    ) -> AppResult<Self> {
        let table = E::default().table_name().to_string();
        let invalid = |reason: String| DomainError::invalid_schema(schema.name(), reason);

        let columns = schema
            .fields()
            .iter()
            .map(|field| {
                E::Column::iter()
                    .find(|column| column.as_str() == field.name())
                    .ok_or_else(|| {
                        invalid(format!("table '{}' has no column '{}'", table, field.name()))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let primary_key: Vec<E::Column> =
            E::PrimaryKey::iter().map(|key| key.into_column()).collect();
        match primary_key.as_slice() {
            [key] if key.as_str() == schema.identity() => {}
            _ => {
                return Err(invalid(format!(
                    "identity '{}' is not the single primary key of table '{}'",
                    schema.identity(),
                    table
                ))
                .into())
            }
        }

        tracing::debug!(table = %table, entity = schema.name(), "Repository ready");

        Ok(Self {
            identity: schema.identity_position(),
            db: db.into(),
            schema,
            columns,
            table,
            policy,
            _entity: PhantomData,
        })
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Get a reference to the database connection.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn identity_column(&self) -> E::Column {
        self.columns[self.identity]
    }

    fn column(&self, name: &str) -> AppResult<E::Column> {
        let position = self.schema.check_field(name, self.schema.name())?;
        Ok(self.columns[position])
    }

    fn all_positions(&self) -> Vec<usize> {
        (0..self.columns.len()).collect()
    }

    /// Condition selecting the rows a batch operation acts on.
    ///
    /// Without a bounded slice this is just the filter. With one, the
    /// sorted and sliced identity set is read first and the condition
    /// pins exactly that set, since UPDATE / DELETE cannot be ordered
    /// and windowed portably.
    async fn resolve_batch(
        &self,
        txn: &DatabaseTransaction,
        filter: Option<&FilterParams>,
        sort: Option<&SortingParams>,
        slice: Option<&SlicingParams>,
    ) -> AppResult<Condition> {
        let condition = self.condition(filter)?;
        let slice = slice.filter(|slice| !slice.is_unbounded());

        let Some(slice) = slice else {
            if let Some(sort) = sort {
                self.ordering(sort)?;
            }
            return Ok(condition);
        };

        let rows = self
            .select(&[self.identity], condition.clone(), sort, Some(slice))?
            .into_json()
            .all(txn)
            .await?;
        let identity = self.schema.identity();
        let ids: Vec<JsonValue> = rows.iter().map(|row| row[identity].clone()).collect();
        Ok(condition.add(self.identities_in(&ids)?))
    }

    /// `SELECT ... FOR UPDATE` over the rows matching `condition`
    fn lock_select(&self, positions: &[usize], condition: Condition) -> AppResult<Select<E>> {
        Ok(self.select(positions, condition, None, None)?.lock_exclusive())
    }

    /// Take exclusive locks on the rows matching `condition`, returning them.
    async fn lock(
        &self,
        txn: &DatabaseTransaction,
        positions: &[usize],
        condition: Condition,
    ) -> AppResult<Vec<JsonValue>> {
        let rows = self
            .lock_select(positions, condition)?
            .into_json()
            .all(txn)
            .await?;
        tracing::debug!(table = %self.table, rows = rows.len(), "Rows locked");
        Ok(rows)
    }

    /// Insert `items`, one multi-row statement per run of items supplying
    /// the same fields. Identities come back in insertion order.
    async fn insert_all(&self, txn: &DatabaseTransaction, items: &[Entity]) -> AppResult<Vec<Entity>> {
        let backend = txn.get_database_backend();
        let identity = self.schema.identity();

        let mut ids = Vec::with_capacity(items.len());
        for group in insert_groups(items) {
            let statement = backend.build(&self.insert_statement(group)?);
            let rows = JsonValue::find_by_statement(statement).all(txn).await?;
            if rows.len() != group.len() {
                return Err(AppError::internal(format!(
                    "{} insert returned {} rows for {} items",
                    self.table,
                    rows.len(),
                    group.len()
                )));
            }
            ids.extend(rows.into_iter().map(|row| row[identity].clone()));
        }
        tracing::debug!(table = %self.table, rows = ids.len(), "Rows inserted");

        let positions = self.all_positions();
        let condition = Condition::all().add(self.identities_in(&ids)?);
        let rows = self
            .select(&positions, condition, None, None)?
            .into_json()
            .all(txn)
            .await?;
        let mut rows = self.rows_by_key(rows);

        ids.iter()
            .map(|id| {
                let row = rows.remove(&row_key(id)).ok_or_else(|| {
                    AppError::internal(format!("{} row {} vanished after insert", self.table, id))
                })?;
                self.row_to_entity(row)
            })
            .collect()
    }

    /// Rows of `ids` that also pass `filter`
    fn matched(&self, ids: &[JsonValue], filter: Option<&FilterParams>) -> AppResult<Condition> {
        Ok(self.condition(filter)?.add(self.identities_in(ids)?))
    }

    async fn merge_locked(
        &self,
        txn: &DatabaseTransaction,
        items: &[Item],
        ids: &[JsonValue],
        filter: Option<&FilterParams>,
    ) -> AppResult<()> {
        // fold items per identity first; later items win per field
        let mut order = Vec::new();
        let mut merged: HashMap<String, Vec<Option<&JsonValue>>> = HashMap::new();
        for (item, id) in items.iter().zip(ids) {
            let fields = merged.entry(row_key(id)).or_insert_with(|| {
                order.push(id);
                vec![None; self.columns.len()]
            });
            for (position, field) in item.values().iter().enumerate() {
                if let Field::Value(value) = field {
                    fields[position] = Some(value);
                }
            }
        }

        let positions = self.all_positions();
        let stored = self.rows_by_key(self.lock(txn, &positions, self.matched(ids, filter)?).await?);

        // per field: (identity value, new value)
        let mut changes: Vec<Vec<(Value, Value)>> = vec![Vec::new(); self.columns.len()];
        let mut touched = Vec::new();

        for id in order {
            let key = row_key(id);
            // not matched: absent, or excluded by the filter
            let Some(row) = stored.get(&key) else {
                continue;
            };

            let mut changed = false;
            for (position, incoming) in merged[&key].iter().copied().enumerate() {
                let Some(incoming) = incoming else {
                    continue;
                };
                if position == self.identity {
                    continue;
                }
                let name = self.schema.fields()[position].name();
                if row.get(name) == Some(incoming) {
                    continue;
                }
                changes[position].push((
                    self.bind(self.identity, self.schema.identity(), id)?,
                    self.bind(position, name, incoming)?,
                ));
                changed = true;
            }
            if changed {
                touched.push(id.clone());
            }
        }

        if touched.is_empty() {
            tracing::debug!(table = %self.table, "update_list: nothing changed");
            return Ok(());
        }

        let identity_column = self.identity_column();
        let mut update = E::update_many();
        let mut changed_fields = Vec::new();
        for (position, entries) in changes.into_iter().enumerate() {
            let mut entries = entries.into_iter();
            let Some((first_id, first_value)) = entries.next() else {
                continue;
            };
            let column = self.columns[position];
            let case = entries.fold(
                Expr::case(identity_column.eq(first_id), first_value),
                |case, (id, value)| case.case(identity_column.eq(id), value),
            );
            update = update.col_expr(
                column,
                SimpleExpr::Case(Box::new(case.finally(Expr::col(column)))),
            );
            changed_fields.push(self.schema.fields()[position].name());
        }

        let result = update
            .filter(self.identities_in(&touched)?)
            .exec(txn)
            .await?;
        tracing::debug!(
            table = %self.table,
            rows = result.rows_affected,
            fields = ?changed_fields,
            "update_list"
        );
        Ok(())
    }
}

/// Commit on success, roll back on error.
async fn finish<T>(txn: DatabaseTransaction, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!("Transaction rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

#[async_trait]
impl<E, P> Repository for RelationalRepo<E, P>
where
    E: EntityTrait,
    P: QueryPolicy,
{
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    async fn get_count(&self, filter: Option<FilterParams>) -> AppResult<u64> {
        let condition = self.condition(filter.as_ref())?;
        let count = self
            .select(&[self.identity], condition, None, None)?
            .into_json()
            .count(self.db.as_ref())
            .await?;
        tracing::debug!(table = %self.table, count, "get_count");
        Ok(count)
    }

    async fn get_list(
        &self,
        filter: Option<FilterParams>,
        scope: Option<ScopingParams>,
        sort: Option<SortingParams>,
        slice: Option<SlicingParams>,
    ) -> AppResult<Vec<Item>> {
        let condition = self.condition(filter.as_ref())?;
        let positions = match &scope {
            Some(scope) => scope.resolve(&self.schema)?,
            None => self.all_positions(),
        };
        let projected = scope.is_some();

        let rows = self
            .select(&positions, condition, sort.as_ref(), slice.as_ref())?
            .into_json()
            .all(self.db.as_ref())
            .await?;
        tracing::debug!(table = %self.table, rows = rows.len(), projected, "get_list");

        rows.into_iter()
            .map(|row| self.row_to_item(row, &positions, projected))
            .collect()
    }

    async fn create_list(&self, items: Vec<Entity>) -> AppResult<Vec<Entity>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        for item in &items {
            self.check_schema(item)?;
        }

        let txn = self.db.begin().await?;
        let result = self.insert_all(&txn, &items).await;
        let created = finish(txn, result).await?;
        tracing::debug!(table = %self.table, rows = created.len(), "create_list");
        Ok(created)
    }

    async fn update_list(&self, items: Vec<Item>, filter: Option<FilterParams>) -> AppResult<()> {
        if items.is_empty() {
            return Ok(());
        }

        let mut ids = Vec::with_capacity(items.len());
        for item in &items {
            self.check_schema(item)?;
            match item.id() {
                Field::Value(id) if !id.is_null() => ids.push(id.clone()),
                _ => {
                    return Err(
                        DomainError::missing_field(self.schema.name(), self.schema.identity()).into(),
                    )
                }
            }
        }

        let txn = self.db.begin().await?;
        let result = self.merge_locked(&txn, &items, &ids, filter.as_ref()).await;
        finish(txn, result).await
    }

    async fn update_batch(
        &self,
        update_params: ParaEntity,
        filter: Option<FilterParams>,
        sort: Option<SortingParams>,
        slice: Option<SlicingParams>,
    ) -> AppResult<u64> {
        self.check_schema(&update_params)?;
        let mut assignments = Vec::new();
        for (position, (def, field)) in self
            .schema
            .fields()
            .iter()
            .zip(update_params.values())
            .enumerate()
        {
            // identity is never rewritten
            if position == self.identity {
                continue;
            }
            if let Field::Value(value) = field {
                assignments.push((self.columns[position], self.bind(position, def.name(), value)?));
            }
        }
        if assignments.is_empty() {
            tracing::debug!(table = %self.table, "update_batch: no fields to set");
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        let result = async {
            let condition = self
                .resolve_batch(&txn, filter.as_ref(), sort.as_ref(), slice.as_ref())
                .await?;
            self.lock(&txn, &[self.identity], condition.clone()).await?;

            let mut update = E::update_many();
            for (column, value) in assignments {
                update = update.col_expr(column, Expr::value(value));
            }
            let result = update.filter(condition).exec(&txn).await?;
            Ok::<_, AppError>(result.rows_affected)
        }
        .await;
        let rows = finish(txn, result).await?;
        tracing::debug!(table = %self.table, rows, "update_batch");
        Ok(rows)
    }

    async fn delete_batch(
        &self,
        filter: Option<FilterParams>,
        sort: Option<SortingParams>,
        slice: Option<SlicingParams>,
    ) -> AppResult<u64> {
        let txn = self.db.begin().await?;
        let result = async {
            let condition = self
                .resolve_batch(&txn, filter.as_ref(), sort.as_ref(), slice.as_ref())
                .await?;
            self.lock(&txn, &[self.identity], condition.clone()).await?;

            let result = E::delete_many().filter(condition).exec(&txn).await?;
            Ok::<_, AppError>(result.rows_affected)
        }
        .await;
        let rows = finish(txn, result).await?;
        tracing::debug!(table = %self.table, rows, "delete_batch");
        Ok(rows)
    }
}
