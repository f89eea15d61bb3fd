//! Parameter to query translation.
//!
//! Builds the filter -> projection -> sort -> slice pipeline on a sea-orm
//! `Select`. Every name is resolved against the schema (and then the
//! policy) before it reaches SQL.

use domain::{DomainError, FilterParams, LookupOp, SlicingParams, SortingParams};
use sea_orm::sea_query::{LikeExpr, Order, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select, Value,
};
use serde_json::Value as Json;

use super::value::{expected, to_db_value};
use super::RelationalRepo;
use crate::policy::QueryPolicy;
use common::AppResult;

/// Stand-in limit for "offset without limit", which SQLite cannot express
const UNBOUNDED_LIMIT: u64 = i64::MAX as u64;

const LIKE_ESCAPE: char = '\\';

/// Escape LIKE wildcards so `text` only matches literally
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

fn like(prefix: &str, text: &str, suffix: &str) -> LikeExpr {
    LikeExpr::new(format!("{prefix}{}{suffix}", escape_like(text))).escape(LIKE_ESCAPE)
}

impl<E, P> RelationalRepo<E, P>
where
    E: EntityTrait,
    P: QueryPolicy,
{
    /// Convert `json` for the field at `position`, naming `key` on failure.
    pub(super) fn bind(&self, position: usize, key: &str, json: &Json) -> AppResult<Value> {
        let def = self.columns[position].def();
        let column_type = def.get_column_type();
        to_db_value(column_type, json).ok_or_else(|| {
            DomainError::InvalidValue {
                entity: self.schema.name().to_string(),
                field: key.to_string(),
                expected: expected(column_type).to_string(),
                value: json.to_string(),
            }
            .into()
        })
    }

    /// `identity IN (ids)`
    pub(super) fn identities_in(&self, ids: &[Json]) -> AppResult<SimpleExpr> {
        let identity = self.schema.identity();
        let values = ids
            .iter()
            .map(|id| self.bind(self.identity, identity, id))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(self.identity_column().is_in(values))
    }

    /// Translate filter params into a conjunction of lookups.
    pub(super) fn condition(&self, filter: Option<&FilterParams>) -> AppResult<Condition> {
        let mut condition = Condition::all();
        let Some(filter) = filter else {
            return Ok(condition);
        };

        for (lookup, value) in filter.lookups()? {
            let position = self.schema.check_field(&lookup.field, filter)?;
            self.policy.check_filter(&self.schema, &lookup, filter)?;
            condition = condition.add(self.lookup_expr(position, lookup.op, value)?);
        }
        Ok(condition)
    }

    fn lookup_expr(&self, position: usize, op: LookupOp, value: &Json) -> AppResult<SimpleExpr> {
        let column = self.columns[position];
        let key = self.schema.fields()[position].name();
        let bind = |json: &Json| self.bind(position, key, json);

        let expr = match op {
            LookupOp::Exact if value.is_null() => column.is_null(),
            LookupOp::Exact => column.eq(bind(value)?),
            LookupOp::Ne if value.is_null() => column.is_not_null(),
            LookupOp::Ne => column.ne(bind(value)?),
            LookupOp::In => {
                // shape checked by FilterParams::lookups
                let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
                let values = items.iter().map(bind).collect::<AppResult<Vec<_>>>()?;
                column.is_in(values)
            }
            LookupOp::Min => column.gte(bind(value)?),
            LookupOp::Max => column.lte(bind(value)?),
            LookupOp::Gt => column.gt(bind(value)?),
            LookupOp::Lt => column.lt(bind(value)?),
            LookupOp::IsNull if value.as_bool().unwrap_or(true) => column.is_null(),
            LookupOp::IsNull => column.is_not_null(),
            LookupOp::Contains => column.like(like("%", value.as_str().unwrap_or_default(), "%")),
            LookupOp::StartsWith => column.like(like("", value.as_str().unwrap_or_default(), "%")),
        };
        Ok(expr)
    }

    /// Resolve sort keys to `(column, order)` pairs.
    pub(super) fn ordering(&self, sort: &SortingParams) -> AppResult<Vec<(E::Column, Order)>> {
        let mut ordering = Vec::new();
        for key in sort.resolve(&self.schema)? {
            self.policy.check_sort(&self.schema, &key, sort)?;
            let column = self.column(&key.field)?;
            let order = if key.descending { Order::Desc } else { Order::Asc };
            ordering.push((column, order));
        }
        Ok(ordering)
    }

    /// Build a read over the fields at `positions`.
    pub(super) fn select(
        &self,
        positions: &[usize],
        condition: Condition,
        sort: Option<&SortingParams>,
        slice: Option<&SlicingParams>,
    ) -> AppResult<Select<E>> {
        let mut select = E::find().select_only();
        for &position in positions {
            select = select.column(self.columns[position]);
        }
        select = select.filter(condition);

        if let Some(sort) = sort {
            for (column, order) in self.ordering(sort)? {
                select = select.order_by(column, order);
            }
        }

        if let Some(slice) = slice {
            let offset = slice.effective_offset();
            if let Some(offset) = offset {
                select = select.offset(offset);
            }
            match (offset, slice.limit) {
                (_, Some(limit)) => select = select.limit(limit),
                (Some(_), None) => select = select.limit(UNBOUNDED_LIMIT),
                (None, None) => {}
            }
        }
        Ok(select)
    }
}
