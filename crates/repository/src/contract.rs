//! Repository contract.
//!
//! Every parameter left as `None` means "no constraint" on that axis.
//! Absence is data: `get_item` answers `None` and `get_list` an empty
//! vector, neither is an error.

use std::sync::Arc;

use async_trait::async_trait;
use common::{AppError, AppResult};
use domain::{
    Entity, FilterParams, Item, ParaEntity, Schema, ScopingParams, SlicingParams, SortingParams,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::mock;

/// Backend-agnostic CRUD / query surface.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Schema of the records this repository stores
    fn schema(&self) -> &Arc<Schema>;

    /// Count rows matching `filter`
    async fn get_count(&self, filter: Option<FilterParams>) -> AppResult<u64>;

    /// List matching rows.
    ///
    /// Full entities are returned unless `scope` is given, in which case
    /// every item is a partial entity carrying only the scoped fields.
    async fn get_list(
        &self,
        filter: Option<FilterParams>,
        scope: Option<ScopingParams>,
        sort: Option<SortingParams>,
        slice: Option<SlicingParams>,
    ) -> AppResult<Vec<Item>>;

    /// First row matching `filter`, or `None`
    async fn get_item(
        &self,
        filter: FilterParams,
        scope: Option<ScopingParams>,
    ) -> AppResult<Option<Item>> {
        let items = self
            .get_list(Some(filter), scope, None, Some(SlicingParams::limit(1)))
            .await?;
        Ok(items.into_iter().next())
    }

    /// Insert all items in one transaction, returning them as persisted
    /// (backend-assigned values included), in input order.
    async fn create_list(&self, items: Vec<Entity>) -> AppResult<Vec<Entity>>;

    async fn create_item(&self, item: Entity) -> AppResult<Entity> {
        self.create_list(vec![item])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::internal("create_list returned no entity"))
    }

    /// Merge each item into the row with the same identity.
    ///
    /// Present fields overwrite, MISSING fields are left untouched. Rows
    /// excluded by `filter` are skipped without any signal.
    async fn update_list(&self, items: Vec<Item>, filter: Option<FilterParams>) -> AppResult<()>;

    async fn update_item(&self, item: Item, filter: Option<FilterParams>) -> AppResult<()> {
        self.update_list(vec![item], filter).await
    }

    /// Apply the present fields of `update_params` to every selected row,
    /// returning the number of rows updated.
    async fn update_batch(
        &self,
        update_params: ParaEntity,
        filter: Option<FilterParams>,
        sort: Option<SortingParams>,
        slice: Option<SlicingParams>,
    ) -> AppResult<u64>;

    /// Delete every selected row, returning the number of rows deleted
    async fn delete_batch(
        &self,
        filter: Option<FilterParams>,
        sort: Option<SortingParams>,
        slice: Option<SlicingParams>,
    ) -> AppResult<u64>;

    /// Delete at most one row matching `filter`
    async fn delete_item(&self, filter: FilterParams) -> AppResult<u64> {
        self.delete_batch(Some(filter), None, Some(SlicingParams::limit(1)))
            .await
    }
}

#[cfg(any(test, feature = "test-utils"))]
mock! {
    pub Repo {}

    #[async_trait]
    impl Repository for Repo {
        fn schema(&self) -> &Arc<Schema>;

        async fn get_count(&self, filter: Option<FilterParams>) -> AppResult<u64>;

        async fn get_list(
            &self,
            filter: Option<FilterParams>,
            scope: Option<ScopingParams>,
            sort: Option<SortingParams>,
            slice: Option<SlicingParams>,
        ) -> AppResult<Vec<Item>>;

        async fn create_list(&self, items: Vec<Entity>) -> AppResult<Vec<Entity>>;

        async fn update_list(&self, items: Vec<Item>, filter: Option<FilterParams>) -> AppResult<()>;

        async fn update_batch(
            &self,
            update_params: ParaEntity,
            filter: Option<FilterParams>,
            sort: Option<SortingParams>,
            slice: Option<SlicingParams>,
        ) -> AppResult<u64>;

        async fn delete_batch(
            &self,
            filter: Option<FilterParams>,
            sort: Option<SortingParams>,
            slice: Option<SlicingParams>,
        ) -> AppResult<u64>;
    }
}
