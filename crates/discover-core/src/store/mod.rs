//! Storage abstraction for listing collections.
//!
//! The [`RowStore`] trait is the tabular data source the query builder
//! drives. It exposes exactly the capabilities a listing needs: filtering by
//! id list, name substring and tag set, multi-key ordering with an offset
//! window, and counting matches before pagination. Writes exist only so
//! collections can be loaded.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::filter::RowFilter;
use crate::models::{ResolvedSort, Row, TableSpec};

/// Outcome of loading rows into a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub inserted: u64,
    pub updated: u64,
    pub unchanged: u64,
}

/// Abstract tabular data source.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`count`](RowStore::count) | Rows matching a filter, before pagination |
/// | [`fetch`](RowStore::fetch) | One ordered window of matching rows |
/// | [`distinct_tags`](RowStore::distinct_tags) | Sorted tag vocabulary of a collection |
/// | [`upsert_rows`](RowStore::upsert_rows) | Insert or replace rows by id |
///
/// Rows with equal sort keys must come back in insertion order, and a
/// replaced row keeps its original position.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn count(&self, table: &TableSpec, filter: &RowFilter) -> Result<u64>;

    async fn fetch(
        &self,
        table: &TableSpec,
        filter: &RowFilter,
        order: &[ResolvedSort],
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Row>>;

    async fn distinct_tags(&self, table: &TableSpec) -> Result<Vec<String>>;

    async fn upsert_rows(&self, table: &TableSpec, rows: &[Row]) -> Result<UpsertSummary>;
}
