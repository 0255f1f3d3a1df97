//! The query builder: one [`ListQuery`] in, one [`ListResult`] out.
//!
//! # Algorithm
//!
//! 1. Resolve `tableName` against the [`Catalogue`].
//! 2. Validate paging (`currentPage ≥ 1`, `1 ≤ pageSize ≤ max`) and sorts.
//! 3. Normalize the id list, search text and tag set into a [`RowFilter`].
//! 4. Count the matching rows (`totalCount`, before pagination).
//! 5. Fetch the window `[(page-1)*size, page*size)` in the requested order,
//!    or the table's default order (descending score) when no sort is given.
//!
//! Store failures surface as [`QueryError::UpstreamUnavailable`] with no
//! partial result.

use async_trait::async_trait;
use tracing::debug;

use crate::error::QueryError;
use crate::filter::RowFilter;
use crate::models::{Catalogue, ListQuery, ListResult, ResolvedSort};
use crate::store::RowStore;

/// Upper bound on `pageSize` when none is configured.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Anything that can answer list queries: a local [`QueryBuilder`] or a
/// remote endpoint speaking the same request/response contract.
#[async_trait]
pub trait ListSource: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<ListResult, QueryError>;

    /// Sorted distinct tags of a collection.
    async fn tags(&self, table_name: &str) -> Result<Vec<String>, QueryError>;
}

/// Translates list queries into [`RowStore`] calls.
pub struct QueryBuilder<S> {
    store: S,
    catalogue: Catalogue,
    max_page_size: u32,
}

impl<S: RowStore> QueryBuilder<S> {
    pub fn new(store: S, catalogue: Catalogue) -> Self {
        Self {
            store,
            catalogue,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    /// Run one query. Read-only.
    pub async fn run(&self, query: &ListQuery) -> Result<ListResult, QueryError> {
        let table = self.catalogue.require(&query.table_name)?;

        if query.current_page < 1 {
            return Err(QueryError::InvalidQuery(
                "currentPage must be >= 1".to_string(),
            ));
        }
        if query.page_size < 1 {
            return Err(QueryError::InvalidQuery("pageSize must be >= 1".to_string()));
        }
        if query.page_size > self.max_page_size {
            return Err(QueryError::InvalidQuery(format!(
                "pageSize must be <= {}",
                self.max_page_size
            )));
        }

        let order: Vec<ResolvedSort> = if query.sorts.is_empty() {
            table.default_order()
        } else {
            query
                .sorts
                .iter()
                .map(|s| table.resolve_sort(s))
                .collect::<Result<_, _>>()?
        };

        let filter = RowFilter::from_query(query);
        let total_count = self
            .store
            .count(table, &filter)
            .await
            .map_err(QueryError::upstream)?;

        let page_size = u64::from(query.page_size);
        let offset = u64::from(query.current_page - 1) * page_size;
        let data = if offset >= total_count {
            Vec::new()
        } else {
            self.store
                .fetch(table, &filter, &order, offset, page_size)
                .await
                .map_err(QueryError::upstream)?
        };

        debug!(
            table = %table.name,
            page = query.current_page,
            page_size = query.page_size,
            returned = data.len(),
            total_count,
            "list query"
        );

        Ok(ListResult { data, total_count })
    }

    pub async fn distinct_tags(&self, table_name: &str) -> Result<Vec<String>, QueryError> {
        let table = self.catalogue.require(table_name)?;
        self.store
            .distinct_tags(table)
            .await
            .map_err(QueryError::upstream)
    }
}

#[async_trait]
impl<S: RowStore> ListSource for QueryBuilder<S> {
    async fn list(&self, query: &ListQuery) -> Result<ListResult, QueryError> {
        self.run(query).await
    }

    async fn tags(&self, table_name: &str) -> Result<Vec<String>, QueryError> {
        self.distinct_tags(table_name).await
    }
}
