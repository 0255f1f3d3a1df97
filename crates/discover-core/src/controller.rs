//! List state controller.
//!
//! Owns the search/tag/sort/page state of one listing and keeps the
//! displayed page consistent with it. Every state change that matters issues
//! exactly one query through a [`ListSource`]:
//!
//! - search, tag and sort changes reset the page to 1 before querying;
//! - page changes query with the filters unchanged;
//! - setting a value to what it already is issues nothing.
//!
//! # Ordering
//!
//! Several queries may be in flight at once (one per state change, nothing
//! is cancelled). Each issued query takes the next generation number, and a
//! response is applied only if its generation is still the latest issued.
//! Older responses are discarded with [`QueryError::StaleResponse`], so the
//! visible page always belongs to the most recently *initiated* query,
//! whatever order the responses arrive in.
//!
//! On failure the previous page and total stay in place and the message is
//! kept in [`ListView::last_error`].
//!
//! The state lock is never held across an `.await`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::QueryError;
use crate::models::{ListQuery, Row, SortSpec, DEFAULT_PAGE_SIZE};
use crate::query::ListSource;

#[derive(Debug, Clone)]
struct ListState {
    table_name: String,
    page_size: u32,
    ids: Vec<String>,
    search_value: String,
    selected_tags: Vec<String>,
    sorts: Vec<SortSpec>,
    current_page: u32,
    filtered_data: Vec<Row>,
    total_count: u64,
    last_error: Option<String>,
    generation: u64,
}

impl ListState {
    fn query(&self) -> ListQuery {
        ListQuery {
            table_name: self.table_name.clone(),
            search_value: self.search_value.clone(),
            selected_tags: self.selected_tags.clone(),
            sorts: self.sorts.clone(),
            page_size: self.page_size,
            current_page: self.current_page,
            ids: self.ids.clone(),
        }
    }

    fn view(&self) -> ListView {
        ListView {
            table_name: self.table_name.clone(),
            search_value: self.search_value.clone(),
            selected_tags: self.selected_tags.clone(),
            sorts: self.sorts.clone(),
            current_page: self.current_page,
            page_size: self.page_size,
            filtered_data: self.filtered_data.clone(),
            total_count: self.total_count,
            last_error: self.last_error.clone(),
            generation: self.generation,
        }
    }

    fn total_pages(&self) -> u32 {
        total_pages(self.total_count, self.page_size)
    }

    fn reset_page(&mut self) {
        self.current_page = 1;
    }
}

fn total_pages(total_count: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = total_count.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Snapshot of the controller state, as displayed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    pub table_name: String,
    pub search_value: String,
    pub selected_tags: Vec<String>,
    pub sorts: Vec<SortSpec>,
    pub current_page: u32,
    pub page_size: u32,
    pub filtered_data: Vec<Row>,
    pub total_count: u64,
    pub last_error: Option<String>,
    /// Generation of the latest issued query (0 before the first one).
    pub generation: u64,
}

impl ListView {
    pub fn total_pages(&self) -> u32 {
        total_pages(self.total_count, self.page_size)
    }
}

/// Keeps one listing's displayed page in sync with its filter state.
///
/// Share it through an `Arc` to drive it from several tasks.
pub struct ListController<L> {
    source: L,
    state: Mutex<ListState>,
}

impl<L: ListSource> ListController<L> {
    pub fn new(source: L, table_name: impl Into<String>) -> Self {
        Self {
            source,
            state: Mutex::new(ListState {
                table_name: table_name.into(),
                page_size: DEFAULT_PAGE_SIZE,
                ids: Vec::new(),
                search_value: String::new(),
                selected_tags: Vec::new(),
                sorts: Vec::new(),
                current_page: 1,
                filtered_data: Vec::new(),
                total_count: 0,
                last_error: None,
                generation: 0,
            }),
        }
    }

    /// Set the page size. Takes effect on the next query.
    pub fn with_page_size(self, page_size: u32) -> Self {
        self.lock().page_size = page_size;
        self
    }

    /// Scope the listing to a pre-selected set of row ids.
    pub fn with_ids<I, T>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.lock().ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn source(&self) -> &L {
        &self.source
    }

    pub fn view(&self) -> ListView {
        self.lock().view()
    }

    fn lock(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` to the state without waiting for anything.
    ///
    /// If the state changed, the query for it takes the next generation and
    /// is returned for [`complete`](Self::complete). Calling `begin` in the
    /// order changes are made keeps generations in that order, whichever
    /// task later awaits the response.
    pub fn begin(&self, change: StateChange) -> Result<Step, QueryError> {
        let mut state = self.lock();
        let mut draft = state.clone();
        if !change.apply(&mut draft)? {
            return Ok(Step::Unchanged(state.view()));
        }
        draft.generation += 1;
        *state = draft;
        Ok(Step::Issued(PendingQuery {
            generation: state.generation,
            query: state.query(),
        }))
    }

    /// Run a query returned by [`begin`](Self::begin) and apply its response
    /// if no newer query has been issued since.
    pub async fn complete(&self, pending: PendingQuery) -> Result<ListView, QueryError> {
        let PendingQuery { generation, query } = pending;
        debug!(
            table = %query.table_name,
            generation,
            page = query.current_page,
            "issuing list query"
        );
        let outcome = self.source.list(&query).await;

        let mut state = self.lock();
        if state.generation != generation {
            debug!(
                generation,
                latest = state.generation,
                "discarding stale list response"
            );
            return Err(QueryError::StaleResponse {
                generation,
                latest: state.generation,
            });
        }

        match outcome {
            Ok(result) => {
                state.filtered_data = result.data;
                state.total_count = result.total_count;
                state.last_error = None;
                Ok(state.view())
            }
            Err(err) => {
                warn!(generation, error = %err, "list query failed, keeping previous page");
                state.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn transition(&self, change: StateChange) -> Result<ListView, QueryError> {
        match self.begin(change)? {
            Step::Unchanged(view) => Ok(view),
            Step::Issued(pending) => self.complete(pending).await,
        }
    }

    /// Re-issue the current state (initial load, or retry after a failure).
    pub async fn refresh(&self) -> Result<ListView, QueryError> {
        self.transition(StateChange::Refresh).await
    }

    pub async fn set_search(&self, value: impl Into<String>) -> Result<ListView, QueryError> {
        self.transition(StateChange::Search(value.into())).await
    }

    /// Replace the selected tag set. Order is kept, duplicates dropped.
    pub async fn set_tags<I, T>(&self, tags: I) -> Result<ListView, QueryError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tags = tags.into_iter().map(Into::into).collect();
        self.transition(StateChange::SetTags(tags)).await
    }

    /// Select the tag if unselected, otherwise unselect it.
    pub async fn toggle_tag(&self, tag: impl Into<String>) -> Result<ListView, QueryError> {
        self.transition(StateChange::ToggleTag(tag.into())).await
    }

    pub async fn add_tag(&self, tag: impl Into<String>) -> Result<ListView, QueryError> {
        self.transition(StateChange::AddTag(tag.into())).await
    }

    pub async fn remove_tag(&self, tag: &str) -> Result<ListView, QueryError> {
        self.transition(StateChange::RemoveTag(tag.to_string())).await
    }

    pub async fn clear_tags(&self) -> Result<ListView, QueryError> {
        self.transition(StateChange::SetTags(Vec::new())).await
    }

    /// Append a sort key. A column already sorted on keeps its position and
    /// takes the new direction.
    pub async fn add_sort(&self, sort: SortSpec) -> Result<ListView, QueryError> {
        self.transition(StateChange::AddSort(sort)).await
    }

    pub async fn remove_sort(&self, column: &str) -> Result<ListView, QueryError> {
        self.transition(StateChange::RemoveSort(column.to_string())).await
    }

    pub async fn clear_sorts(&self) -> Result<ListView, QueryError> {
        self.transition(StateChange::ClearSorts).await
    }

    /// Move to a 1-based page, keeping the filters.
    pub async fn set_page(&self, page: u32) -> Result<ListView, QueryError> {
        self.transition(StateChange::SetPage(page)).await
    }

    /// Next page, unless already on the last known page.
    pub async fn next_page(&self) -> Result<ListView, QueryError> {
        self.transition(StateChange::NextPage).await
    }

    pub async fn prev_page(&self) -> Result<ListView, QueryError> {
        self.transition(StateChange::PrevPage).await
    }
}

/// One edit of the listing state.
///
/// Search, tag and sort changes reset the page to 1. A change that leaves
/// the state as it was issues no query.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// Re-issue the current state unchanged.
    Refresh,
    Search(String),
    SetTags(Vec<String>),
    ToggleTag(String),
    AddTag(String),
    RemoveTag(String),
    AddSort(SortSpec),
    RemoveSort(String),
    ClearSorts,
    SetPage(u32),
    NextPage,
    PrevPage,
}

impl StateChange {
    /// Mutate `s`; `Ok(true)` if a query must be issued.
    fn apply(self, s: &mut ListState) -> Result<bool, QueryError> {
        match self {
            StateChange::Refresh => return Ok(true),
            StateChange::Search(value) => {
                if s.search_value == value {
                    return Ok(false);
                }
                s.search_value = value;
            }
            StateChange::SetTags(tags) => {
                let mut wanted: Vec<String> = Vec::new();
                for tag in tags {
                    if !tag.is_empty() && !wanted.contains(&tag) {
                        wanted.push(tag);
                    }
                }
                if s.selected_tags == wanted {
                    return Ok(false);
                }
                s.selected_tags = wanted;
            }
            StateChange::ToggleTag(tag) => {
                if tag.is_empty() {
                    return Ok(false);
                }
                match s.selected_tags.iter().position(|t| *t == tag) {
                    Some(idx) => {
                        s.selected_tags.remove(idx);
                    }
                    None => s.selected_tags.push(tag),
                }
            }
            StateChange::AddTag(tag) => {
                if tag.is_empty() || s.selected_tags.contains(&tag) {
                    return Ok(false);
                }
                s.selected_tags.push(tag);
            }
            StateChange::RemoveTag(tag) => {
                let before = s.selected_tags.len();
                s.selected_tags.retain(|t| *t != tag);
                if s.selected_tags.len() == before {
                    return Ok(false);
                }
            }
            StateChange::AddSort(sort) => {
                match s.sorts.iter_mut().find(|x| x.column == sort.column) {
                    Some(existing) if existing.direction == sort.direction => return Ok(false),
                    Some(existing) => existing.direction = sort.direction,
                    None => s.sorts.push(sort),
                }
            }
            StateChange::RemoveSort(column) => {
                let before = s.sorts.len();
                s.sorts.retain(|x| x.column != column);
                if s.sorts.len() == before {
                    return Ok(false);
                }
            }
            StateChange::ClearSorts => {
                if s.sorts.is_empty() {
                    return Ok(false);
                }
                s.sorts.clear();
            }
            StateChange::SetPage(page) => {
                if page < 1 {
                    return Err(QueryError::InvalidQuery(
                        "currentPage must be >= 1".to_string(),
                    ));
                }
                if s.current_page == page {
                    return Ok(false);
                }
                s.current_page = page;
                return Ok(true);
            }
            StateChange::NextPage => {
                if s.current_page >= s.total_pages() {
                    return Ok(false);
                }
                s.current_page += 1;
                return Ok(true);
            }
            StateChange::PrevPage => {
                if s.current_page <= 1 {
                    return Ok(false);
                }
                s.current_page -= 1;
                return Ok(true);
            }
        }
        s.reset_page();
        Ok(true)
    }
}

/// A query issued for a new state, waiting for its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub generation: u64,
    pub query: ListQuery,
}

/// Result of [`ListController::begin`].
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Nothing changed; the current view, no query issued.
    Unchanged(ListView),
    Issued(PendingQuery),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Catalogue, ListResult, TableSpec};
    use crate::query::QueryBuilder;
    use crate::store::memory::InMemoryStore;
    use crate::store::RowStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;

    async fn models_builder(n: usize) -> QueryBuilder<InMemoryStore> {
        let store = InMemoryStore::new();
        let spec = TableSpec::models();
        let rows: Vec<Row> = (0..n)
            .map(|i| {
                let name = if i % 5 == 0 {
                    format!("stable-{}", i)
                } else {
                    format!("model-{}", i)
                };
                Row::new(format!("m{}", i), name)
                    .with_tags(if i % 2 == 0 { ["vision"] } else { ["nlp"] })
                    .with_field("runs", i as i64)
            })
            .collect();
        store.upsert_rows(&spec, &rows).await.unwrap();
        QueryBuilder::new(store, Catalogue::default())
    }

    /// Records every query; a query waits on the next queued gate, if any.
    struct GatedSource {
        inner: QueryBuilder<InMemoryStore>,
        gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
        calls: Mutex<Vec<ListQuery>>,
    }

    impl GatedSource {
        fn new(inner: QueryBuilder<InMemoryStore>) -> Self {
            Self {
                inner,
                gates: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn gate(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push_back(rx);
            tx
        }

        fn calls(&self) -> Vec<ListQuery> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ListSource for GatedSource {
        async fn list(&self, query: &ListQuery) -> Result<ListResult, QueryError> {
            let gate = {
                self.calls.lock().unwrap().push(query.clone());
                self.gates.lock().unwrap().pop_front()
            };
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.inner.run(query).await
        }

        async fn tags(&self, table_name: &str) -> Result<Vec<String>, QueryError> {
            self.inner.distinct_tags(table_name).await
        }
    }

    async fn wait_for_calls(source: &GatedSource, n: usize) {
        for _ in 0..200 {
            if source.calls().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {} queries to be issued", n);
    }

    #[tokio::test]
    async fn test_refresh_loads_first_page() {
        let c = ListController::new(models_builder(25).await, "modelsData");
        let view = c.refresh().await.unwrap();
        assert_eq!(view.total_count, 25);
        assert_eq!(view.filtered_data.len(), 10);
        assert_eq!(view.total_pages(), 3);
        assert_eq!(view.generation, 1);
    }

    #[tokio::test]
    async fn test_filter_change_resets_page() {
        let c = ListController::new(GatedSource::new(models_builder(60).await), "modelsData");
        c.refresh().await.unwrap();
        let view = c.set_page(5).await.unwrap();
        assert_eq!(view.current_page, 5);

        let view = c.set_search("stable").await.unwrap();
        assert_eq!(view.current_page, 1);
        assert_eq!(view.total_count, 12);

        c.set_page(2).await.unwrap();
        let view = c.toggle_tag("vision").await.unwrap();
        assert_eq!(view.current_page, 1);

        c.set_page(2).await.unwrap();
        let view = c.add_sort(SortSpec::asc("runs")).await.unwrap();
        assert_eq!(view.current_page, 1);

        let last = c.source().calls().pop().unwrap();
        assert_eq!(last.current_page, 1);
        assert_eq!(last.search_value, "stable");
        assert_eq!(last.selected_tags, vec!["vision"]);
        assert_eq!(last.sorts, vec![SortSpec::asc("runs")]);
    }

    #[tokio::test]
    async fn test_page_change_keeps_filters() {
        let c = ListController::new(GatedSource::new(models_builder(60).await), "modelsData");
        c.set_search("model").await.unwrap();
        let view = c.set_page(3).await.unwrap();
        assert_eq!(view.current_page, 3);
        assert_eq!(view.search_value, "model");
        let last = c.source().calls().pop().unwrap();
        assert_eq!(last.current_page, 3);
        assert_eq!(last.search_value, "model");
    }

    #[tokio::test]
    async fn test_unchanged_values_issue_no_query() {
        let c = ListController::new(GatedSource::new(models_builder(10).await), "modelsData");
        c.set_search("stable").await.unwrap();
        c.set_search("stable").await.unwrap();
        c.set_page(1).await.unwrap();
        c.add_sort(SortSpec::desc("runs")).await.unwrap();
        c.add_sort(SortSpec::desc("runs")).await.unwrap();
        c.remove_sort("creator").await.unwrap();
        c.clear_tags().await.unwrap();
        c.prev_page().await.unwrap();
        assert_eq!(c.source().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_add_sort_replaces_direction_in_place() {
        let c = ListController::new(models_builder(10).await, "modelsData");
        c.add_sort(SortSpec::desc("runs")).await.unwrap();
        c.add_sort(SortSpec::asc("modelName")).await.unwrap();
        let view = c.add_sort(SortSpec::asc("runs")).await.unwrap();
        assert_eq!(
            view.sorts,
            vec![SortSpec::asc("runs"), SortSpec::asc("modelName")]
        );
        assert_eq!(view.filtered_data[0].id, "m0");

        let view = c.remove_sort("runs").await.unwrap();
        assert_eq!(view.sorts, vec![SortSpec::asc("modelName")]);
        let view = c.clear_sorts().await.unwrap();
        assert!(view.sorts.is_empty());
        assert_eq!(view.filtered_data[0].id, "m9");
    }

    #[tokio::test]
    async fn test_toggle_tag_twice_unselects() {
        let c = ListController::new(models_builder(10).await, "modelsData");
        let view = c.toggle_tag("nlp").await.unwrap();
        assert_eq!(view.total_count, 5);
        let view = c.toggle_tag("vision").await.unwrap();
        assert_eq!(view.total_count, 10);
        let view = c.toggle_tag("nlp").await.unwrap();
        assert_eq!(view.selected_tags, vec!["vision"]);
        assert_eq!(view.total_count, 5);
    }

    #[tokio::test]
    async fn test_add_and_remove_tag_are_idempotent() {
        let c = ListController::new(GatedSource::new(models_builder(10).await), "modelsData");
        c.add_tag("nlp").await.unwrap();
        let view = c.add_tag("nlp").await.unwrap();
        assert_eq!(view.selected_tags, vec!["nlp"]);
        assert_eq!(view.total_count, 5);
        let view = c.remove_tag("nlp").await.unwrap();
        assert!(view.selected_tags.is_empty());
        c.remove_tag("nlp").await.unwrap();
        assert_eq!(c.source().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_next_and_prev_page_bounds() {
        let c = ListController::new(models_builder(25).await, "modelsData");
        c.refresh().await.unwrap();
        assert_eq!(c.next_page().await.unwrap().current_page, 2);
        assert_eq!(c.next_page().await.unwrap().current_page, 3);
        let view = c.next_page().await.unwrap();
        assert_eq!(view.current_page, 3);
        assert_eq!(view.filtered_data.len(), 5);
        assert_eq!(c.prev_page().await.unwrap().current_page, 2);
    }

    #[tokio::test]
    async fn test_set_page_zero_is_rejected_without_query() {
        let c = ListController::new(GatedSource::new(models_builder(10).await), "modelsData");
        c.refresh().await.unwrap();
        let err = c.set_page(0).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidQuery(_)));
        assert_eq!(c.view().current_page, 1);
        assert_eq!(c.source().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_error_keeps_last_good_page() {
        let c = ListController::new(models_builder(25).await, "modelsData");
        let good = c.refresh().await.unwrap();

        c.source().store().set_offline(true);
        let err = c.set_search("stable").await.unwrap_err();
        assert!(matches!(err, QueryError::UpstreamUnavailable(_)));

        let view = c.view();
        assert_eq!(view.search_value, "stable");
        assert_eq!(view.filtered_data, good.filtered_data);
        assert_eq!(view.total_count, 25);
        assert!(view.last_error.is_some());

        c.source().store().set_offline(false);
        let view = c.refresh().await.unwrap();
        assert_eq!(view.total_count, 5);
        assert!(view.last_error.is_none());
    }

    #[tokio::test]
    async fn test_latest_issued_wins_when_it_resolves_first() {
        let source = GatedSource::new(models_builder(30).await);
        let first_gate = source.gate();
        let second_gate = source.gate();
        let c = Arc::new(ListController::new(source, "modelsData"));

        let first = tokio::spawn({
            let c = Arc::clone(&c);
            async move { c.set_search("stable").await }
        });
        wait_for_calls(c.source(), 1).await;
        let second = tokio::spawn({
            let c = Arc::clone(&c);
            async move { c.set_search("model-1").await }
        });
        wait_for_calls(c.source(), 2).await;

        second_gate.send(()).unwrap();
        let applied = second.await.unwrap().unwrap();
        first_gate.send(()).unwrap();
        let stale = first.await.unwrap().unwrap_err();

        assert!(stale.is_stale());
        assert_eq!(
            stale,
            QueryError::StaleResponse {
                generation: 1,
                latest: 2
            }
        );
        let view = c.view();
        assert_eq!(view, applied);
        assert_eq!(view.search_value, "model-1");
        assert!(view
            .filtered_data
            .iter()
            .all(|r| r.name.contains("model-1")));
    }

    #[tokio::test]
    async fn test_latest_issued_wins_when_it_resolves_last() {
        let source = GatedSource::new(models_builder(30).await);
        let first_gate = source.gate();
        let second_gate = source.gate();
        let c = Arc::new(ListController::new(source, "modelsData"));

        let first = tokio::spawn({
            let c = Arc::clone(&c);
            async move { c.set_search("stable").await }
        });
        wait_for_calls(c.source(), 1).await;
        let second = tokio::spawn({
            let c = Arc::clone(&c);
            async move { c.set_search("model-1").await }
        });
        wait_for_calls(c.source(), 2).await;

        first_gate.send(()).unwrap();
        assert!(first.await.unwrap().unwrap_err().is_stale());
        // Nothing from the superseded query was applied.
        assert!(c.view().filtered_data.is_empty());

        second_gate.send(()).unwrap();
        second.await.unwrap().unwrap();
        let view = c.view();
        assert_eq!(view.search_value, "model-1");
        assert!(!view.filtered_data.is_empty());
        assert!(view
            .filtered_data
            .iter()
            .all(|r| r.name.contains("model-1")));
    }

    /// Delays each query by an amount chosen from its search text.
    struct SlowSource {
        inner: QueryBuilder<InMemoryStore>,
    }

    #[async_trait]
    impl ListSource for SlowSource {
        async fn list(&self, query: &ListQuery) -> Result<ListResult, QueryError> {
            let delay = if query.search_value == "stable" { 200 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.inner.run(query).await
        }

        async fn tags(&self, table_name: &str) -> Result<Vec<String>, QueryError> {
            self.inner.distinct_tags(table_name).await
        }
    }

    #[tokio::test]
    async fn test_second_query_fifty_ms_later_wins() {
        let c = Arc::new(ListController::new(
            SlowSource {
                inner: models_builder(30).await,
            },
            "modelsData",
        ));

        let first = tokio::spawn({
            let c = Arc::clone(&c);
            async move { c.set_search("stable").await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = c.set_search("model-2").await.unwrap();
        assert!(first.await.unwrap().unwrap_err().is_stale());

        let view = c.view();
        assert_eq!(view, second);
        assert!(view
            .filtered_data
            .iter()
            .all(|r| r.name.contains("model-2")));
    }

    #[tokio::test]
    async fn test_begin_orders_generations_by_call() {
        let c = ListController::new(models_builder(10).await, "modelsData");

        let Step::Issued(add) = c.begin(StateChange::AddTag("vision".into())).unwrap() else {
            panic!("adding a tag must issue a query");
        };
        let Step::Issued(remove) = c.begin(StateChange::RemoveTag("vision".into())).unwrap()
        else {
            panic!("removing a selected tag must issue a query");
        };
        assert!(remove.generation > add.generation);
        assert!(remove.query.selected_tags.is_empty());

        // Completed out of order: the older query still loses.
        let view = c.complete(remove).await.unwrap();
        assert!(c.complete(add).await.unwrap_err().is_stale());
        assert_eq!(c.view(), view);
        assert!(view.selected_tags.is_empty());
        assert_eq!(view.total_count, 10);

        assert!(matches!(
            c.begin(StateChange::RemoveTag("vision".into())).unwrap(),
            Step::Unchanged(_)
        ));
        assert!(c.begin(StateChange::SetPage(0)).is_err());
    }
}
