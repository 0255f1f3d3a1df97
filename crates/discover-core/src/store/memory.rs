//! In-memory [`RowStore`] implementation for tests and embedding.
//!
//! Collections are `Vec<Row>` in insertion order behind a
//! `std::sync::RwLock`. Every query is a linear scan.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::filter::{sort_rows, RowFilter};
use crate::models::{ResolvedSort, Row, TableSpec};

use super::{RowStore, UpsertSummary};

/// In-memory store keyed by collection name.
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    offline: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate an unreachable data source: every call fails while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("in-memory store is offline");
        }
        Ok(())
    }

    fn matching(&self, table: &TableSpec, filter: &RowFilter) -> Result<Vec<Row>> {
        self.check_online()?;
        let tables = self
            .tables
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        Ok(tables
            .get(&table.name)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RowStore for InMemoryStore {
    async fn count(&self, table: &TableSpec, filter: &RowFilter) -> Result<u64> {
        Ok(self.matching(table, filter)?.len() as u64)
    }

    async fn fetch(
        &self,
        table: &TableSpec,
        filter: &RowFilter,
        order: &[ResolvedSort],
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Row>> {
        let mut rows = self.matching(table, filter)?;
        sort_rows(&mut rows, order);
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn distinct_tags(&self, table: &TableSpec) -> Result<Vec<String>> {
        let rows = self.matching(table, &RowFilter::default())?;
        let tags: BTreeSet<String> = rows.into_iter().flat_map(|r| r.tags).collect();
        Ok(tags.into_iter().collect())
    }

    async fn upsert_rows(&self, table: &TableSpec, rows: &[Row]) -> Result<UpsertSummary> {
        self.check_online()?;
        let mut tables = self
            .tables
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        let stored = tables.entry(table.name.clone()).or_default();
        let mut summary = UpsertSummary::default();
        for row in rows {
            match stored.iter_mut().find(|r| r.id == row.id) {
                Some(existing) if existing == row => summary.unchanged += 1,
                Some(existing) => {
                    *existing = row.clone();
                    summary.updated += 1;
                }
                None => {
                    stored.push(row.clone());
                    summary.inserted += 1;
                }
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListQuery;

    async fn seeded() -> (InMemoryStore, TableSpec) {
        let store = InMemoryStore::new();
        let spec = TableSpec::models();
        let rows: Vec<Row> = (1..=25)
            .map(|i| {
                Row::new(i.to_string(), format!("model-{}", i))
                    .with_tags(if i % 2 == 0 { vec!["even"] } else { vec!["odd"] })
                    .with_field("runs", i * 10)
            })
            .collect();
        store.upsert_rows(&spec, &rows).await.unwrap();
        (store, spec)
    }

    #[tokio::test]
    async fn test_count_and_window() {
        let (store, spec) = seeded().await;
        let all = RowFilter::default();
        assert_eq!(store.count(&spec, &all).await.unwrap(), 25);

        let page = store
            .fetch(&spec, &all, &spec.default_order(), 20, 10)
            .await
            .unwrap();
        let ids: Vec<_> = page.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["5", "4", "3", "2", "1"]);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_empty() {
        let (store, _) = seeded().await;
        let spec = TableSpec::papers();
        assert_eq!(store.count(&spec, &RowFilter::default()).await.unwrap(), 0);
        assert!(store.distinct_tags(&spec).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_keeps_position_and_reports() {
        let (store, spec) = seeded().await;
        let summary = store
            .upsert_rows(
                &spec,
                &[
                    Row::new("1", "model-1")
                        .with_tags(["odd"])
                        .with_field("runs", 10),
                    Row::new("2", "renamed").with_tags(["even"]),
                    Row::new("26", "model-26"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(
            summary,
            UpsertSummary {
                inserted: 1,
                updated: 1,
                unchanged: 1
            }
        );

        let filter = RowFilter::from_query(&ListQuery::new("modelsData").search("renamed"));
        let rows = store.fetch(&spec, &filter, &[], 0, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "2");

        let unordered = store
            .fetch(&spec, &RowFilter::default(), &[], 0, 3)
            .await
            .unwrap();
        let ids: Vec<_> = unordered.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_distinct_tags_sorted() {
        let (store, spec) = seeded().await;
        assert_eq!(store.distinct_tags(&spec).await.unwrap(), vec!["even", "odd"]);
    }

    #[tokio::test]
    async fn test_offline_fails_every_call() {
        let (store, spec) = seeded().await;
        store.set_offline(true);
        assert!(store.count(&spec, &RowFilter::default()).await.is_err());
        assert!(store.upsert_rows(&spec, &[]).await.is_err());
        store.set_offline(false);
        assert!(store.count(&spec, &RowFilter::default()).await.is_ok());
    }
}
