//! SQLite-backed [`RowStore`] implementation.
//!
//! Filters compile to a `WHERE` clause over `listing_rows`:
//!
//! - id allow-list: `r.id IN (...)`
//! - name search: `instr(r.name_lower, ?) > 0`
//! - match-any tags: `EXISTS (SELECT 1 FROM listing_tags ... AND t.tag IN (...))`
//!
//! Sort columns other than `id` and the display name are read from
//! `fields_json` with `json_extract`. Each key is preceded by an `IS NULL`
//! key so missing values sort last, and `position` breaks ties in insertion
//! order, matching [`discover_core::filter::compare_rows`].
//!
//! `name_lower` is folded in Rust when a row is written, since SQLite's
//! `lower()` only folds ASCII.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{QueryBuilder as SqlBuilder, Row as _, Sqlite, SqlitePool};

use discover_core::filter::RowFilter;
use discover_core::models::{ColumnRef, ResolvedSort, Row, SortDirection, TableSpec};
use discover_core::store::{RowStore, UpsertSummary};

/// SQLite implementation of the [`RowStore`] trait.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn push_filter(qb: &mut SqlBuilder<'_, Sqlite>, table: &TableSpec, filter: &RowFilter) {
    qb.push(" WHERE r.collection = ");
    qb.push_bind(table.name.clone());

    if !filter.ids.is_empty() {
        qb.push(" AND r.id IN (");
        let mut ids = qb.separated(", ");
        for id in &filter.ids {
            ids.push_bind(id.clone());
        }
        ids.push_unseparated(")");
    }

    if let Some(needle) = &filter.search {
        qb.push(" AND instr(r.name_lower, ");
        qb.push_bind(needle.clone());
        qb.push(") > 0");
    }

    if !filter.tags.is_empty() {
        qb.push(
            " AND EXISTS (SELECT 1 FROM listing_tags t \
             WHERE t.collection = r.collection AND t.row_id = r.id AND t.tag IN (",
        );
        let mut tags = qb.separated(", ");
        for tag in &filter.tags {
            tags.push_bind(tag.clone());
        }
        tags.push_unseparated("))");
    }
}

/// SQL expression reading one sort column.
fn column_expr(column: &ColumnRef) -> Result<String> {
    Ok(match column {
        ColumnRef::Id => "r.id".to_string(),
        ColumnRef::Name => "r.name".to_string(),
        ColumnRef::Field(key) => {
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                bail!("invalid sort column: '{}'", key);
            }
            let path = format!("'$.\"{}\"'", key);
            // Arrays and objects are not orderable; treat them as missing.
            format!(
                "(CASE WHEN json_type(r.fields_json, {path}) IN ('array', 'object') THEN NULL \
                 ELSE json_extract(r.fields_json, {path}) END)"
            )
        }
    })
}

fn push_order(qb: &mut SqlBuilder<'_, Sqlite>, order: &[ResolvedSort]) -> Result<()> {
    qb.push(" ORDER BY ");
    for sort in order {
        let expr = column_expr(&sort.column)?;
        let direction = match sort.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        qb.push(format!("{expr} IS NULL ASC, {expr} {direction}, "));
    }
    qb.push("r.position ASC");
    Ok(())
}

fn content_hash(row: &Row) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(row)?);
    Ok(format!("{:x}", hasher.finalize()))
}

#[async_trait]
impl RowStore for SqliteStore {
    async fn count(&self, table: &TableSpec, filter: &RowFilter) -> Result<u64> {
        let mut qb = SqlBuilder::new("SELECT COUNT(*) FROM listing_rows r");
        push_filter(&mut qb, table, filter);
        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .context("count query failed")?;
        Ok(count.max(0) as u64)
    }

    async fn fetch(
        &self,
        table: &TableSpec,
        filter: &RowFilter,
        order: &[ResolvedSort],
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Row>> {
        let mut qb = SqlBuilder::new("SELECT r.id, r.name, r.tags_json, r.fields_json FROM listing_rows r");
        push_filter(&mut qb, table, filter);
        push_order(&mut qb, order)?;
        qb.push(" LIMIT ");
        qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(offset).unwrap_or(i64::MAX));

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .context("page query failed")?;

        rows.iter()
            .map(|r| {
                let id: String = r.get("id");
                let tags_json: String = r.get("tags_json");
                let fields_json: String = r.get("fields_json");
                Ok(Row {
                    name: r.get("name"),
                    tags: serde_json::from_str(&tags_json)
                        .with_context(|| format!("corrupt tags for row {}", id))?,
                    fields: serde_json::from_str(&fields_json)
                        .with_context(|| format!("corrupt fields for row {}", id))?,
                    id,
                })
            })
            .collect()
    }

    async fn distinct_tags(&self, table: &TableSpec) -> Result<Vec<String>> {
        let tags: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT tag FROM listing_tags WHERE collection = ? ORDER BY tag ASC",
        )
        .bind(&table.name)
        .fetch_all(&self.pool)
        .await
        .context("tag query failed")?;
        Ok(tags)
    }

    async fn upsert_rows(&self, table: &TableSpec, rows: &[Row]) -> Result<UpsertSummary> {
        let now = chrono::Utc::now().timestamp();
        let mut summary = UpsertSummary::default();
        let mut tx = self.pool.begin().await?;

        let mut next_position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position), 0) FROM listing_rows WHERE collection = ?",
        )
        .bind(&table.name)
        .fetch_one(&mut *tx)
        .await?;

        for row in rows {
            let hash = content_hash(row)?;
            let existing: Option<String> = sqlx::query_scalar(
                "SELECT content_hash FROM listing_rows WHERE collection = ? AND id = ?",
            )
            .bind(&table.name)
            .bind(&row.id)
            .fetch_optional(&mut *tx)
            .await?;

            if existing.as_deref() == Some(hash.as_str()) {
                summary.unchanged += 1;
                continue;
            }

            let tags_json = serde_json::to_string(&row.tags)?;
            let fields_json = serde_json::to_string(&row.fields)?;

            if existing.is_some() {
                sqlx::query(
                    r#"
                    UPDATE listing_rows
                    SET name = ?, name_lower = ?, tags_json = ?, fields_json = ?,
                        content_hash = ?, imported_at = ?
                    WHERE collection = ? AND id = ?
                    "#,
                )
                .bind(&row.name)
                .bind(row.name.to_lowercase())
                .bind(&tags_json)
                .bind(&fields_json)
                .bind(&hash)
                .bind(now)
                .bind(&table.name)
                .bind(&row.id)
                .execute(&mut *tx)
                .await?;

                sqlx::query("DELETE FROM listing_tags WHERE collection = ? AND row_id = ?")
                    .bind(&table.name)
                    .bind(&row.id)
                    .execute(&mut *tx)
                    .await?;
                summary.updated += 1;
            } else {
                next_position += 1;
                sqlx::query(
                    r#"
                    INSERT INTO listing_rows (collection, id, name, name_lower, position,
                                              tags_json, fields_json, content_hash, imported_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&table.name)
                .bind(&row.id)
                .bind(&row.name)
                .bind(row.name.to_lowercase())
                .bind(next_position)
                .bind(&tags_json)
                .bind(&fields_json)
                .bind(&hash)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                summary.inserted += 1;
            }

            for tag in &row.tags {
                sqlx::query(
                    "INSERT OR IGNORE INTO listing_tags (collection, row_id, tag) VALUES (?, ?, ?)",
                )
                .bind(&table.name)
                .bind(&row.id)
                .bind(tag)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(summary)
    }
}
