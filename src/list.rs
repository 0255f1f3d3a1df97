//! `discover list` and `discover tags`: run one query and print the page.
//!
//! The same rendering is used by the interactive `browse` command.

use anyhow::Result;
use discover_core::format::format_large_number;
use discover_core::{ListQuery, ListResult, ListView, QueryBuilder, Row, SortSpec};
use serde_json::Value;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Query builder over the configured SQLite database.
pub fn query_builder(config: &Config, store: SqliteStore) -> QueryBuilder<SqliteStore> {
    QueryBuilder::new(store, config.catalogue()).with_max_page_size(config.listing.max_page_size)
}

/// Core list function returning structured data (used by CLI and tests).
pub async fn list_rows(config: &Config, query: &ListQuery) -> Result<ListResult> {
    let pool = db::connect(config).await?;
    let result = query_builder(config, SqliteStore::new(pool.clone()))
        .run(query)
        .await;
    pool.close().await;
    Ok(result?)
}

pub async fn run_list(config: &Config, query: &ListQuery, json: bool) -> Result<()> {
    let result = list_rows(config, query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let columns = display_columns(config, &query.table_name, &query.sorts);
    print!(
        "{}",
        render_page(
            &query.table_name,
            &result.data,
            result.total_count,
            query.current_page,
            query.page_size,
            &columns,
        )
    );
    Ok(())
}

pub async fn run_tags(config: &Config, table_name: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let tags = query_builder(config, SqliteStore::new(pool.clone()))
        .distinct_tags(table_name)
        .await;
    pool.close().await;
    let tags = tags?;

    if tags.is_empty() {
        println!("No tags.");
    }
    for tag in tags {
        println!("{}", tag);
    }
    Ok(())
}

/// Columns worth showing next to each row: the active sort columns, or the
/// table's default ranking column.
pub fn display_columns(config: &Config, table_name: &str, sorts: &[SortSpec]) -> Vec<String> {
    if !sorts.is_empty() {
        return sorts.iter().map(|s| s.column.clone()).collect();
    }
    config
        .catalogue()
        .get(table_name)
        .map(|t| vec![t.default_sort.clone()])
        .unwrap_or_default()
}

fn render_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .map(format_large_number)
            .unwrap_or_else(|| n.to_string()),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

fn render_row(position: u64, row: &Row, columns: &[String]) -> String {
    let mut line = format!("{:>4}. {} ({})", position, row.name, row.id);
    for column in columns {
        if column == "id" || column == "name" {
            continue;
        }
        if let Some(value) = row.fields.get(column) {
            line.push_str(&format!("  {}={}", column, render_value(Some(value))));
        }
    }
    if !row.tags.is_empty() {
        line.push_str(&format!("  [{}]", row.tags.join(", ")));
    }
    line
}

/// Render one page of results with a summary header.
pub fn render_page(
    table_name: &str,
    rows: &[Row],
    total_count: u64,
    current_page: u32,
    page_size: u32,
    columns: &[String],
) -> String {
    let total_pages = total_count.div_ceil(u64::from(page_size.max(1))).max(1);
    let mut out = format!(
        "{}: {} matching, page {} of {} ({} per page)\n",
        table_name, total_count, current_page, total_pages, page_size
    );
    if rows.is_empty() {
        out.push_str("No results.\n");
        return out;
    }
    out.push('\n');
    let offset = u64::from(current_page.saturating_sub(1)) * u64::from(page_size);
    for (i, row) in rows.iter().enumerate() {
        out.push_str(&render_row(offset + i as u64 + 1, row, columns));
        out.push('\n');
    }
    out
}

/// Render a controller view, including its active filters.
pub fn render_view(view: &ListView, columns: &[String]) -> String {
    let mut out = String::new();
    let mut filters = Vec::new();
    if !view.search_value.is_empty() {
        filters.push(format!("search: \"{}\"", view.search_value));
    }
    if !view.selected_tags.is_empty() {
        filters.push(format!("tags: {}", view.selected_tags.join(", ")));
    }
    if !view.sorts.is_empty() {
        let sorts: Vec<String> = view.sorts.iter().map(|s| s.to_string()).collect();
        filters.push(format!("sort: {}", sorts.join(", ")));
    }
    if !filters.is_empty() {
        out.push_str(&format!("[{}]\n", filters.join(" | ")));
    }
    out.push_str(&render_page(
        &view.table_name,
        &view.filtered_data,
        view.total_count,
        view.current_page,
        view.page_size,
        columns,
    ));
    out
}
