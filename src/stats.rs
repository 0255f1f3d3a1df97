//! Database statistics and health overview.
//!
//! Per-collection row counts, tag vocabulary sizes and the time of the
//! last import. Used by `discover stats` to confirm imports landed.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;

/// Per-collection breakdown.
struct CollectionStats {
    collection: String,
    row_count: i64,
    tag_count: i64,
    last_import_ts: Option<i64>,
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let rows = sqlx::query(
        r#"
        SELECT
            r.collection,
            COUNT(*) AS row_count,
            (SELECT COUNT(DISTINCT t.tag) FROM listing_tags t
             WHERE t.collection = r.collection) AS tag_count,
            MAX(r.imported_at) AS last_import
        FROM listing_rows r
        GROUP BY r.collection
        ORDER BY r.collection
        "#,
    )
    .fetch_all(&pool)
    .await?;
    pool.close().await;

    let stats: Vec<CollectionStats> = rows
        .iter()
        .map(|row| CollectionStats {
            collection: row.get("collection"),
            row_count: row.get("row_count"),
            tag_count: row.get("tag_count"),
            last_import_ts: row.get("last_import"),
        })
        .collect();

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Discover Database Stats");
    println!("=======================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();

    if stats.is_empty() {
        println!("  No collections imported yet.");
        return Ok(());
    }

    println!(
        "  {:<16} {:>8} {:>8}  {}",
        "COLLECTION", "ROWS", "TAGS", "LAST IMPORT"
    );
    for s in &stats {
        let configured = config.catalogue().get(&s.collection).is_some();
        println!(
            "  {:<16} {:>8} {:>8}  {}{}",
            s.collection,
            s.row_count,
            s.tag_count,
            s.last_import_ts
                .map(format_ts_iso)
                .unwrap_or_else(|| "-".to_string()),
            if configured { "" } else { "  (not configured)" }
        );
    }

    Ok(())
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1_048_576), "3.0 MB");
    }

    #[test]
    fn test_format_ts_iso() {
        assert_eq!(format_ts_iso(0), "1970-01-01T00:00:00Z");
    }
}
