//! Database schema migrations (idempotent).
//!
//! | Table | Contents |
//! |-------|----------|
//! | `listing_rows` | One row per record: collection, id, display name and its lowercase form, insertion position, remaining fields and tags as JSON, content hash |
//! | `listing_tags` | One row per (record, tag) pair, used for tag filtering |

use anyhow::Result;
use sqlx::{Row, SqlitePool};

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS listing_rows (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            name TEXT NOT NULL,
            name_lower TEXT NOT NULL DEFAULT '',
            position INTEGER NOT NULL,
            fields_json TEXT NOT NULL DEFAULT '{}',
            tags_json TEXT NOT NULL DEFAULT '[]',
            content_hash TEXT NOT NULL,
            imported_at INTEGER NOT NULL,
            PRIMARY KEY (collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    add_name_lower(pool).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS listing_tags (
            collection TEXT NOT NULL,
            row_id TEXT NOT NULL,
            tag TEXT NOT NULL,
            PRIMARY KEY (collection, row_id, tag),
            FOREIGN KEY (collection, row_id) REFERENCES listing_rows(collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_listing_rows_position ON listing_rows(collection, position)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_listing_tags_tag ON listing_tags(collection, tag)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Databases created before `name_lower` existed get the column and a
/// backfill. SQLite cannot fold non-ASCII case, so the names are folded here.
async fn add_name_lower(pool: &SqlitePool) -> Result<()> {
    let present: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('listing_rows') WHERE name = 'name_lower'",
    )
    .fetch_one(pool)
    .await?;
    if present > 0 {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    sqlx::query("ALTER TABLE listing_rows ADD COLUMN name_lower TEXT NOT NULL DEFAULT ''")
        .execute(&mut *tx)
        .await?;
    let rows = sqlx::query("SELECT collection, id, name FROM listing_rows")
        .fetch_all(&mut *tx)
        .await?;
    for row in rows {
        let name: String = row.try_get("name")?;
        sqlx::query("UPDATE listing_rows SET name_lower = ? WHERE collection = ? AND id = ?")
            .bind(name.to_lowercase())
            .bind(row.try_get::<String, _>("collection")?)
            .bind(row.try_get::<String, _>("id")?)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}
