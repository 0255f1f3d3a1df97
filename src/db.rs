//! SQLite pool for the listing tables.
//!
//! One pool is opened per process and shared by every command, request
//! handler and browse task. Listing traffic is many short reads racing an
//! occasional import, so the connections are tuned for that:
//!
//! - WAL journal, so reads never block on the importing writer
//! - `synchronous = NORMAL`, durable across application crashes under WAL
//! - a busy timeout, so a read that meets the import's checkpoint waits
//!   instead of failing with `SQLITE_BUSY`
//! - foreign keys on, so `listing_tags` cannot point at a missing row

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::time::Duration;

use crate::config::{Config, DbConfig};

/// Connection options for the configured database file.
pub fn connect_options(db: &DbConfig) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(&db.path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(db.busy_timeout_secs))
        .foreign_keys(true)
}

/// Open the listing database, creating the file and its parent directories.
///
/// Close the pool with [`SqlitePool::close`] before the process exits so
/// the WAL is checkpointed.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db = &config.db;

    if let Some(parent) = db.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }
    }

    SqlitePoolOptions::new()
        .max_connections(db.max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(db.busy_timeout_secs))
        .connect_with(connect_options(db))
        .await
        .with_context(|| format!("Failed to open database: {}", db.path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_connections_are_tuned_for_listing() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::with_db_path(tmp.path().join("nested/dir/discover.sqlite"));
        config.db.busy_timeout_secs = 3;
        let pool = connect(&config).await.unwrap();
        assert!(config.db.path.exists());

        let journal: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(journal, "wal");
        let synchronous: i64 = sqlx::query_scalar("PRAGMA synchronous")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(synchronous, 1);
        let busy: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(busy, 3000);
        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(foreign_keys, 1);

        pool.close().await;
    }

    #[test]
    fn test_zero_connections_rejected() {
        let mut config = Config::with_db_path("x.sqlite");
        config.db.max_connections = 0;
        assert!(config.validate().is_err());
    }
}
