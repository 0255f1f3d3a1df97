//! `discover import`: load a JSON export into a collection.
//!
//! Accepts either a JSON array of records or an object with a `data` array
//! (the shape returned by `GET /api/discover/{table}`). Each record is
//! mapped with the collection's `name_field`/`tags_field`, then upserted by
//! id; records whose content hash is unchanged are skipped.

use anyhow::{bail, Context, Result};
use discover_core::store::{RowStore, UpsertSummary};
use discover_core::Row;
use serde_json::Value;
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// Parse an export file into rows for `table_name`.
pub fn parse_rows(config: &Config, table_name: &str, content: &str) -> Result<Vec<Row>> {
    let catalogue = config.catalogue();
    let spec = catalogue.require(table_name)?;

    let value: Value = serde_json::from_str(content).context("import file is not valid JSON")?;
    let records = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("data") {
            Some(Value::Array(items)) => items,
            _ => bail!("expected a JSON array or an object with a \"data\" array"),
        },
        _ => bail!("expected a JSON array or an object with a \"data\" array"),
    };

    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            Row::from_json(spec, record).with_context(|| format!("record #{} is invalid", i + 1))
        })
        .collect()
}

/// Import a file and return what changed.
pub async fn import_file(config: &Config, table_name: &str, path: &Path) -> Result<UpsertSummary> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;
    let rows = parse_rows(config, table_name, &content)?;

    let catalogue = config.catalogue();
    let spec = catalogue.require(table_name)?;

    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    let store = SqliteStore::new(pool.clone());
    let summary = store.upsert_rows(spec, &rows).await;
    pool.close().await;
    let summary = summary?;

    info!(
        table = table_name,
        inserted = summary.inserted,
        updated = summary.updated,
        unchanged = summary.unchanged,
        "import finished"
    );
    Ok(summary)
}

pub async fn run_import(config: &Config, table_name: &str, path: &Path) -> Result<()> {
    let summary = import_file(config, table_name, path).await?;
    println!("Import {} from {}", table_name, path.display());
    println!("  inserted:  {}", summary.inserted);
    println!("  updated:   {}", summary.updated);
    println!("  unchanged: {}", summary.unchanged);
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::with_db_path("unused.sqlite")
    }

    #[test]
    fn test_parse_array() {
        let rows = parse_rows(
            &config(),
            "papersData",
            r#"[{"id": "2401.00001", "title": "Scaling Laws", "tags": ["cs.LG"], "totalScore": 12.5}]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Scaling Laws");
        assert_eq!(rows[0].tags, vec!["cs.LG"]);
    }

    #[test]
    fn test_parse_api_response_shape() {
        let rows = parse_rows(
            &config(),
            "modelsData",
            r#"{"data": [{"id": "1", "name": "whisper", "tags": []}], "totalCount": 1}"#,
        )
        .unwrap();
        assert_eq!(rows[0].name, "whisper");
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_rows(&config(), "nopeData", "[]").is_err());
        assert!(parse_rows(&config(), "modelsData", "{\"rows\": []}").is_err());
        let err = parse_rows(&config(), "modelsData", r#"[{"id": "1"}, {"modelName": "x"}]"#)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("record #2"));
    }
}
