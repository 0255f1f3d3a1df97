//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/discover.sqlite"
//! max_connections = 8       # optional
//! busy_timeout_secs = 5     # optional
//!
//! [server]
//! bind = "127.0.0.1:7340"
//!
//! [listing]
//! page_size = 10
//! max_page_size = 100
//!
//! [[tables]]
//! name = "modelsData"
//! name_field = "modelName"
//! default_sort = "runs"
//! sortable = ["runs", "modelName", "createdAt"]
//! ```
//!
//! `[[tables]]` is optional; without it the `modelsData` and `papersData`
//! collections are served.

use anyhow::{Context, Result};
use discover_core::{Catalogue, TableSpec};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default = "default_tables")]
    pub tables: Vec<TableSpec>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    /// Pool size shared by request handlers and browse tasks.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long a reader waits on an import's write lock, and how long a
    /// caller waits for a free connection.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

fn default_max_connections() -> u32 {
    8
}
fn default_busy_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    discover_core::models::DEFAULT_PAGE_SIZE
}
fn default_max_page_size() -> u32 {
    discover_core::query::DEFAULT_MAX_PAGE_SIZE
}

fn default_tables() -> Vec<TableSpec> {
    vec![TableSpec::models(), TableSpec::papers()]
}

impl Config {
    /// Configuration with every default and the given database path.
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig::new(path),
            server: ServerConfig::default(),
            listing: ListingConfig::default(),
            tables: default_tables(),
        }
    }

    pub fn catalogue(&self) -> Catalogue {
        Catalogue::new(self.tables.clone())
    }

    /// Check the invariants the rest of the application relies on.
    pub fn validate(&self) -> Result<()> {
        if self.db.max_connections == 0 {
            anyhow::bail!("db.max_connections must be > 0");
        }
        if self.listing.page_size == 0 {
            anyhow::bail!("listing.page_size must be > 0");
        }
        if self.listing.max_page_size < self.listing.page_size {
            anyhow::bail!("listing.max_page_size must be >= listing.page_size");
        }

        if self.tables.is_empty() {
            anyhow::bail!("at least one [[tables]] entry is required");
        }
        let mut seen = HashSet::new();
        for table in &self.tables {
            if table.name.trim().is_empty() {
                anyhow::bail!("tables.name must not be empty");
            }
            if !seen.insert(table.name.as_str()) {
                anyhow::bail!("duplicate table name: '{}'", table.name);
            }
            if table.default_sort.trim().is_empty() {
                anyhow::bail!("tables.{}.default_sort must not be empty", table.name);
            }
            let default_sort = discover_core::SortSpec::desc(table.default_sort.clone());
            if let Err(e) = table.resolve_sort(&default_sort) {
                anyhow::bail!("tables.{}.default_sort: {}", table.name, e);
            }
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
