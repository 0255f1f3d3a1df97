//! # AIModels Discover CLI (`discover`)
//!
//! Imports collection exports into SQLite, lists them with the same
//! filter/sort/page semantics as the discover pages, and serves them over
//! HTTP.
//!
//! ## Usage
//!
//! ```bash
//! discover --config ./config/discover.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `discover init` | Create the SQLite database and run schema migrations |
//! | `discover import <table> <file>` | Upsert a JSON export into a collection |
//! | `discover list <table>` | Print one page of a collection |
//! | `discover tags <table>` | Print the distinct tags of a collection |
//! | `discover stats` | Per-collection counts and last import time |
//! | `discover browse <table>` | Interactive listing (local or `--remote`) |
//! | `discover serve` | Start the JSON HTTP API |
//!
//! Logs go to stderr; set `RUST_LOG` (default `info`) to change verbosity.

use aimodels_discover::{browse, config, db, import, list, migrate, server, stats};
use clap::{Parser, Subcommand};
use discover_core::{ListQuery, SortSpec};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// AIModels Discover: filtered, sorted and paginated listings of AI models
/// and papers.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/discover.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "discover",
    about = "Filtered, sorted and paginated listings of AI models and papers",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/discover.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run more than once.
    Init,

    /// Upsert records from a JSON file into a collection.
    ///
    /// The file holds an array of records, or an object with a `data`
    /// array. Records are matched by `id`; unchanged records are skipped.
    Import {
        /// Collection name, e.g. `modelsData` or `papersData`.
        table: String,
        /// JSON file to import.
        file: PathBuf,
    },

    /// Print one page of a collection.
    List {
        table: String,

        /// Case-insensitive substring of the display name.
        #[arg(long, default_value = "")]
        search: String,

        /// Tag filter; repeat for match-any.
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Sort key as `column:asc` or `column:desc`; repeat for tie-breakers.
        #[arg(long = "sort")]
        sorts: Vec<SortSpec>,

        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Rows per page (defaults to `[listing].page_size`).
        #[arg(long)]
        page_size: Option<u32>,

        /// Restrict to these ids (comma-separated).
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,

        /// Print the raw `{data, totalCount}` JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the distinct tags of a collection.
    Tags { table: String },

    /// Show per-collection row and tag counts.
    Stats,

    /// Browse a collection interactively. Type `help` for commands.
    Browse {
        table: String,

        /// Query a running `discover serve` instead of the local database.
        #[arg(long)]
        remote: Option<String>,
    },

    /// Start the JSON HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Import { table, file } => {
            import::run_import(&cfg, &table, &file).await?;
        }
        Commands::List {
            table,
            search,
            tags,
            sorts,
            page,
            page_size,
            ids,
            json,
        } => {
            let query = ListQuery {
                table_name: table,
                search_value: search,
                selected_tags: tags,
                sorts,
                page_size: page_size.unwrap_or(cfg.listing.page_size),
                current_page: page,
                ids,
            };
            list::run_list(&cfg, &query, json).await?;
        }
        Commands::Tags { table } => {
            list::run_tags(&cfg, &table).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Browse { table, remote } => {
            browse::run_browse(&cfg, &table, remote.as_deref()).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
