//! # AIModels Discover
//!
//! The listing layer behind the AIModels discover pages: filtered, sorted
//! and paginated queries over the model and paper collections, served from a
//! local SQLite database through a CLI and a JSON HTTP API.
//!
//! The query semantics and the last-write-wins list controller live in the
//! runtime-agnostic `discover-core` crate; this crate adds storage,
//! configuration, HTTP and the terminal front-ends.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌───────────────┐
//! │ JSON export│──▶│ import       │──▶│ SQLite        │
//! └────────────┘   └──────────────┘   │ listing_rows  │
//!                                     └──────┬────────┘
//!                                            │ RowStore
//!                                   ┌────────▼────────┐
//!                                   │  QueryBuilder   │
//!                                   └──┬──────────┬───┘
//!                                      ▼          ▼
//!                                ┌─────────┐ ┌──────────┐
//!                                │ CLI     │ │ HTTP API │
//!                                │ browse  │ │ (axum)   │
//!                                └─────────┘ └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! discover init
//! discover import modelsData ./models.json
//! discover list modelsData --search stable --tag Text-to-Image
//! discover browse modelsData
//! discover serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite-backed `RowStore` |
//! | [`import`] | JSON import with content-hash dedup |
//! | [`list`] | One-shot listing and rendering |
//! | [`stats`] | Database statistics |
//! | [`server`] | JSON HTTP API |
//! | [`remote`] | `ListSource` over the HTTP API |
//! | [`browse`] | Interactive terminal listing |

pub mod browse;
pub mod config;
pub mod db;
pub mod import;
pub mod list;
pub mod migrate;
pub mod remote;
pub mod server;
pub mod sqlite_store;
pub mod stats;
