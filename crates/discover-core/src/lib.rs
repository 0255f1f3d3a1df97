//! # Discover Core
//!
//! Runtime-agnostic logic behind the AIModels discover listings: the row
//! model, the filter predicate and ordering rules, the [`store::RowStore`]
//! abstraction, the [`query::QueryBuilder`], and the
//! [`controller::ListController`] that keeps a displayed page in sync with
//! its search/tag/sort/page state.
//!
//! This crate contains no tokio, sqlx, HTTP or filesystem code.

pub mod controller;
pub mod error;
pub mod filter;
pub mod format;
pub mod models;
pub mod query;
pub mod store;

pub use controller::{ListController, ListView, PendingQuery, StateChange, Step};
pub use error::QueryError;
pub use models::{Catalogue, ListQuery, ListResult, Row, SortDirection, SortSpec, TableSpec};
pub use query::{ListSource, QueryBuilder};
