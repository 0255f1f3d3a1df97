//! JSON HTTP API over the listing query layer.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/discover/{table}` | One page of a collection plus `totalCount` |
//! | `GET`  | `/api/discover/{table}/tags` | Distinct tags of a collection |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `GET /api/discover/{table}` accepts these query parameters, all optional:
//!
//! | Param | Example | Meaning |
//! |-------|---------|---------|
//! | `search` | `stable` | case-insensitive substring of the display name |
//! | `tags` | `Text-to-Image,Audio` | match-any tag filter |
//! | `sort` | `runs:desc,modelName:asc` | multi-key sort, highest priority first |
//! | `page` | `2` | 1-based page (default 1) |
//! | `pageSize` | `25` | rows per page (default `[listing].page_size`) |
//! | `ids` | `a1,b2` | restrict to these row ids |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "invalid_query", "message": "unknown table: 'usersData'" } }
//! ```
//!
//! Error codes: `invalid_query` (400), `upstream_unavailable` (503).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the discover pages can
//! call the API from another origin.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use discover_core::store::RowStore;
use discover_core::{ListQuery, ListResult, QueryBuilder, QueryError, SortSpec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::db;
use crate::list::query_builder;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
struct AppState<S> {
    builder: Arc<QueryBuilder<S>>,
    /// Page size used when a request does not send `pageSize`.
    page_size: u32,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            builder: self.builder.clone(),
            page_size: self.page_size,
        }
    }
}

/// Builds the API router over any row store.
pub fn router<S: RowStore + 'static>(builder: Arc<QueryBuilder<S>>, page_size: u32) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/discover/{table}", get(handle_list::<S>))
        .route("/api/discover/{table}/tags", get(handle_tags::<S>))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { builder, page_size })
}

/// Starts the HTTP server on `[server].bind`.
///
/// One connection pool is opened for the lifetime of the server and shared
/// by every request. The server stops on Ctrl-C, after in-flight requests
/// finish, and the pool is closed before returning.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let builder = Arc::new(query_builder(config, SqliteStore::new(pool.clone())));
    let app = router(builder, config.listing.page_size);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "discover API listening");
    println!("Discover API listening on http://{}", config.server.bind);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    pool.close().await;
    info!("server stopped");
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C; server runs until killed");
        std::future::pending::<()>().await;
    }
}

// ============ Error response ============

#[derive(Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Machine-readable code plus a human-readable message.
#[derive(Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        let code = err.code().to_string();
        let (status, message) = match err {
            QueryError::InvalidQuery(message) => (StatusCode::BAD_REQUEST, message),
            QueryError::UpstreamUnavailable(message) => {
                warn!(error = %message, "query failed");
                (StatusCode::SERVICE_UNAVAILABLE, message)
            }
            stale @ QueryError::StaleResponse { .. } => (StatusCode::CONFLICT, stale.to_string()),
        };
        AppError {
            status,
            code,
            message,
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/discover/{table} ============

/// Raw query-string parameters. Everything is parsed by hand so malformed
/// values produce the JSON error contract instead of a plain-text rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub search: Option<String>,
    pub tags: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    #[serde(alias = "page_size")]
    pub page_size: Option<String>,
    pub ids: Option<String>,
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_count(name: &str, raw: Option<&str>, default: u32) -> Result<u32, QueryError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(s) => s.parse().map_err(|_| {
            QueryError::InvalidQuery(format!("{} must be a positive integer, got '{}'", name, s))
        }),
    }
}

impl ListParams {
    /// Turn the parameters into a query for `table`.
    pub fn into_query(self, table: String, default_page_size: u32) -> Result<ListQuery, QueryError> {
        let sorts = split_list(self.sort.as_deref())
            .iter()
            .map(|s| s.parse::<SortSpec>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ListQuery {
            table_name: table,
            search_value: self.search.unwrap_or_default(),
            selected_tags: split_list(self.tags.as_deref()),
            sorts,
            page_size: parse_count("pageSize", self.page_size.as_deref(), default_page_size)?,
            current_page: parse_count("page", self.page.as_deref(), 1)?,
            ids: split_list(self.ids.as_deref()),
        })
    }
}

async fn handle_list<S: RowStore + 'static>(
    State(state): State<AppState<S>>,
    Path(table): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult>, AppError> {
    let query = params.into_query(table, state.page_size)?;
    let result = state.builder.run(&query).await?;
    Ok(Json(result))
}

// ============ GET /api/discover/{table}/tags ============

#[derive(Serialize, Deserialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

async fn handle_tags<S: RowStore + 'static>(
    State(state): State<AppState<S>>,
    Path(table): Path<String>,
) -> Result<Json<TagsResponse>, AppError> {
    let tags = state.builder.distinct_tags(&table).await?;
    Ok(Json(TagsResponse { tags }))
}
