//! Error taxonomy of the query layer.

use thiserror::Error;

/// Failure of a single query attempt.
///
/// None of these are fatal: each is scoped to one request, and the list
/// controller keeps its last-known-good page when one occurs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Malformed or unrecognized request (unknown table, bad page, bad sort).
    /// Retrying the same request cannot succeed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The data source could not be reached or failed while answering.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The response belongs to a request that has since been superseded.
    #[error("stale response: generation {generation} superseded by {latest}")]
    StaleResponse { generation: u64, latest: u64 },
}

impl QueryError {
    /// Machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::InvalidQuery(_) => "invalid_query",
            QueryError::UpstreamUnavailable(_) => "upstream_unavailable",
            QueryError::StaleResponse { .. } => "stale_response",
        }
    }

    /// Wrap a data-source failure, keeping the whole cause chain.
    pub fn upstream(err: anyhow::Error) -> Self {
        QueryError::UpstreamUnavailable(format!("{:#}", err))
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, QueryError::StaleResponse { .. })
    }
}
