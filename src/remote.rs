//! [`ListSource`] backed by a running discover API.
//!
//! Lets `discover browse --remote URL` drive a [`ListController`] against
//! another process. Transport failures and 5xx responses become
//! `UpstreamUnavailable`; 4xx responses become `InvalidQuery` carrying the
//! server's message.
//!
//! Tags are sent comma-separated, so a tag containing `,` cannot be selected
//! over HTTP.
//!
//! [`ListController`]: discover_core::ListController

use async_trait::async_trait;
use discover_core::{ListQuery, ListResult, ListSource, QueryError};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::server::{ErrorBody, TagsResponse};

pub struct HttpListSource {
    client: Client,
    base_url: Url,
}

impl HttpListSource {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:7340`.
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("invalid remote URL '{}': {}", base_url, e))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("invalid remote URL '{}': not a base URL", base_url);
        }
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, QueryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| QueryError::InvalidQuery(format!("bad base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&str, String)],
    ) -> Result<T, QueryError> {
        debug!(url = %url, "remote list request");
        let resp = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| QueryError::upstream(e.into()))?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, QueryError> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json::<T>()
            .await
            .map_err(|e| QueryError::upstream(e.into()));
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| format!("HTTP {}: {}", status, body.trim()));

    if status.is_client_error() {
        Err(QueryError::InvalidQuery(message))
    } else {
        Err(QueryError::UpstreamUnavailable(message))
    }
}

fn list_params(query: &ListQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("page", query.current_page.to_string()),
        ("pageSize", query.page_size.to_string()),
    ];
    if !query.search_value.is_empty() {
        params.push(("search", query.search_value.clone()));
    }
    if !query.selected_tags.is_empty() {
        params.push(("tags", query.selected_tags.join(",")));
    }
    if !query.sorts.is_empty() {
        let sorts: Vec<String> = query.sorts.iter().map(|s| s.to_string()).collect();
        params.push(("sort", sorts.join(",")));
    }
    if !query.ids.is_empty() {
        params.push(("ids", query.ids.join(",")));
    }
    params
}

#[async_trait]
impl ListSource for HttpListSource {
    async fn list(&self, query: &ListQuery) -> Result<ListResult, QueryError> {
        let url = self.endpoint(&["api", "discover", &query.table_name])?;
        self.get_json(url, &list_params(query)).await
    }

    async fn tags(&self, table_name: &str) -> Result<Vec<String>, QueryError> {
        let url = self.endpoint(&["api", "discover", table_name, "tags"])?;
        let resp: TagsResponse = self.get_json(url, &[]).await?;
        Ok(resp.tags)
    }
}
