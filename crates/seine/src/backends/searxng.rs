//! SearXNG metasearch client.

use super::{probe, send_json, trim_base_url, BackendError, SearchBackend, SearchOptions, SearchResponse};
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SearxngClient {
    http: reqwest::Client,
    base_url: String,
}

impl SearxngClient {
    pub fn new(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: trim_base_url(base_url),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn query_params(query: &str, options: &SearchOptions) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", query.to_string()), ("format", "json".to_string())];
        if let Some(categories) = options.categories.as_ref().filter(|c| !c.is_empty()) {
            params.push(("categories", categories.join(",")));
        }
        if let Some(engines) = options.engines.as_ref().filter(|e| !e.is_empty()) {
            params.push(("engines", engines.join(",")));
        }
        if let Some(language) = &options.language {
            params.push(("language", language.clone()));
        }
        if let Some(page) = options.page {
            params.push(("pageno", page.to_string()));
        }
        if let Some(time_range) = &options.time_range {
            params.push(("time_range", time_range.clone()));
        }
        if let Some(safesearch) = options.safesearch {
            params.push(("safesearch", safesearch.to_string()));
        }
        params
    }
}

#[async_trait]
impl SearchBackend for SearxngClient {
    #[instrument(name = "searxng.search", skip(self, options), fields(base_url = %self.base_url))]
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse, BackendError> {
        let request = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&Self::query_params(query, options));

        let mut response: SearchResponse = send_json(request, SEARCH_TIMEOUT).await?;
        if response.query.is_empty() {
            response.query = query.to_string();
        }
        tracing::debug!(hits = response.results.len(), "search complete");
        Ok(response)
    }

    async fn health(&self) -> bool {
        probe(&self.http, &format!("{}/healthz", self.base_url), HEALTH_TIMEOUT).await
    }
}
