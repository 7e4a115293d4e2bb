//! Crawl4AI scraping service client.

use super::{
    probe, send_json, trim_base_url, BackendError, BatchScrapeOptions, ScrapeBackend, ScrapeOptions,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::instrument;

/// Slack on top of the timeout handed to the service.
const SCRAPE_GRACE: Duration = Duration::from_secs(5);
const BATCH_TIMEOUT: Duration = Duration::from_secs(120);
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_BATCH_CONCURRENCY: usize = 3;
const MAX_BATCH_CONCURRENCY: usize = 5;

/// Crawl4AI envelope around every page result.
#[derive(Debug, Deserialize)]
struct PageEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl PageEnvelope {
    fn into_data(self) -> Result<Value, BackendError> {
        if self.success {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            Err(BackendError::Rejected(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

#[derive(Debug, Clone)]
pub struct Crawl4aiClient {
    http: reqwest::Client,
    base_url: String,
}

impl Crawl4aiClient {
    pub fn new(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: trim_base_url(base_url),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// LLM-driven extraction from one page.
    #[instrument(name = "crawl4ai.extract", skip(self, prompt, schema))]
    pub async fn extract(&self, url: &str, prompt: &str, schema: Option<&Value>) -> Result<Value, BackendError> {
        let request = self
            .http
            .post(format!("{}/extract", self.base_url))
            .json(&json!({ "url": url, "prompt": prompt, "schema": schema }));

        let envelope: PageEnvelope = send_json(request, EXTRACT_TIMEOUT).await?;
        envelope.into_data()
    }
}

fn batch_concurrency(requested: Option<usize>) -> usize {
    requested
        .filter(|c| *c > 0)
        .unwrap_or(DEFAULT_BATCH_CONCURRENCY)
        .min(MAX_BATCH_CONCURRENCY)
}

#[async_trait]
impl ScrapeBackend for Crawl4aiClient {
    #[instrument(name = "crawl4ai.scrape", skip(self, options))]
    async fn scrape(&self, url: &str, options: &ScrapeOptions) -> Result<Value, BackendError> {
        let body = json!({
            "url": url,
            "formats": options.formats,
            "wait_for": options.wait_for_ms,
            "timeout": options.timeout_ms,
            "proxy_url": options.proxy_url,
        });
        let request = self.http.post(format!("{}/scrape", self.base_url)).json(&body);
        let timeout = Duration::from_millis(options.timeout_ms) + SCRAPE_GRACE;

        let envelope: PageEnvelope = send_json(request, timeout).await?;
        let data = envelope.into_data()?;

        let words = data
            .pointer("/metadata/word_count")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        tracing::debug!(words, "page scraped");
        Ok(data)
    }

    #[instrument(name = "crawl4ai.batch_scrape", skip(self, urls, options), fields(urls = urls.len()))]
    async fn batch_scrape(&self, urls: &[String], options: &BatchScrapeOptions) -> Result<Value, BackendError> {
        let body = json!({
            "urls": urls,
            "formats": options.formats,
            "concurrency": batch_concurrency(options.concurrency),
        });
        let request = self.http.post(format!("{}/batch-scrape", self.base_url)).json(&body);

        let result: Value = send_json(request, BATCH_TIMEOUT).await?;
        let succeeded = result["results"]
            .as_array()
            .map(|r| r.iter().filter(|p| p["success"] == true).count())
            .unwrap_or(0);
        tracing::debug!(succeeded, total = urls.len(), "batch scrape complete");
        Ok(result)
    }

    async fn health(&self) -> bool {
        probe(&self.http, &format!("{}/health", self.base_url), HEALTH_TIMEOUT).await
    }
}
