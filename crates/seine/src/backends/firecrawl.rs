//! Firecrawl v1 API client.
//!
//! Every call needs an API key. Without one the client still constructs,
//! and each call fails with [`BackendError::NotConfigured`].

use super::{
    send_json, trim_base_url, BackendError, BatchScrapeOptions, CrawlBackend, CrawlOptions,
    MapOptions, ScrapeBackend, ScrapeOptions,
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::instrument;

const SCRAPE_GRACE: Duration = Duration::from_secs(5);
const JOB_TIMEOUT: Duration = Duration::from_secs(60);
const BATCH_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct FirecrawlClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl FirecrawlClient {
    pub fn new(base_url: &str, api_key: Option<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: trim_base_url(base_url),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn authorized(&self, method: reqwest::Method, path: &str) -> Result<reqwest::RequestBuilder, BackendError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(BackendError::NotConfigured("FIRECRAWL_API_KEY"))?;
        Ok(self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(key))
    }

    async fn post(&self, path: &str, body: Value, timeout: Duration) -> Result<Value, BackendError> {
        let request = self.authorized(reqwest::Method::POST, path)?.json(&body);
        let result: Value = send_json(request, timeout).await?;
        reject_unsuccessful(result)
    }
}

/// Firecrawl can answer 200 with `success: false`.
fn reject_unsuccessful(result: Value) -> Result<Value, BackendError> {
    if result.get("success") == Some(&Value::Bool(false)) {
        let reason = result["error"].as_str().unwrap_or("unknown error").to_string();
        return Err(BackendError::Rejected(reason));
    }
    Ok(result)
}

/// Job ids become a path segment, so only id characters are let through.
fn validate_job_id(job_id: &str) -> Result<(), BackendError> {
    let valid = !job_id.is_empty()
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(BackendError::InvalidJobId(job_id.to_string()))
    }
}

#[async_trait]
impl ScrapeBackend for FirecrawlClient {
    #[instrument(name = "firecrawl.scrape", skip(self, options))]
    async fn scrape(&self, url: &str, options: &ScrapeOptions) -> Result<Value, BackendError> {
        let body = json!({
            "url": url,
            "formats": options.formats,
            "waitFor": options.wait_for_ms,
            "timeout": options.timeout_ms,
        });
        let timeout = Duration::from_millis(options.timeout_ms) + SCRAPE_GRACE;
        self.post("/v1/scrape", body, timeout).await
    }

    #[instrument(name = "firecrawl.batch_scrape", skip(self, urls, options), fields(urls = urls.len()))]
    async fn batch_scrape(&self, urls: &[String], options: &BatchScrapeOptions) -> Result<Value, BackendError> {
        let mut body = json!({ "urls": urls, "formats": options.formats });
        if let Some(concurrency) = options.concurrency {
            body["maxConcurrency"] = json!(concurrency);
        }
        self.post("/v1/batch/scrape", body, BATCH_TIMEOUT).await
    }

    async fn health(&self) -> bool {
        self.is_configured()
    }
}

#[async_trait]
impl CrawlBackend for FirecrawlClient {
    #[instrument(name = "firecrawl.crawl", skip(self, options))]
    async fn crawl(&self, url: &str, options: &CrawlOptions) -> Result<Value, BackendError> {
        let body = json!({
            "url": url,
            "limit": options.limit,
            "maxDepth": options.max_depth,
            "includePaths": options.include_paths,
            "excludePaths": options.exclude_paths,
            "scrapeOptions": { "formats": ["markdown"] },
        });
        self.post("/v1/crawl", body, JOB_TIMEOUT).await
    }

    #[instrument(name = "firecrawl.crawl_status", skip(self))]
    async fn crawl_status(&self, job_id: &str) -> Result<Value, BackendError> {
        validate_job_id(job_id)?;
        let request = self.authorized(reqwest::Method::GET, &format!("/v1/crawl/{}", job_id))?;
        let result: Value = send_json(request, JOB_TIMEOUT).await?;
        reject_unsuccessful(result)
    }

    #[instrument(name = "firecrawl.map", skip(self, options))]
    async fn map(&self, url: &str, options: &MapOptions) -> Result<Value, BackendError> {
        let mut body = Map::new();
        body.insert("url".into(), json!(url));
        if let Some(search) = &options.search {
            body.insert("search".into(), json!(search));
        }
        if let Some(limit) = options.limit {
            body.insert("limit".into(), json!(limit));
        }
        if let Some(ignore) = options.ignore_sitemap {
            body.insert("ignoreSitemap".into(), json!(ignore));
        }
        self.post("/v1/map", Value::Object(body), JOB_TIMEOUT).await
    }

    #[instrument(name = "firecrawl.extract", skip(self, prompt, schema))]
    async fn extract(&self, url: &str, prompt: &str, schema: Option<&Value>) -> Result<Value, BackendError> {
        let mut body = json!({ "urls": [url], "prompt": prompt });
        if let Some(schema) = schema {
            body["schema"] = schema.clone();
        }
        self.post("/v1/extract", body, JOB_TIMEOUT).await
    }
}
