//! Search, then scrape the top hits concurrently.
//!
//! One search call picks the URLs. Scrapes run on a [`JoinSet`] gated by a
//! [`Semaphore`], and results are put back in search-rank order whatever
//! order they finish in. A failed scrape becomes a failed item; only a
//! failed search fails the whole call.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn, Instrument};

use crate::backends::{BackendError, ScrapeBackend, ScrapeOptions, SearchBackend, SearchHit, SearchOptions};
use seineconf::FanoutConfig;

/// Limits for one fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanoutPolicy {
    pub concurrency: usize,
    pub default_max_results: usize,
    pub max_results_cap: usize,
}

impl Default for FanoutPolicy {
    fn default() -> Self {
        Self::from_config(&FanoutConfig::default())
    }
}

impl FanoutPolicy {
    pub fn from_config(config: &FanoutConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            default_max_results: config.default_max_results,
            max_results_cap: config.max_results_cap,
        }
    }

    /// How many hits to scrape. Zero or absent means the default.
    pub fn effective_max(&self, requested: Option<usize>) -> usize {
        requested
            .filter(|n| *n > 0)
            .unwrap_or(self.default_max_results)
            .min(self.max_results_cap)
    }

    fn permits(&self) -> usize {
        self.concurrency.clamp(1, Semaphore::MAX_PERMITS)
    }
}

/// One search-and-scrape call.
#[derive(Debug, Clone)]
pub struct FanoutRequest {
    pub query: String,
    pub max_results: Option<usize>,
    pub engines: Option<Vec<String>>,
    pub language: String,
    pub formats: Vec<String>,
}

impl FanoutRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: None,
            engines: None,
            language: "en".to_string(),
            formats: vec!["markdown".to_string()],
        }
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchInfo {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FanoutItem {
    pub search_info: SearchInfo,
    /// Page data on success, `{"error": "..."}` on failure.
    pub scraped_content: Value,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FanoutOutcome {
    Empty {
        query: String,
        search_results: u64,
        scraped_results: Vec<Value>,
        message: String,
    },
    Completed {
        query: String,
        search_results: u64,
        scraped_count: usize,
        results: Vec<FanoutItem>,
    },
}

impl FanoutOutcome {
    fn empty(query: &str) -> Self {
        FanoutOutcome::Empty {
            query: query.to_string(),
            search_results: 0,
            scraped_results: Vec::new(),
            message: "No search results found".to_string(),
        }
    }

    pub fn items(&self) -> &[FanoutItem] {
        match self {
            FanoutOutcome::Empty { .. } => &[],
            FanoutOutcome::Completed { results, .. } => results,
        }
    }
}

pub struct FanoutAggregator {
    search: Arc<dyn SearchBackend>,
    scraper: Arc<dyn ScrapeBackend>,
    policy: FanoutPolicy,
    proxy_url: Option<String>,
}

impl FanoutAggregator {
    pub fn new(search: Arc<dyn SearchBackend>, scraper: Arc<dyn ScrapeBackend>, policy: FanoutPolicy) -> Self {
        Self {
            search,
            scraper,
            policy,
            proxy_url: None,
        }
    }

    /// Route every scrape through this proxy.
    pub fn with_proxy(mut self, proxy_url: Option<String>) -> Self {
        self.proxy_url = proxy_url;
        self
    }

    pub fn policy(&self) -> FanoutPolicy {
        self.policy
    }

    /// Only a search failure is an error; scrape failures land in the items.
    #[instrument(name = "fanout.run", skip(self, request), fields(query = %request.query))]
    pub async fn run(&self, request: &FanoutRequest) -> Result<FanoutOutcome, BackendError> {
        let started = Instant::now();
        let options = SearchOptions {
            engines: request.engines.clone(),
            language: Some(request.language.clone()),
            ..Default::default()
        };
        let response = self.search.search(&request.query, &options).await?;

        let candidates: Vec<SearchHit> = response
            .results
            .into_iter()
            .filter(|hit| !hit.url.trim().is_empty())
            .collect();
        if candidates.is_empty() {
            info!(duration_ms = started.elapsed().as_millis() as u64, "no search results");
            return Ok(FanoutOutcome::empty(&request.query));
        }

        let max = self.policy.effective_max(request.max_results);
        let hits: Vec<SearchHit> = candidates.into_iter().take(max).collect();
        info!(urls = hits.len(), concurrency = self.policy.permits(), "scraping top results");

        let scrape_options = ScrapeOptions {
            formats: request.formats.clone(),
            proxy_url: self.proxy_url.clone(),
            ..Default::default()
        };
        let pages = self.scrape_all(&hits, &scrape_options).await;

        let results: Vec<FanoutItem> = hits
            .into_iter()
            .zip(pages)
            .map(|(hit, page)| {
                let (scraped_content, success) = match page {
                    Ok(data) => (data, true),
                    Err(e) => (json!({ "error": e.to_string() }), false),
                };
                FanoutItem {
                    search_info: SearchInfo {
                        title: hit.title,
                        url: hit.url,
                        snippet: hit.content,
                    },
                    scraped_content,
                    success,
                }
            })
            .collect();

        let scraped_count = results.iter().filter(|r| r.success).count();
        info!(
            scraped_count,
            attempted = results.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "fan-out finished"
        );

        Ok(FanoutOutcome::Completed {
            query: request.query.clone(),
            search_results: response.number_of_results,
            scraped_count,
            results,
        })
    }

    /// Scrape every hit, at most `permits` at a time, returning results in hit order.
    async fn scrape_all(&self, hits: &[SearchHit], options: &ScrapeOptions) -> Vec<Result<Value, BackendError>> {
        let semaphore = Arc::new(Semaphore::new(self.policy.permits()));
        let mut tasks = JoinSet::new();
        let mut ranks = HashMap::with_capacity(hits.len());

        for (rank, hit) in hits.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let scraper = Arc::clone(&self.scraper);
            let url = hit.url.clone();
            let options = options.clone();
            let span = tracing::debug_span!("fanout.scrape", rank, url = %url);

            let handle = tasks.spawn(
                async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| BackendError::Transport("scrape pool closed".to_string()))?;
                    scraper.scrape(&url, &options).await
                }
                .instrument(span),
            );
            ranks.insert(handle.id(), rank);
        }

        let mut pages: Vec<Option<Result<Value, BackendError>>> = (0..hits.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, result)) => {
                    if let Some(rank) = ranks.get(&id) {
                        pages[*rank] = Some(result);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "scrape task failed");
                    if let Some(rank) = ranks.get(&e.id()) {
                        pages[*rank] = Some(Err(BackendError::Transport(format!("scrape task failed: {}", e))));
                    }
                }
            }
        }

        pages
            .into_iter()
            .map(|page| page.unwrap_or_else(|| Err(BackendError::Transport("scrape task lost".to_string()))))
            .collect()
    }
}
