//! In-process backends for unit tests.

use super::{
    BackendError, BatchScrapeOptions, ScrapeBackend, ScrapeOptions, SearchBackend, SearchHit,
    SearchOptions, SearchResponse,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct FakeSearch {
    pub hits: Vec<SearchHit>,
    pub fail: Option<String>,
    /// Every query with the options it was sent with.
    pub searches: Mutex<Vec<(String, SearchOptions)>>,
}

impl FakeSearch {
    pub fn with_urls(urls: &[&str]) -> Self {
        let hits = urls
            .iter()
            .enumerate()
            .map(|(i, url)| SearchHit::new(format!("Result {}", i + 1), *url, format!("snippet {}", i + 1)))
            .collect();
        Self {
            hits,
            fail: None,
            searches: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            hits: Vec::new(),
            fail: Some(message.to_string()),
            searches: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SearchBackend for FakeSearch {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse, BackendError> {
        self.searches
            .lock()
            .unwrap()
            .push((query.to_string(), options.clone()));
        if let Some(message) = &self.fail {
            return Err(BackendError::Transport(message.clone()));
        }
        Ok(SearchResponse {
            query: query.to_string(),
            number_of_results: self.hits.len() as u64,
            results: self.hits.clone(),
            suggestions: vec![format!("{} tutorial", query)],
            unresponsive_engines: Vec::new(),
        })
    }

    async fn health(&self) -> bool {
        self.fail.is_none()
    }
}

/// What the fake scraper does for one URL.
#[derive(Clone)]
pub enum Page {
    Ok { delay: Duration },
    Timeout,
    Fail(String),
}

#[derive(Default)]
pub struct FakeScraper {
    pages: HashMap<String, Page>,
    pub calls: Mutex<Vec<String>>,
    pub proxies: Mutex<Vec<Option<String>>>,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl FakeScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: Page) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn peak(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScrapeBackend for FakeScraper {
    async fn scrape(&self, url: &str, options: &ScrapeOptions) -> Result<Value, BackendError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.proxies.lock().unwrap().push(options.proxy_url.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let page = self
            .pages
            .get(url)
            .cloned()
            .unwrap_or(Page::Ok { delay: Duration::from_millis(5) });
        let result = match page {
            Page::Ok { delay } => {
                tokio::time::sleep(delay).await;
                Ok(json!({ "markdown": format!("# {}", url) }))
            }
            Page::Timeout => {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err(BackendError::Timeout(Duration::from_millis(options.timeout_ms) + Duration::from_secs(5)))
            }
            Page::Fail(message) => Err(BackendError::Status {
                status: 502,
                body: message,
            }),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn batch_scrape(&self, urls: &[String], _options: &BatchScrapeOptions) -> Result<Value, BackendError> {
        Ok(json!({ "success": true, "total": urls.len(), "results": [] }))
    }

    async fn health(&self) -> bool {
        true
    }
}
