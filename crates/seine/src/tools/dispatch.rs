//! Tool dispatch: name + JSON arguments in, [`CallToolResult`] out.
//!
//! Every failure, from an unknown tool name to a backend timeout, comes back
//! as an error-flagged result. Nothing here produces a JSON-RPC error.

use async_trait::async_trait;
use baton::{CallToolResult, ErrorData, Handler, Implementation, Tool, ToolCallRequest};
use serde_json::{json, Value};
use seineconf::SeineConfig;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use super::args::{SearchAndScrapeArgs, SearchWebArgs};
use super::catalog::catalog;
use super::fanout::{FanoutAggregator, FanoutPolicy, FanoutRequest};
use super::request::{ToolCallError, ToolRequest};
use crate::backends::{
    truncate, BackendError, Backends, BatchScrapeOptions, CrawlOptions, MapOptions, ScrapeOptions,
    SearchOptions,
};

/// Longest argument summary written to the call log.
const ARGS_SUMMARY_LIMIT: usize = 1024;

const INSTRUCTIONS: &str = "Web search and scraping tools. search_web queries SearXNG; \
    search_and_scrape searches and scrapes the top results in one call; \
    crawl4ai_scrape scrapes one page through the configured proxy. \
    The Firecrawl tools (scrape_url, batch_scrape, crawl_website, map_website, \
    extract_structured_data, get_crawl_status) need FIRECRAWL_API_KEY.";

pub struct ToolDispatcher {
    backends: Backends,
    fanout: FanoutAggregator,
    proxy_url: Option<String>,
    tools: Vec<Tool>,
}

impl ToolDispatcher {
    pub fn new(backends: Backends, policy: FanoutPolicy, proxy_url: Option<String>) -> Self {
        let fanout = FanoutAggregator::new(
            Arc::clone(&backends.search),
            Arc::clone(&backends.crawl4ai),
            policy,
        )
        .with_proxy(proxy_url.clone());

        Self {
            backends,
            fanout,
            proxy_url,
            tools: catalog(),
        }
    }

    /// Real backend clients and fan-out limits from configuration.
    pub fn from_config(config: &SeineConfig) -> Result<Self, BackendError> {
        let backends = Backends::from_config(&config.backends)?;
        Ok(Self::new(
            backends,
            FanoutPolicy::from_config(&config.fanout),
            config.backends.proxy_url.clone(),
        ))
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    /// Run one tool call with logging. Never fails; errors become error results.
    pub async fn call(&self, name: &str, arguments: Value, session_id: Option<&str>) -> CallToolResult {
        let span = info_span!(
            "mcp.tool.call",
            tool = %name,
            session_id = session_id.unwrap_or("-"),
        );

        async move {
            let started = Instant::now();
            info!(args = %truncate(&arguments.to_string(), ARGS_SUMMARY_LIMIT), "tool call started");

            let outcome = match ToolRequest::parse(name, arguments) {
                Ok(request) => self.execute(request).await,
                Err(e) => Err(e),
            };
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(value) => {
                    info!(duration_ms, is_error = false, "tool call finished");
                    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                    CallToolResult::text(text)
                }
                Err(e) => {
                    warn!(duration_ms, is_error = true, error = %e, "tool call failed");
                    CallToolResult::error(e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    pub async fn execute(&self, request: ToolRequest) -> Result<Value, ToolCallError> {
        let firecrawl = &self.backends.firecrawl;

        match request {
            ToolRequest::ScrapeUrl(args) => {
                let options = ScrapeOptions {
                    formats: args.options.formats,
                    wait_for_ms: args.options.wait_for,
                    timeout_ms: args.options.timeout,
                    proxy_url: None,
                };
                firecrawl
                    .scrape(&args.url, &options)
                    .await
                    .map_err(ToolCallError::failed("Firecrawl scrape failed"))
            }

            ToolRequest::BatchScrape(args) => {
                let options = BatchScrapeOptions {
                    formats: args.options.formats,
                    concurrency: args.options.concurrency,
                };
                firecrawl
                    .batch_scrape(&args.urls, &options)
                    .await
                    .map_err(ToolCallError::failed("Firecrawl batch scrape failed"))
            }

            ToolRequest::CrawlWebsite(args) => {
                let options = CrawlOptions {
                    limit: args.options.limit,
                    max_depth: args.options.max_depth,
                    include_paths: args.options.include_paths,
                    exclude_paths: args.options.exclude_paths,
                };
                firecrawl
                    .crawl(&args.url, &options)
                    .await
                    .map_err(ToolCallError::failed("Firecrawl crawl failed"))
            }

            ToolRequest::MapWebsite(args) => {
                let options = MapOptions {
                    search: args.options.search,
                    limit: args.options.limit,
                    ignore_sitemap: args.options.ignore_sitemap,
                };
                firecrawl
                    .map(&args.url, &options)
                    .await
                    .map_err(ToolCallError::failed("Firecrawl map failed"))
            }

            ToolRequest::ExtractStructuredData(args) => firecrawl
                .extract(&args.url, &args.prompt, args.schema.as_ref())
                .await
                .map_err(ToolCallError::failed("Firecrawl extract failed")),

            ToolRequest::GetCrawlStatus(args) => firecrawl
                .crawl_status(&args.job_id)
                .await
                .map_err(ToolCallError::failed("Firecrawl crawl status failed")),

            ToolRequest::SearchWeb(args) => self
                .search_web(args)
                .await
                .map_err(ToolCallError::failed("Search failed")),

            ToolRequest::SearchAndScrape(args) => self
                .search_and_scrape(args)
                .await
                .map_err(ToolCallError::failed("Search and scrape failed")),

            ToolRequest::Crawl4aiScrape(args) => {
                let options = ScrapeOptions {
                    formats: args.options.formats,
                    wait_for_ms: args.options.wait_for,
                    timeout_ms: args.options.timeout,
                    proxy_url: self.proxy_url.clone(),
                };
                let data = self
                    .backends
                    .crawl4ai
                    .scrape(&args.url, &options)
                    .await
                    .map_err(ToolCallError::failed("Crawl4AI scrape failed"))?;
                Ok(json!({ "success": true, "url": args.url, "data": data }))
            }
        }
    }

    async fn search_web(&self, args: SearchWebArgs) -> Result<Value, BackendError> {
        let options = SearchOptions {
            engines: args.options.engines.map(|e| e.into_vec()),
            categories: args.options.categories.map(|c| c.into_vec()),
            language: Some(args.options.language),
            page: Some(args.options.limit.filter(|p| *p > 0).unwrap_or(1)),
            time_range: args.options.time_range.filter(|t| !t.trim().is_empty()),
            safesearch: args.options.safesearch.map(|level| level.min(2)),
        };
        let response = self.backends.search.search(&args.query, &options).await?;

        let results: Vec<Value> = response
            .results
            .iter()
            .map(|hit| {
                json!({
                    "title": hit.title,
                    "url": hit.url,
                    "content": hit.content,
                    "publishedDate": hit.published_date,
                })
            })
            .collect();

        Ok(json!({
            "query": response.query,
            "total_results": response.number_of_results,
            "results": results,
            "suggestions": response.suggestions,
            "engine_info": { "unresponsive": response.unresponsive_engines },
        }))
    }

    async fn search_and_scrape(&self, args: SearchAndScrapeArgs) -> Result<Value, BackendError> {
        let request = FanoutRequest {
            query: args.query,
            max_results: args.options.max_results,
            engines: args.options.engines.map(|e| e.into_vec()),
            language: args.options.language,
            formats: args.options.scrape_formats,
        };
        let outcome = self.fanout.run(&request).await?;
        serde_json::to_value(outcome).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Handler for ToolDispatcher {
    fn tools(&self) -> Vec<Tool> {
        self.tools.clone()
    }

    async fn call_tool(&self, request: ToolCallRequest) -> Result<CallToolResult, ErrorData> {
        Ok(self
            .call(&request.name, request.arguments, request.session_id.as_deref())
            .await)
    }

    fn server_info(&self) -> Implementation {
        Implementation::new("seine", env!("CARGO_PKG_VERSION"))
    }

    fn instructions(&self) -> Option<String> {
        Some(INSTRUCTIONS.to_string())
    }
}
