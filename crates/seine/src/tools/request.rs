//! Typed tool requests.
//!
//! A `tools/call` names a tool and carries loose JSON. [`ToolRequest::parse`]
//! turns that pair into one variant with typed arguments, so an unknown name
//! or malformed arguments fail before any backend is touched.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::args::*;
use crate::backends::BackendError;

#[derive(Debug, Clone)]
pub enum ToolRequest {
    // Firecrawl
    ScrapeUrl(ScrapeUrlArgs),
    BatchScrape(BatchScrapeArgs),
    CrawlWebsite(CrawlWebsiteArgs),
    MapWebsite(MapWebsiteArgs),
    ExtractStructuredData(ExtractArgs),
    GetCrawlStatus(CrawlStatusArgs),

    // SearXNG / Crawl4AI
    SearchWeb(SearchWebArgs),
    SearchAndScrape(SearchAndScrapeArgs),
    Crawl4aiScrape(Crawl4aiScrapeArgs),
}

/// Every tool name, in catalog order.
pub const TOOL_NAMES: [&str; 9] = [
    "scrape_url",
    "batch_scrape",
    "crawl_website",
    "map_website",
    "extract_structured_data",
    "get_crawl_status",
    "search_web",
    "search_and_scrape",
    "crawl4ai_scrape",
];

#[derive(Debug, Error)]
pub enum ToolCallError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: &'static str, message: String },

    /// A backend failed; `context` names the operation, e.g. "Search failed".
    #[error("{context}: {source}")]
    Failed {
        context: String,
        source: BackendError,
    },
}

impl ToolCallError {
    pub fn failed(context: impl Into<String>) -> impl FnOnce(BackendError) -> Self {
        let context = context.into();
        move |source| ToolCallError::Failed { context, source }
    }
}

fn args<T: DeserializeOwned>(tool: &'static str, arguments: Value) -> Result<T, ToolCallError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| ToolCallError::InvalidArguments {
        tool,
        message: e.to_string(),
    })
}

impl ToolRequest {
    pub fn parse(name: &str, arguments: Value) -> Result<Self, ToolCallError> {
        Ok(match name {
            "scrape_url" => ToolRequest::ScrapeUrl(args("scrape_url", arguments)?),
            "batch_scrape" => ToolRequest::BatchScrape(args("batch_scrape", arguments)?),
            "crawl_website" => ToolRequest::CrawlWebsite(args("crawl_website", arguments)?),
            "map_website" => ToolRequest::MapWebsite(args("map_website", arguments)?),
            "extract_structured_data" => {
                ToolRequest::ExtractStructuredData(args("extract_structured_data", arguments)?)
            }
            "get_crawl_status" => ToolRequest::GetCrawlStatus(args("get_crawl_status", arguments)?),
            "search_web" => ToolRequest::SearchWeb(args("search_web", arguments)?),
            "search_and_scrape" => ToolRequest::SearchAndScrape(args("search_and_scrape", arguments)?),
            "crawl4ai_scrape" => ToolRequest::Crawl4aiScrape(args("crawl4ai_scrape", arguments)?),
            other => return Err(ToolCallError::UnknownTool(other.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_tool_message() {
        let err = ToolRequest::parse("delete_internet", json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: delete_internet");
    }

    #[test]
    fn test_missing_required_argument() {
        let err = ToolRequest::parse("search_web", json!({ "options": {} })).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Invalid arguments for search_web:"), "{}", message);
        assert!(message.contains("query"));
    }

    #[test]
    fn test_null_arguments_treated_as_empty() {
        let err = ToolRequest::parse("get_crawl_status", Value::Null).unwrap_err();
        assert!(matches!(err, ToolCallError::InvalidArguments { tool: "get_crawl_status", .. }));
    }

    #[test]
    fn test_every_catalog_name_parses() {
        let samples = json!({
            "url": "https://a.example",
            "urls": ["https://a.example"],
            "prompt": "p",
            "jobId": "j",
            "query": "q"
        });
        for name in TOOL_NAMES {
            assert!(ToolRequest::parse(name, samples.clone()).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_failed_keeps_context() {
        let err = ToolCallError::failed("Search failed")(BackendError::Status {
            status: 503,
            body: "down".into(),
        });
        assert_eq!(err.to_string(), "Search failed: HTTP 503: down");
    }
}
