//! Tool argument types.
//!
//! Field names follow the wire: Firecrawl tools use camelCase option names
//! (`waitFor`, `maxDepth`), the SearXNG and Crawl4AI tools use snake_case
//! (`wait_for`, `max_results`). Every options object is optional.

use baton::schema_helpers::{optional_u32_schema, optional_u64_schema, u32_schema, u64_schema};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn markdown() -> Vec<String> {
    vec!["markdown".to_string()]
}

fn english() -> String {
    "en".to_string()
}

fn thirty_seconds() -> u64 {
    30_000
}

/// A comma-separated string or a list of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum StringList {
    Joined(String),
    List(Vec<String>),
}

impl StringList {
    pub fn into_vec(self) -> Vec<String> {
        let items = match self {
            StringList::Joined(s) => s.split(',').map(str::to_string).collect(),
            StringList::List(v) => v,
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

// ============================================================================
// Firecrawl tools
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScrapeUrlArgs {
    #[schemars(description = "The URL to scrape")]
    pub url: String,

    #[serde(default)]
    pub options: PageOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageOptions {
    #[serde(default = "markdown")]
    #[schemars(description = "Output formats (markdown, html, rawHtml, links, screenshot)")]
    pub formats: Vec<String>,

    #[serde(rename = "waitFor", default)]
    #[schemars(description = "Wait time in milliseconds", schema_with = "u64_schema")]
    pub wait_for: u64,

    #[serde(default = "thirty_seconds")]
    #[schemars(description = "Timeout in milliseconds", schema_with = "u64_schema")]
    pub timeout: u64,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            formats: markdown(),
            wait_for: 0,
            timeout: thirty_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchScrapeArgs {
    #[schemars(description = "URLs to scrape")]
    pub urls: Vec<String>,

    #[serde(default)]
    pub options: BatchOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchOptions {
    #[serde(default = "markdown")]
    #[schemars(description = "Output formats")]
    pub formats: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Number of concurrent requests", schema_with = "optional_u64_schema")]
    pub concurrency: Option<usize>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            formats: markdown(),
            concurrency: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CrawlWebsiteArgs {
    #[schemars(description = "The base URL to start crawling from")]
    pub url: String,

    #[serde(default)]
    pub options: CrawlArgsOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CrawlArgsOptions {
    #[serde(default = "CrawlArgsOptions::default_limit")]
    #[schemars(description = "Maximum number of pages to crawl", schema_with = "u32_schema")]
    pub limit: u32,

    #[serde(rename = "maxDepth", default = "CrawlArgsOptions::default_max_depth")]
    #[schemars(description = "Maximum crawl depth", schema_with = "u32_schema")]
    pub max_depth: u32,

    #[serde(rename = "includePaths", default)]
    #[schemars(description = "Paths to include in crawl")]
    pub include_paths: Vec<String>,

    #[serde(rename = "excludePaths", default)]
    #[schemars(description = "Paths to exclude from crawl")]
    pub exclude_paths: Vec<String>,
}

impl CrawlArgsOptions {
    fn default_limit() -> u32 {
        10
    }

    fn default_max_depth() -> u32 {
        2
    }
}

impl Default for CrawlArgsOptions {
    fn default() -> Self {
        Self {
            limit: Self::default_limit(),
            max_depth: Self::default_max_depth(),
            include_paths: Vec::new(),
            exclude_paths: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MapWebsiteArgs {
    #[schemars(description = "The website URL to map")]
    pub url: String,

    #[serde(default)]
    pub options: MapArgsOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MapArgsOptions {
    #[serde(default)]
    #[schemars(description = "Search term to filter URLs")]
    pub search: Option<String>,

    #[serde(default)]
    #[schemars(description = "Maximum number of URLs to return", schema_with = "optional_u32_schema")]
    pub limit: Option<u32>,

    #[serde(rename = "ignoreSitemap", default)]
    #[schemars(description = "Ignore sitemap and crawl manually")]
    pub ignore_sitemap: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractArgs {
    #[schemars(description = "The URL to extract data from")]
    pub url: String,

    #[schemars(description = "Prompt describing what data to extract")]
    pub prompt: String,

    #[serde(default)]
    #[schemars(description = "JSON schema for the expected output structure")]
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CrawlStatusArgs {
    #[serde(rename = "jobId")]
    #[schemars(description = "The crawl job ID to check")]
    pub job_id: String,
}

// ============================================================================
// SearXNG and Crawl4AI tools
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchWebArgs {
    #[schemars(description = "The search query")]
    pub query: String,

    #[serde(default)]
    pub options: SearchArgsOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchArgsOptions {
    #[serde(default)]
    #[schemars(description = "Engines to use, e.g. \"google,bing\"")]
    pub engines: Option<StringList>,

    #[serde(default)]
    #[schemars(description = "Search categories (general, images, news, ...)")]
    pub categories: Option<StringList>,

    #[serde(default = "english")]
    #[schemars(description = "Search language (en, es, fr, ...)")]
    pub language: String,

    #[serde(default)]
    #[schemars(description = "Result page number (1-based)", schema_with = "optional_u32_schema")]
    pub limit: Option<u32>,

    #[serde(default)]
    #[schemars(description = "Time range filter (day, month, year)")]
    pub time_range: Option<String>,

    #[serde(default)]
    #[schemars(description = "Safe search level: 0 off, 1 moderate, 2 strict", schema_with = "optional_u32_schema")]
    pub safesearch: Option<u8>,
}

impl Default for SearchArgsOptions {
    fn default() -> Self {
        Self {
            engines: None,
            categories: None,
            language: english(),
            limit: None,
            time_range: None,
            safesearch: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchAndScrapeArgs {
    #[schemars(description = "The search query")]
    pub query: String,

    #[serde(default)]
    pub options: SearchAndScrapeOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchAndScrapeOptions {
    #[serde(default)]
    #[schemars(description = "Number of top results to scrape (capped at 5)", schema_with = "optional_u64_schema")]
    pub max_results: Option<usize>,

    #[serde(default)]
    #[schemars(description = "Engines to use, e.g. \"google,bing\"")]
    pub engines: Option<StringList>,

    #[serde(default = "english")]
    #[schemars(description = "Search language")]
    pub language: String,

    #[serde(default = "markdown")]
    #[schemars(description = "Formats for scraped content")]
    pub scrape_formats: Vec<String>,
}

impl Default for SearchAndScrapeOptions {
    fn default() -> Self {
        Self {
            max_results: None,
            engines: None,
            language: english(),
            scrape_formats: markdown(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Crawl4aiScrapeArgs {
    #[schemars(description = "The URL to scrape")]
    pub url: String,

    #[serde(default)]
    pub options: Crawl4aiOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Crawl4aiOptions {
    #[serde(default = "markdown")]
    #[schemars(description = "Output formats (markdown, html, links)")]
    pub formats: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Wait time in milliseconds", schema_with = "u64_schema")]
    pub wait_for: u64,

    #[serde(default = "thirty_seconds")]
    #[schemars(description = "Timeout in milliseconds", schema_with = "u64_schema")]
    pub timeout: u64,
}

impl Default for Crawl4aiOptions {
    fn default() -> Self {
        Self {
            formats: markdown(),
            wait_for: 0,
            timeout: thirty_seconds(),
        }
    }
}
