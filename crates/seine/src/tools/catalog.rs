//! The advertised tool catalog.

use baton::{schema_for, Tool, ToolSchema};
use schemars::JsonSchema;

use super::args::*;

fn tool<T: JsonSchema>(name: &str, title: &str, description: &str) -> Tool {
    Tool::new(name, description)
        .with_title(title)
        .with_input_schema(ToolSchema::from_value(schema_for::<T>()))
        .read_only()
        .open_world()
}

/// All nine tools, in the order `tools/list` returns them.
pub fn catalog() -> Vec<Tool> {
    vec![
        tool::<ScrapeUrlArgs>(
            "scrape_url",
            "Scrape URL",
            "Scrape content from a single URL using proxy rotation",
        ),
        tool::<BatchScrapeArgs>(
            "batch_scrape",
            "Batch Scrape",
            "Scrape multiple URLs in batch using proxy rotation",
        ),
        tool::<CrawlWebsiteArgs>(
            "crawl_website",
            "Crawl Website",
            "Crawl a website starting from a base URL",
        ),
        tool::<MapWebsiteArgs>(
            "map_website",
            "Map Website",
            "Get a complete list of URLs from a website (like sitemap discovery)",
        ),
        tool::<ExtractArgs>(
            "extract_structured_data",
            "Extract Structured Data",
            "Extract specific structured data from a webpage using AI prompts",
        ),
        tool::<CrawlStatusArgs>(
            "get_crawl_status",
            "Crawl Status",
            "Check the status of a crawl job by ID",
        ),
        tool::<SearchWebArgs>(
            "search_web",
            "Web Search",
            "Search the web using a self-hosted SearXNG instance",
        ),
        tool::<SearchAndScrapeArgs>(
            "search_and_scrape",
            "Search and Scrape",
            "Search the web and scrape the top results (SearXNG + Crawl4AI)",
        ),
        tool::<Crawl4aiScrapeArgs>(
            "crawl4ai_scrape",
            "Crawl4AI Scrape",
            "Scrape a single URL with Crawl4AI, through the configured proxy",
        ),
    ]
}
