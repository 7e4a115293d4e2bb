//! seine - MCP tool router for web search, scraping and crawling
//!
//! This library provides:
//! - `backends`: SearXNG, Crawl4AI and Firecrawl HTTP clients
//! - `tools`: the tool catalog, typed requests, fan-out and dispatch
//! - `serve`: HTTP surface (SSE sessions, health, tool pass-through)
//! - `stdio`: MCP over stdin/stdout
//! - `telemetry`: tracing subscriber and OTLP export

pub mod backends;
pub mod serve;
pub mod stdio;
pub mod telemetry;
pub mod tools;

pub use tools::ToolDispatcher;
