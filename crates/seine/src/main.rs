//! seine - MCP tool router for web search, scraping and crawling
//!
//! Subcommands:
//! - `seine run` - stdio MCP plus the HTTP server when enabled (default)
//! - `seine stdio` - stdio MCP only
//! - `seine serve` - HTTP server only
//! - `seine tools` - print the tool catalog
//! - `seine call <tool> [json]` - run one tool call and print the result

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use seine::backends::redact_proxy_url;
use seine::{serve, stdio, telemetry, ToolDispatcher};
use seineconf::{ConfigSources, SeineConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "seine")]
#[command(about = "MCP tool router for SearXNG, Crawl4AI and Firecrawl")]
#[command(version)]
struct Cli {
    /// Config file (replaces ./seine.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP on stdio, plus HTTP when enabled
    Run,

    /// Serve MCP on stdio only
    Stdio,

    /// Serve HTTP only (SSE sessions, health, tool pass-through)
    Serve {
        /// HTTP port to bind
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the tool catalog as JSON
    Tools,

    /// Run one tool call and print its result
    Call {
        /// Tool name, e.g. search_web
        tool: String,

        /// JSON arguments
        #[arg(default_value = "{}")]
        json: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut config, sources) = SeineConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let command = cli.command.unwrap_or(Commands::Run);

    // One-shot commands get plain stderr logging; servers get full telemetry.
    let one_shot = matches!(command, Commands::Tools | Commands::Call { .. });
    if one_shot {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .init();
    } else {
        telemetry::init(&config.telemetry)?;
    }

    if let Commands::Serve { port: Some(port) } = command {
        config.http.port = port;
    }
    if !one_shot {
        log_startup(&config, &sources);
    }

    let dispatcher = Arc::new(ToolDispatcher::from_config(&config).context("Failed to build backend clients")?);

    match command {
        Commands::Run => {
            if config.http.enabled {
                let stdio_task = tokio::spawn(stdio::run(Arc::clone(&dispatcher)));
                serve::run(&config.http, dispatcher, serve::shutdown_signal()).await?;
                stdio_task.abort();
            } else {
                stdio::run(dispatcher).await;
            }
        }
        Commands::Stdio => {
            stdio::run(dispatcher).await;
        }
        Commands::Serve { .. } => {
            serve::run(&config.http, dispatcher, serve::shutdown_signal()).await?;
        }
        Commands::Tools => {
            let tools = seine::tools::catalog();
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        Commands::Call { tool, json } => {
            let arguments: serde_json::Value =
                serde_json::from_str(&json).context("Arguments must be valid JSON")?;
            let result = dispatcher.call(&tool, arguments, None).await;
            if result.is_error {
                bail!("{}", result.text_content());
            }
            println!("{}", result.text_content());
        }
    }

    Ok(())
}

/// One record of what this process is configured to talk to. Secrets stay out.
fn log_startup(config: &SeineConfig, sources: &ConfigSources) {
    info!("🕸️  seine {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        pid = std::process::id(),
        searxng = %config.backends.searxng_url,
        crawl4ai = %config.backends.crawl4ai_url,
        firecrawl = %config.backends.firecrawl_url,
        firecrawl_configured = config.backends.firecrawl_api_key.is_some(),
        proxy = %config.backends.proxy_url.as_deref().map(redact_proxy_url).unwrap_or_else(|| "none".to_string()),
        http_enabled = config.http.enabled,
        http_addr = %config.http.bind_addr(),
        auth = config.http.auth_token.is_some(),
        fanout_concurrency = config.fanout.concurrency,
        fanout_cap = config.fanout.max_results_cap,
        "startup"
    );

    for path in &sources.files {
        info!("   Config: {}", path.display());
    }
    if !sources.env_overrides.is_empty() {
        info!("   Env overrides: {}", sources.env_overrides.join(", "));
    }
    for name in &sources.ignored {
        warn!("   Ignored unparseable {}", name);
    }
    if config.backends.firecrawl_api_key.is_none() {
        warn!("   FIRECRAWL_API_KEY not set; Firecrawl tools will fail");
    }
}
