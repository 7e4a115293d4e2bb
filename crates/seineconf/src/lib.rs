//! Configuration loading for seine.
//!
//! # Usage
//!
//! ```rust,no_run
//! use seineconf::SeineConfig;
//!
//! let config = SeineConfig::load().expect("Failed to load config");
//! println!("SearXNG: {}", config.backends.searxng_url);
//! println!("HTTP port: {}", config.http.port);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/seine/config.toml` (system)
//! 2. `~/.config/seine/config.toml` (user)
//! 3. `./seine.toml` (local override, or the `--config` path)
//! 4. Environment variables
//!
//! Tables are merged key by key before being read, so a file only needs the
//! keys it wants to change.
//!
//! # Example Config
//!
//! ```toml
//! [backends]
//! searxng_url = "http://searxng:8080"
//! crawl4ai_url = "http://crawl4ai:8001"
//! firecrawl_url = "http://firecrawl:3002"
//!
//! [fanout]
//! concurrency = 2
//! default_max_results = 3
//! max_results_cap = 5
//!
//! [http]
//! enabled = true
//! port = 3003
//! auth_token = "change-me"
//!
//! [telemetry]
//! log_level = "info"
//! otlp_endpoint = "127.0.0.1:4317"
//! ```

pub mod loader;
pub mod settings;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use settings::{BackendsConfig, FanoutConfig, HttpConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Complete seine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeineConfig {
    #[serde(default)]
    pub backends: BackendsConfig,

    #[serde(default)]
    pub fanout: FanoutConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl SeineConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration and report which files and variables contributed.
    ///
    /// If `config_path` is provided, it takes precedence over the local
    /// `./seine.toml`. System and user configs still load first.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::load_table(&path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path);
        }

        let mut config = loader::from_table(merged)?;
        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML, secrets included.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SeineConfig::default();
        assert_eq!(config.backends.searxng_url, "http://localhost:8081");
        assert_eq!(config.backends.crawl4ai_url, "http://localhost:8001");
        assert_eq!(config.backends.firecrawl_url, "http://localhost:3002");
        assert_eq!(config.fanout.concurrency, 2);
        assert_eq!(config.fanout.default_max_results, 3);
        assert_eq!(config.fanout.max_results_cap, 5);
        assert_eq!(config.http.port, 3003);
        assert_eq!(config.http.sse_message_path, "/mcp/sse");
        assert!(config.http.auth_token.is_none());
    }

    #[test]
    fn test_cli_path_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http]\nport = 9999\n[fanout]\nmax_results_cap = 8").unwrap();

        let (config, sources) = SeineConfig::load_with_sources_from(Some(file.path())).unwrap();
        assert!(sources.files.iter().any(|p| p == file.path()));
        assert_eq!(config.fanout.max_results_cap, 8);
        // Port may be overridden by the environment running the tests.
        if !sources.env_overrides.iter().any(|v| v.contains("PORT")) {
            assert_eq!(config.http.port, 9999);
        }
    }

    #[test]
    fn test_to_toml_keeps_secrets() {
        let mut config = SeineConfig::default();
        config.http.auth_token = Some("abc".to_string());
        let text = config.to_toml().unwrap();
        assert!(text.contains("[backends]"));

        let table: toml::Table = text.parse().unwrap();
        let parsed = loader::from_table(table).unwrap();
        assert_eq!(parsed.http.auth_token.as_deref(), Some("abc"));
    }
}
