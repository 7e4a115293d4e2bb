//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, SeineConfig};
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
    /// Environment variables that were set but could not be parsed
    pub ignored: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// Returns paths in load order (system, user, local/cli). Only existing
/// files are returned. A CLI path replaces the local `./seine.toml`.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/seine/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("seine/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("seine.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read one file as a raw TOML table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Deep-merge `overlay` into `base`. Nested tables merge key by key; any
/// other value in `overlay` replaces the one in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Turn a merged table into a config, filling gaps with defaults.
pub fn from_table(table: toml::Table) -> Result<SeineConfig, ConfigError> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Invalid {
            message: e.to_string(),
        })
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut SeineConfig, sources: &mut ConfigSources) {
    apply_env_overrides_from(config, sources, |name| std::env::var(name).ok());
}

/// Apply overrides from any variable lookup.
pub fn apply_env_overrides_from<F>(config: &mut SeineConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut overlay = EnvOverlay {
        lookup,
        sources,
    };

    // Backends
    if let Some(v) = overlay.string("SEARXNG_URL") {
        config.backends.searxng_url = v;
    }
    if let Some(v) = overlay.string("CRAWL4AI_URL") {
        config.backends.crawl4ai_url = v;
    }
    if let Some(v) = overlay.string("FIRECRAWL_API_URL") {
        config.backends.firecrawl_url = v;
    }
    if let Some(v) = overlay.string("FIRECRAWL_API_KEY") {
        config.backends.firecrawl_api_key = Some(v);
    }
    if let Some(v) = overlay.string("PROXY_URL") {
        config.backends.proxy_url = Some(v);
    }

    // Fan-out
    if let Some(v) = overlay.parsed("SEINE_FANOUT_CONCURRENCY") {
        config.fanout.concurrency = v;
    }
    if let Some(v) = overlay.parsed("SEINE_FANOUT_DEFAULT_MAX") {
        config.fanout.default_max_results = v;
    }
    if let Some(v) = overlay.parsed("SEINE_FANOUT_MAX_CAP") {
        config.fanout.max_results_cap = v;
    }

    // HTTP surface; MCP_HTTP_PORT beats MCP_PORT
    if let Some(v) = overlay.parsed("SEINE_HTTP_ENABLED") {
        config.http.enabled = v;
    }
    if let Some(v) = overlay.string("SEINE_HTTP_BIND") {
        config.http.bind = v;
    }
    if let Some(v) = overlay.parsed("MCP_PORT") {
        config.http.port = v;
    }
    if let Some(v) = overlay.parsed("MCP_HTTP_PORT") {
        config.http.port = v;
    }
    if let Some(v) = overlay.string("MCP_INTERNAL_TOKEN") {
        config.http.auth_token = Some(v);
    }
    if let Some(v) = overlay.string("MCP_SSE_PATH") {
        config.http.sse_message_path = v;
    }

    // Telemetry
    if let Some(v) = overlay.string("SEINE_LOG_LEVEL") {
        config.telemetry.log_level = v;
    }
    if let Some(v) = overlay.string("OTEL_EXPORTER_OTLP_ENDPOINT") {
        config.telemetry.otlp_endpoint = Some(v);
    }
}

struct EnvOverlay<'a, F> {
    lookup: F,
    sources: &'a mut ConfigSources,
}

impl<F: Fn(&str) -> Option<String>> EnvOverlay<'_, F> {
    /// Non-empty value of `name`, recorded as an override.
    fn string(&mut self, name: &str) -> Option<String> {
        let value = (self.lookup)(name).filter(|v| !v.trim().is_empty())?;
        self.sources.env_overrides.push(name.to_string());
        Some(value)
    }

    fn parsed<T: std::str::FromStr>(&mut self, name: &str) -> Option<T> {
        let raw = (self.lookup)(name).filter(|v| !v.trim().is_empty())?;
        match raw.trim().parse() {
            Ok(v) => {
                self.sources.env_overrides.push(name.to_string());
                Some(v)
            }
            Err(_) => {
                self.sources.ignored.push(name.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_merge_tables_deep() {
        let mut base: toml::Table = r#"
            [backends]
            searxng_url = "http://a"
            crawl4ai_url = "http://b"
        "#
        .parse()
        .unwrap();
        let overlay: toml::Table = r#"
            [backends]
            searxng_url = "http://c"
        "#
        .parse()
        .unwrap();

        merge_tables(&mut base, overlay);
        let config = from_table(base).unwrap();
        assert_eq!(config.backends.searxng_url, "http://c");
        assert_eq!(config.backends.crawl4ai_url, "http://b");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let table: toml::Table = "[fanout]\nconcurrency = 4\n".parse().unwrap();
        let config = from_table(table).unwrap();
        assert_eq!(config.fanout.concurrency, 4);
        assert_eq!(config.fanout.max_results_cap, 5);
        assert_eq!(config.http.port, 3003);
    }

    #[test]
    fn test_wrong_type_is_invalid() {
        let table: toml::Table = "[http]\nport = \"lots\"\n".parse().unwrap();
        assert!(matches!(from_table(table), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_load_table_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is = = not toml").unwrap();

        match load_table(file.path()) {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SeineConfig::default();
        let mut sources = ConfigSources::default();
        apply_env_overrides_from(
            &mut config,
            &mut sources,
            env(&[
                ("SEARXNG_URL", "http://searx:8080"),
                ("MCP_INTERNAL_TOKEN", "s3cret"),
                ("SEINE_FANOUT_CONCURRENCY", "3"),
                ("SEINE_HTTP_ENABLED", "false"),
            ]),
        );

        assert_eq!(config.backends.searxng_url, "http://searx:8080");
        assert_eq!(config.http.auth_token.as_deref(), Some("s3cret"));
        assert_eq!(config.fanout.concurrency, 3);
        assert!(!config.http.enabled);
        assert_eq!(sources.env_overrides.len(), 4);
    }

    #[test]
    fn test_http_port_precedence() {
        let mut config = SeineConfig::default();
        let mut sources = ConfigSources::default();
        apply_env_overrides_from(
            &mut config,
            &mut sources,
            env(&[("MCP_PORT", "4000"), ("MCP_HTTP_PORT", "5000")]),
        );
        assert_eq!(config.http.port, 5000);

        let mut config = SeineConfig::default();
        apply_env_overrides_from(&mut config, &mut sources, env(&[("MCP_PORT", "4000")]));
        assert_eq!(config.http.port, 4000);
    }

    #[test]
    fn test_unparseable_env_is_ignored() {
        let mut config = SeineConfig::default();
        let mut sources = ConfigSources::default();
        apply_env_overrides_from(
            &mut config,
            &mut sources,
            env(&[("MCP_HTTP_PORT", "eighty"), ("FIRECRAWL_API_KEY", "  ")]),
        );

        assert_eq!(config.http.port, 3003);
        assert!(config.backends.firecrawl_api_key.is_none());
        assert_eq!(sources.ignored, vec!["MCP_HTTP_PORT".to_string()]);
        assert!(sources.env_overrides.is_empty());
    }
}
