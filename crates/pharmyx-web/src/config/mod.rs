//! Configuration loading for Pharmyx.
//! Reads pharmyx.toml from the current directory or the path in PHARMYX_CONFIG.
//! Every field has a default, so no file at all is a valid configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;


pub const CONFIG_ENV: &str = "PHARMYX_CONFIG";
pub const BIND_ENV: &str = "PHARMYX_BIND";
pub const EUTILS_BASE_ENV: &str = "PHARMYX_EUTILS_BASE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub entrez: EntrezConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String { "127.0.0.1:8000".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrezConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as the `tool` parameter on every E-utilities call.
    #[serde(default = "default_tool")]
    pub tool: String,
    /// Minimum spacing between efetch calls, shared by all requests.
    #[serde(default = "default_interval_ms")]
    pub request_interval_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound applied to a request's `max_results`.
    #[serde(default = "default_max_results_cap")]
    pub max_results_cap: usize,
}

fn default_base_url()        -> String { pharmyx_ingestion::sources::pubmed::DEFAULT_EUTILS_BASE.to_string() }
fn default_tool()            -> String { "pharmyx".to_string() }
fn default_interval_ms()     -> u64    { 340 }
fn default_timeout_secs()    -> u64    { 30 }
fn default_max_results_cap() -> usize  { 10_000 }

impl Default for EntrezConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            tool: default_tool(),
            request_interval_ms: default_interval_ms(),
            timeout_secs: default_timeout_secs(),
            max_results_cap: default_max_results_cap(),
        }
    }
}

impl EntrezConfig {
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when RUST_LOG is unset and a request does not ask for debug.
    #[serde(default = "default_filter")]
    pub default_filter: String,
}

fn default_filter() -> String { crate::logging::DEFAULT_FILTER.to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { default_filter: default_filter() }
    }
}

impl Config {
    /// Load configuration from file.
    /// Checks PHARMYX_CONFIG env var first, then current directory.
    /// An explicitly named file must exist; the default one may be absent.
    pub fn load() -> anyhow::Result<Self> {
        let explicit = std::env::var(CONFIG_ENV).ok();
        let path = explicit.clone().unwrap_or_else(|| "pharmyx.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            Self::load_from(&path)?
        } else if explicit.is_some() {
            anyhow::bail!("Config file not found: {} (from {})", path, CONFIG_ENV);
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment overrides, looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(BIND_ENV).filter(|v| !v.trim().is_empty()) {
            self.server.bind = bind;
        }
        if let Some(base) = lookup(EUTILS_BASE_ENV).filter(|v| !v.trim().is_empty()) {
            self.entrez.base_url = base;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.bind_addr()?;
        if !(self.entrez.base_url.starts_with("http://") || self.entrez.base_url.starts_with("https://")) {
            anyhow::bail!("entrez.base_url must be an http(s) URL, got {:?}", self.entrez.base_url);
        }
        if self.entrez.tool.trim().is_empty() {
            anyhow::bail!("entrez.tool must not be empty");
        }
        if self.entrez.max_results_cap == 0 {
            anyhow::bail!("entrez.max_results_cap must be at least 1");
        }
        if self.entrez.timeout_secs == 0 {
            anyhow::bail!("entrez.timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid server.bind {:?}: {e}", self.server.bind))
    }
}
