//! Shared application state for the web server.

use std::sync::Arc;

use pharmyx_ingestion::sources::pubmed::PubMedClient;
use pharmyx_ingestion::{PaperFetcher, RateLimiter};

use crate::config::Config;
use crate::logging::LogLevelSwitch;

/// Shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: PaperFetcher,
    /// `tool` parameter forwarded to NCBI.
    pub tool: String,
    pub max_results_cap: usize,
    pub log_switch: LogLevelSwitch,
}

impl AppState {
    pub fn new(
        fetcher: PaperFetcher,
        tool: impl Into<String>,
        max_results_cap: usize,
        log_switch: LogLevelSwitch,
    ) -> Self {
        Self {
            fetcher,
            tool: tool.into(),
            max_results_cap,
            log_switch,
        }
    }

    /// PubMed-backed state with one rate limiter shared by all requests.
    pub fn from_config(config: &Config, log_switch: LogLevelSwitch) -> anyhow::Result<Self> {
        let client = PubMedClient::with_base_url(&config.entrez.base_url, config.entrez.timeout())?;
        let limiter = RateLimiter::new(config.entrez.request_interval());
        let fetcher = PaperFetcher::new(Arc::new(client), Arc::new(limiter));
        Ok(Self::new(
            fetcher,
            config.entrez.tool.clone(),
            config.entrez.max_results_cap,
            log_switch,
        ))
    }
}

pub type SharedState = Arc<AppState>;
