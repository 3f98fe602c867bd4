//! Crawl and indexing configuration

use serde::{Deserialize, Serialize};

use super::{DEFAULT_REFERRER, DEFAULT_USER_AGENT};

/// Crawl behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Maximum crawl depth from each site root (root = 0)
    #[serde(default = "default_max_depth")]
    pub max_depth: u8,
    /// Delay applied before every fetch issued by a crawl task (milliseconds)
    #[serde(default = "default_fetch_delay_ms")]
    pub fetch_delay_ms: u64,
    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Maximum in-flight fetches per site crawl
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    /// User agent string sent on every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Referer header sent on every request
    #[serde(default = "default_referrer")]
    pub referrer: String,
    /// Run the lemma indexing pipeline for every page stored during a crawl.
    /// When false, crawling only stores pages and indexing happens solely
    /// through the single-page operation.
    #[serde(default = "default_index_pages")]
    pub index_pages: bool,
}

fn default_max_depth() -> u8 {
    10
}

fn default_fetch_delay_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_referrer() -> String {
    DEFAULT_REFERRER.to_string()
}

fn default_index_pages() -> bool {
    true
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            fetch_delay_ms: default_fetch_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            user_agent: default_user_agent(),
            referrer: default_referrer(),
            index_pages: default_index_pages(),
        }
    }
}
