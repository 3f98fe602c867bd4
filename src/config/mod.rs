//! Configuration for Sitelex

mod crawl;
mod http;
mod logging;
mod sites;
mod storage;

pub use crawl::CrawlConfig;
pub use http::HttpConfig;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use sites::SiteEntry;
pub use storage::StorageConfig;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default user agent for all HTTP requests
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; SitelexBot/1.0)";

/// Default referer sent with every crawl request
pub const DEFAULT_REFERRER: &str = "http://www.google.com";

/// Main configuration for a Sitelex instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ordered list of site roots the crawler is allowed to visit
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
    /// Crawl configuration
    #[serde(default)]
    pub crawl: CrawlConfig,
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// HTTP API server configuration
    #[serde(default)]
    pub http: HttpConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together so the user
    /// can fix everything in one pass rather than playing whack-a-mole.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Site roots must be absolute http(s) URLs with a host
        for site in &self.sites {
            match Url::parse(&site.url) {
                Ok(url) => {
                    if url.scheme() != "http" && url.scheme() != "https" {
                        errors.push(format!("site url '{}' must use http or https", site.url));
                    }
                    if url.host_str().is_none() {
                        errors.push(format!("site url '{}' has no host", site.url));
                    }
                }
                Err(e) => errors.push(format!("site url '{}' is not a valid URL: {}", site.url, e)),
            }
            if site.name.trim().is_empty() {
                errors.push(format!("site '{}' has an empty name", site.url));
            }
        }

        // Crawl validation
        if self.crawl.max_depth == 0 {
            errors.push("max_depth must be positive".to_string());
        }
        if self.crawl.max_concurrent_fetches == 0 {
            errors.push("max_concurrent_fetches must be positive".to_string());
        }
        if self.crawl.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be positive".to_string());
        }
        if self.crawl.user_agent.trim().is_empty() {
            errors.push("user_agent must not be empty".to_string());
        }

        // Storage validation
        if self.storage.data_dir.as_os_str().is_empty() {
            errors.push("data_dir must not be empty".to_string());
        }

        // HTTP config validation
        if self.http.enabled {
            if let Some(port_str) = self.http.listen_addr.rsplit(':').next() {
                match port_str.parse::<u32>() {
                    Ok(port) if port == 0 || port > 65535 => {
                        errors.push(format!(
                            "HTTP listen port must be between 1 and 65535, got {}",
                            port
                        ));
                    }
                    Ok(_) => {}
                    Err(_) => errors.push(format!(
                        "HTTP listen address '{}' has no valid port",
                        self.http.listen_addr
                    )),
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
