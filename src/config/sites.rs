//! Configured site roots

use serde::{Deserialize, Serialize};

/// One configured crawl root. The url bounds the crawl scope; the name is
/// used for statistics display. Read-only for the duration of a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteEntry {
    pub url: String,
    pub name: String,
}

impl SiteEntry {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }
}
