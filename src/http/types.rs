//! HTTP API Request/Response Types
//!
//! JSON-serializable types for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::indexing::StatisticsReport;

/// Form body for the indexPage endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct IndexPageRequest {
    /// Absolute URL of the page to index
    pub url: String,
}

/// Result envelope for the control endpoints
#[derive(Debug, Clone, Serialize)]
pub struct IndexingResponse {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IndexingResponse {
    pub fn ok() -> Self {
        Self {
            result: true,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: false,
            error: Some(message.into()),
        }
    }
}

/// Statistics endpoint response
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsResponse {
    pub result: bool,
    pub statistics: StatisticsReport,
}
