//! Text extraction, the per-page indexing pipeline, and the campaign
//! controller that drives crawling and indexing across configured sites.

pub mod pipeline;
pub mod service;
pub mod text;

pub use pipeline::PageIndexer;
pub use service::{
    IndexingService, ServiceError, SiteStatistics, StatisticsReport, TotalStatistics,
};
pub use text::extract_text;
