//! Site-scoped crawling: scope filter, fetcher, frontier, and the bounded
//! concurrent worker that ties them together.

pub mod fetcher;
pub mod filter;
pub mod frontier;
pub mod worker;

pub use fetcher::{extract_links, is_html_like, FetchError, FetchOutcome, PageFetcher};
pub use filter::{site_path, UrlFilter};
pub use frontier::{CrawlUrl, Frontier};
pub use worker::{CrawlError, SiteCrawler};
