//! Sitelex: site-scoped web crawler with a lemma frequency search index
//!
//! Crawls a configured set of site roots, stores each HTML page, and builds a
//! per-site inverted index of Russian lemma frequencies:
//! - Bounded-concurrency crawl workers with an explicit frontier queue
//! - Scope filtering: same host, fragment-free, HTML-family extensions only
//! - Snowball-based lemmatization with a functional-word stop list
//! - Embedded sled storage with atomic per-lemma document-frequency counters
//! - REST API for starting/stopping campaigns and reading statistics

pub mod config;
pub mod crawl;
pub mod http;
pub mod indexing;
pub mod morph;
pub mod storage;
pub mod types;

pub use config::Config;
