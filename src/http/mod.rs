//! REST API over the indexing service: start/stop a crawl campaign, index a
//! single page, and read statistics.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use server::HttpServer;
