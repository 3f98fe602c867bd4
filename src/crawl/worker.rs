//! Bounded concurrent site crawl
//!
//! Drains a [`Frontier`] with at most `max_concurrent_fetches` in-flight
//! fetches. Each task fetches one URL, stores the page, optionally runs the
//! indexing pipeline, and enqueues in-scope children at depth + 1. Transient
//! per-task failures (transport errors, non-HTML responses) are logged and
//! absorbed as skips; storage failures are fatal for the whole site crawl.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::CrawlConfig;
use crate::indexing::PageIndexer;
use crate::storage::{SearchStore, StoreError};
use crate::types::SiteId;

use super::fetcher::{extract_links, PageFetcher};
use super::filter::{site_path, UrlFilter};
use super::frontier::{CrawlUrl, Frontier};

/// Fatal site-crawl failure; surfaces as the site transitioning to FAILED.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("crawl task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One site's crawl: frontier, filter, and shared collaborators.
pub struct SiteCrawler {
    site_id: SiteId,
    filter: UrlFilter,
    fetcher: Arc<PageFetcher>,
    store: Arc<dyn SearchStore>,
    /// Present when pages are indexed as part of the crawl.
    indexer: Option<Arc<PageIndexer>>,
    frontier: Frontier,
    cancelled: Arc<AtomicBool>,
    fetch_delay: Duration,
    max_concurrent: usize,
}

impl SiteCrawler {
    pub fn new(
        site_id: SiteId,
        filter: UrlFilter,
        fetcher: Arc<PageFetcher>,
        store: Arc<dyn SearchStore>,
        indexer: Option<Arc<PageIndexer>>,
        cancelled: Arc<AtomicBool>,
        config: &CrawlConfig,
    ) -> Self {
        Self {
            site_id,
            filter,
            fetcher,
            store,
            indexer,
            frontier: Frontier::new(config.max_depth),
            cancelled,
            fetch_delay: Duration::from_millis(config.fetch_delay_ms),
            max_concurrent: config.max_concurrent_fetches.max(1),
        }
    }

    /// Crawl the site to completion or cancellation. Returns once the whole
    /// traversal tree has drained.
    pub async fn run(self: Arc<Self>) -> Result<(), CrawlError> {
        self.frontier.push(self.filter.root().clone(), 0);

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks: JoinSet<Result<(), StoreError>> = JoinSet::new();
        let mut failure: Option<CrawlError> = None;

        loop {
            if self.cancelled.load(Ordering::Relaxed) {
                break;
            }
            if let Some(next) = self.frontier.pop() {
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };
                let crawler = Arc::clone(&self);
                tasks.spawn(async move {
                    let _permit = permit;
                    crawler.process(next).await
                });
            } else {
                // Queue is empty; in-flight tasks may still discover links.
                match tasks.join_next().await {
                    Some(joined) => record_outcome(joined, &mut failure),
                    None => break,
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            record_outcome(joined, &mut failure);
        }

        debug!(
            site_id = self.site_id,
            visited = self.frontier.visited_count(),
            "site crawl drained"
        );
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn process(&self, item: CrawlUrl) -> Result<(), StoreError> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Ok(());
        }
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }

        let outcome = match self.fetcher.fetch(&item.url).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(url = %item.url, error = %e, "fetch failed, skipping");
                return Ok(());
            }
        };
        if !outcome.is_indexable_html() {
            debug!(
                url = %item.url,
                status = outcome.status,
                content_type = %outcome.content_type,
                "skipping non-indexable response"
            );
            return Ok(());
        }

        let path = site_path(
            &UrlFilter::normalize(item.url.as_str()),
            self.filter.root_str(),
        );
        match self
            .store
            .insert_page_if_absent(self.site_id, &path, outcome.status, &outcome.body)?
        {
            Some(page) => {
                debug!(site_id = self.site_id, path = %page.path, "stored page");
                if let Some(indexer) = &self.indexer {
                    indexer.index_page(&page)?;
                }
            }
            None => debug!(site_id = self.site_id, path = %path, "page already stored"),
        }

        if self.cancelled.load(Ordering::Relaxed) {
            return Ok(());
        }
        for link in extract_links(&outcome) {
            if self.filter.is_in_scope(link.as_str()) {
                self.frontier.push(link, item.depth.saturating_add(1));
            }
        }
        Ok(())
    }
}

fn record_outcome(
    joined: Result<Result<(), StoreError>, tokio::task::JoinError>,
    failure: &mut Option<CrawlError>,
) {
    let outcome = match joined {
        Ok(Ok(())) => return,
        Ok(Err(store)) => CrawlError::Store(store),
        Err(join) if join.is_cancelled() => return,
        Err(join) => CrawlError::Join(join),
    };
    if failure.is_none() {
        *failure = Some(outcome);
    }
}
