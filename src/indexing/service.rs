//! Crawl campaign controller
//!
//! Owns the lifecycle of a full crawl across all configured site roots:
//! start, cooperative stop, single-page on-demand indexing, and statistics.
//! At most one campaign runs at a time; the controller's mutex over the
//! campaign slot is the single mutual-exclusion point for start/stop. Each
//! campaign is an explicit handle owning its own cancellation flag, so no
//! crawl state outlives the campaign that created it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, error, info};
use url::Url;
use uuid::Uuid;

use crate::config::{Config, CrawlConfig, SiteEntry};
use crate::crawl::{is_html_like, site_path, FetchError, PageFetcher, SiteCrawler, UrlFilter};
use crate::storage::{SearchStore, StoreError};
use crate::types::{SiteId, SiteStatus};

use super::pipeline::PageIndexer;

const STOPPED_BY_USER: &str = "indexing stopped by user";

/// Errors surfaced to callers of the controller.
///
/// The first three are control errors: reported synchronously, never logged
/// as failures, and without effect on crawl state.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("indexing is already running")]
    AlreadyRunning,
    #[error("indexing is not running")]
    NotRunning,
    #[error("page is outside the configured sites")]
    OutsideConfiguredScope,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("unexpected HTTP status {0}")]
    BadStatus(u16),
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Handle for one running campaign; dropped when the controller moves on.
struct Campaign {
    id: Uuid,
    cancelled: Arc<AtomicBool>,
    finished: AtomicBool,
    done: Notify,
}

impl Campaign {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            cancelled: Arc::new(AtomicBool::new(false)),
            finished: AtomicBool::new(false),
            done: Notify::new(),
        })
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// Aggregate statistics block.
#[derive(Debug, Clone, Serialize)]
pub struct TotalStatistics {
    pub sites: u64,
    pub pages: u64,
    pub lemmas: u64,
    pub indexing: bool,
}

/// Per-site statistics item.
#[derive(Debug, Clone, Serialize)]
pub struct SiteStatistics {
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: chrono::DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub pages: u64,
    pub lemmas: u64,
}

/// Read-only statistics report over the persisted state.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    pub total: TotalStatistics,
    pub detailed: Vec<SiteStatistics>,
}

pub struct IndexingService {
    store: Arc<dyn SearchStore>,
    fetcher: Arc<PageFetcher>,
    indexer: Arc<PageIndexer>,
    sites: Vec<SiteEntry>,
    crawl: CrawlConfig,
    campaign: Mutex<Option<Arc<Campaign>>>,
}

impl IndexingService {
    pub fn new(config: &Config, store: Arc<dyn SearchStore>) -> Result<Self, ServiceError> {
        let fetcher = Arc::new(PageFetcher::new(&config.crawl)?);
        let indexer = Arc::new(PageIndexer::new(Arc::clone(&store)));
        Ok(Self {
            store,
            fetcher,
            indexer,
            sites: config.sites.clone(),
            crawl: config.crawl.clone(),
            campaign: Mutex::new(None),
        })
    }

    /// Start a crawl campaign across all configured site roots.
    ///
    /// Prior persisted state for each root is deleted (cascading to pages,
    /// lemmas, and index entries) before its worker starts. Workers for
    /// different roots run fully in parallel. Must be called from within a
    /// tokio runtime.
    pub fn start(&self) -> Result<(), ServiceError> {
        let mut slot = self.campaign.lock();
        if slot.as_ref().is_some_and(|c| !c.is_finished()) {
            return Err(ServiceError::AlreadyRunning);
        }

        // Reset prior state for every configured root before any worker runs.
        for entry in &self.sites {
            if let Some(existing) = self.store.find_site_by_url(&entry.url)? {
                debug!(site = %entry.url, "deleting previous site data");
                self.store.delete_site(existing.id)?;
            }
        }

        let campaign = Campaign::new();
        info!(campaign = %campaign.id, sites = self.sites.len(), "starting crawl campaign");

        let mut handles = Vec::with_capacity(self.sites.len());
        for entry in self.sites.clone() {
            let store = Arc::clone(&self.store);
            let fetcher = Arc::clone(&self.fetcher);
            let indexer = self.crawl.index_pages.then(|| Arc::clone(&self.indexer));
            let cancelled = Arc::clone(&campaign.cancelled);
            let crawl = self.crawl.clone();

            handles.push(tokio::spawn(async move {
                crawl_one_site(entry, store, fetcher, indexer, cancelled, crawl).await;
            }));
        }

        let supervisor = Arc::clone(&campaign);
        tokio::spawn(async move {
            for handle in handles {
                let _ = handle.await;
            }
            supervisor.finished.store(true, Ordering::Release);
            supervisor.done.notify_waiters();
            info!(campaign = %supervisor.id, "crawl campaign finished");
        });

        *slot = Some(campaign);
        Ok(())
    }

    /// Cooperatively stop the running campaign. Workers stop expanding their
    /// crawl trees; fetches already in flight are allowed to finish. Every
    /// site still INDEXING transitions to FAILED with a stop message.
    ///
    /// The controller keeps reporting running until the workers drain, so a
    /// new campaign never overlaps the stopped one's in-flight writes.
    pub fn stop(&self) -> Result<(), ServiceError> {
        let slot = self.campaign.lock();
        let Some(campaign) = slot.as_ref().filter(|c| !c.is_finished()) else {
            return Err(ServiceError::NotRunning);
        };
        info!(campaign = %campaign.id, "stopping crawl campaign");
        campaign.cancelled.store(true, Ordering::Relaxed);

        for mut site in self.store.sites_by_status(SiteStatus::Indexing)? {
            site.status = SiteStatus::Failed;
            site.last_error = Some(STOPPED_BY_USER.to_string());
            site.status_time = Utc::now();
            self.store.update_site(&site)?;
        }
        Ok(())
    }

    /// Whether a campaign is currently active.
    pub fn is_running(&self) -> bool {
        self.campaign
            .lock()
            .as_ref()
            .is_some_and(|c| !c.is_finished())
    }

    /// Wait until the current campaign (if any) has fully drained.
    pub async fn wait_idle(&self) {
        let campaign = self.campaign.lock().clone();
        if let Some(campaign) = campaign {
            loop {
                let notified = campaign.done.notified();
                if campaign.is_finished() {
                    return;
                }
                notified.await;
            }
        }
    }

    /// Fetch and index a single page on demand, bypassing depth and
    /// visited-set bookkeeping. Independent of any active campaign; existing
    /// site data is not reset.
    pub async fn index_single_page(&self, page_url: &str) -> Result<(), ServiceError> {
        let Some(entry) = self
            .sites
            .iter()
            .find(|entry| page_url.starts_with(&entry.url))
        else {
            return Err(ServiceError::OutsideConfiguredScope);
        };
        let url =
            Url::parse(page_url).map_err(|e| ServiceError::InvalidUrl(format!("{page_url}: {e}")))?;

        let mut site = match self.store.find_site_by_url(&entry.url)? {
            Some(site) => site,
            None => self
                .store
                .create_site(&entry.url, &entry.name, SiteStatus::Indexing)?,
        };

        let outcome = self.fetcher.fetch(&url).await?;
        if outcome.status != 200 {
            return Err(ServiceError::BadStatus(outcome.status));
        }
        if !is_html_like(&outcome.content_type) {
            return Err(ServiceError::UnsupportedContentType(outcome.content_type));
        }

        let path = site_path(&UrlFilter::normalize(page_url), &entry.url);
        let page = self
            .store
            .upsert_page(site.id, &path, outcome.status, &outcome.body)?;
        self.indexer.index_page(&page)?;

        site.status = SiteStatus::Indexed;
        site.status_time = Utc::now();
        site.last_error = None;
        self.store.update_site(&site)?;
        info!(url = %page_url, path = %path, "indexed single page");
        Ok(())
    }

    /// Aggregate and per-site counts, computed read-only from the store.
    pub fn statistics(&self) -> Result<StatisticsReport, ServiceError> {
        let sites = self.store.all_sites()?;
        let mut detailed = Vec::with_capacity(sites.len());
        let mut total_pages = 0;
        let mut total_lemmas = 0;
        for site in &sites {
            let pages = self.store.page_count(site.id)?;
            let lemmas = self.store.lemma_count(site.id)?;
            total_pages += pages;
            total_lemmas += lemmas;
            detailed.push(SiteStatistics {
                url: site.url.clone(),
                name: site.name.clone(),
                status: site.status,
                status_time: site.status_time,
                error: site.last_error.clone(),
                pages,
                lemmas,
            });
        }
        Ok(StatisticsReport {
            total: TotalStatistics {
                sites: sites.len() as u64,
                pages: total_pages,
                lemmas: total_lemmas,
                indexing: self.is_running(),
            },
            detailed,
        })
    }
}

/// Run one site's crawl end to end, reporting the terminal outcome through
/// the site's status row.
async fn crawl_one_site(
    entry: SiteEntry,
    store: Arc<dyn SearchStore>,
    fetcher: Arc<PageFetcher>,
    indexer: Option<Arc<PageIndexer>>,
    cancelled: Arc<AtomicBool>,
    crawl: CrawlConfig,
) {
    let site = match store.create_site(&entry.url, &entry.name, SiteStatus::Indexing) {
        Ok(site) => site,
        Err(e) => {
            error!(site = %entry.url, error = %e, "failed to create site row");
            return;
        }
    };
    let filter = match UrlFilter::new(&entry.url) {
        Ok(filter) => filter,
        Err(e) => {
            mark_failed(&*store, site.id, format!("invalid site url: {e}"));
            return;
        }
    };

    info!(site = %entry.url, "site crawl started");
    let crawler = Arc::new(SiteCrawler::new(
        site.id,
        filter,
        fetcher,
        Arc::clone(&store),
        indexer,
        Arc::clone(&cancelled),
        &crawl,
    ));
    match crawler.run().await {
        Ok(()) => {
            if cancelled.load(Ordering::Relaxed) {
                // stop() sweeps INDEXING rows when it runs, but this row may
                // have been created after that sweep
                mark_stopped_if_indexing(&*store, site.id);
                debug!(site = %entry.url, "site crawl cancelled");
            } else {
                mark_indexed(&*store, site.id);
                info!(site = %entry.url, "site crawl finished");
            }
        }
        Err(e) => {
            error!(site = %entry.url, error = %e, "site crawl failed");
            mark_failed(&*store, site.id, e.to_string());
        }
    }
}

fn mark_stopped_if_indexing(store: &dyn SearchStore, site_id: SiteId) {
    match store.find_site(site_id) {
        Ok(Some(site)) if site.status == SiteStatus::Indexing => {
            mark_failed(store, site_id, STOPPED_BY_USER.to_string());
        }
        Ok(_) => {}
        Err(e) => {
            error!(site_id, error = %e, "failed to load site after cancelled crawl");
        }
    }
}

fn mark_indexed(store: &dyn SearchStore, site_id: SiteId) {
    update_status(store, site_id, SiteStatus::Indexed, None);
}

fn mark_failed(store: &dyn SearchStore, site_id: SiteId, message: String) {
    update_status(store, site_id, SiteStatus::Failed, Some(message));
}

fn update_status(
    store: &dyn SearchStore,
    site_id: SiteId,
    status: SiteStatus,
    last_error: Option<String>,
) {
    let mut site = match store.find_site(site_id) {
        Ok(Some(site)) => site,
        Ok(None) => return,
        Err(e) => {
            error!(site_id, error = %e, "failed to load site for status update");
            return;
        }
    };
    site.status = status;
    site.last_error = last_error;
    site.status_time = Utc::now();
    if let Err(e) = store.update_site(&site) {
        error!(site_id, error = %e, "failed to update site status");
    }
}
