//! Persistence contract for sites, pages, lemmas, and index entries.
//!
//! The crawler and the indexing pipeline only ever talk to the
//! [`SearchStore`] trait; [`SledStore`] is the embedded backend shipped with
//! the binary. Uniqueness of (site, path) pages and (site, lemma) lemmas is
//! enforced by the store itself through keyed insert-if-absent operations.

mod sled_store;

pub use sled_store::SledStore;

use thiserror::Error;

use crate::types::{LemmaId, LemmaRecord, PageId, PageRecord, SiteId, SiteRecord, SiteStatus};

/// Errors surfaced by a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("record not found: {0}")]
    Missing(String),
}

/// Storage contract consumed by the crawler and the indexing pipeline.
///
/// All operations are synchronous; callers running on the async runtime keep
/// individual calls short (single-record reads and writes).
pub trait SearchStore: Send + Sync {
    /// Create a new site row with a fresh id and register its url.
    fn create_site(&self, url: &str, name: &str, status: SiteStatus)
        -> Result<SiteRecord, StoreError>;

    /// Overwrite an existing site row.
    fn update_site(&self, site: &SiteRecord) -> Result<(), StoreError>;

    fn find_site(&self, id: SiteId) -> Result<Option<SiteRecord>, StoreError>;

    fn find_site_by_url(&self, url: &str) -> Result<Option<SiteRecord>, StoreError>;

    fn sites_by_status(&self, status: SiteStatus) -> Result<Vec<SiteRecord>, StoreError>;

    fn all_sites(&self) -> Result<Vec<SiteRecord>, StoreError>;

    /// Delete a site and cascade to its pages, lemmas, and index entries.
    fn delete_site(&self, id: SiteId) -> Result<(), StoreError>;

    fn find_page(&self, site_id: SiteId, path: &str) -> Result<Option<PageRecord>, StoreError>;

    /// Insert a page keyed by (site, path). Returns `None` without touching
    /// the store when a page for that key already exists.
    fn insert_page_if_absent(
        &self,
        site_id: SiteId,
        path: &str,
        code: u16,
        content: &str,
    ) -> Result<Option<PageRecord>, StoreError>;

    /// Insert or replace a page keyed by (site, path), keeping the existing
    /// page id when the key is already present.
    fn upsert_page(
        &self,
        site_id: SiteId,
        path: &str,
        code: u16,
        content: &str,
    ) -> Result<PageRecord, StoreError>;

    fn find_lemma(&self, site_id: SiteId, lemma: &str) -> Result<Option<LemmaRecord>, StoreError>;

    /// Return the lemma row for (site, lemma), creating it with frequency 0
    /// if absent. Concurrent creators converge on a single row.
    fn find_or_create_lemma(&self, site_id: SiteId, lemma: &str)
        -> Result<LemmaRecord, StoreError>;

    /// Atomically increment a lemma's document frequency, returning the new
    /// value.
    fn bump_lemma_frequency(&self, site_id: SiteId, lemma: &str) -> Result<u32, StoreError>;

    /// Insert one (page, lemma) index row. Returns `false` when the row
    /// already exists, in which case the store is left untouched.
    fn insert_index_entry(
        &self,
        site_id: SiteId,
        page_id: PageId,
        lemma_id: LemmaId,
        rank: f32,
    ) -> Result<bool, StoreError>;

    /// Remove every index row belonging to a page, decrementing the document
    /// frequency of each affected lemma (rows reaching zero are deleted).
    /// Returns the number of rows removed.
    fn clear_page_index(&self, site_id: SiteId, page_id: PageId) -> Result<u64, StoreError>;

    fn page_count(&self, site_id: SiteId) -> Result<u64, StoreError>;

    fn lemma_count(&self, site_id: SiteId) -> Result<u64, StoreError>;

    /// Flush buffered writes to disk.
    fn flush(&self) -> Result<(), StoreError>;
}
