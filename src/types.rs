//! Persisted domain records shared by the crawler, the indexing pipeline,
//! and the storage backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type SiteId = u64;
pub type PageId = u64;
pub type LemmaId = u64;

/// Lifecycle status of a crawled site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SiteStatus {
    Indexing,
    Indexed,
    Failed,
}

impl SiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indexing => "INDEXING",
            Self::Indexed => "INDEXED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One crawled site root. Created fresh at campaign start; prior rows for the
/// same url are deleted together with their pages, lemmas, and index entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRecord {
    pub id: SiteId,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    /// Timestamp of the last status transition.
    pub status_time: DateTime<Utc>,
    pub last_error: Option<String>,
}

/// A fetched page, keyed by (site, path) in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: PageId,
    pub site_id: SiteId,
    /// Site-relative path, always starting with `/`.
    pub path: String,
    /// HTTP status code returned for the page.
    pub code: u16,
    /// Raw HTML body as fetched.
    pub content: String,
}

/// A normal word form scoped to one site, keyed by (site, lemma) in the store.
///
/// `frequency` is the document frequency: the number of pages of the site
/// whose index entries reference this lemma.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LemmaRecord {
    pub id: LemmaId,
    pub site_id: SiteId,
    pub lemma: String,
    pub frequency: u32,
}

/// One (page, lemma) occurrence row. `rank` is the number of occurrences of
/// the lemma within that page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub page_id: PageId,
    pub lemma_id: LemmaId,
    pub rank: f32,
}
