//! Per-page indexing pipeline
//!
//! Extracts visible text from a stored page, lemmatizes it, and writes the
//! lemma and index rows. Re-indexing first clears the page's previous index
//! rows and decrements the affected document frequencies, so changed content
//! leaves no stale rows and identical content reproduces the same index.

use std::sync::Arc;

use tracing::debug;

use crate::morph::Lemmatizer;
use crate::storage::{SearchStore, StoreError};
use crate::types::PageRecord;

use super::text::extract_text;

pub struct PageIndexer {
    store: Arc<dyn SearchStore>,
    lemmatizer: Lemmatizer,
}

impl PageIndexer {
    pub fn new(store: Arc<dyn SearchStore>) -> Self {
        Self {
            store,
            lemmatizer: Lemmatizer::new(),
        }
    }

    /// Index one stored page: drop its previous index rows, then upsert its
    /// site-scoped lemma rows and write one index row per distinct lemma,
    /// with rank = in-page occurrence count.
    pub fn index_page(&self, page: &PageRecord) -> Result<(), StoreError> {
        let cleared = self.store.clear_page_index(page.site_id, page.id)?;
        if cleared > 0 {
            debug!(
                site_id = page.site_id,
                path = %page.path,
                cleared,
                "dropped previous index rows"
            );
        }
        let text = extract_text(&page.content);
        let counts = self.lemmatizer.lemma_counts(&text);

        let mut new_entries = 0usize;
        for (lemma, count) in &counts {
            let record = self.store.find_or_create_lemma(page.site_id, lemma)?;
            if self
                .store
                .insert_index_entry(page.site_id, page.id, record.id, *count as f32)?
            {
                self.store.bump_lemma_frequency(page.site_id, lemma)?;
                new_entries += 1;
            }
        }
        debug!(
            site_id = page.site_id,
            path = %page.path,
            lemmas = counts.len(),
            new_entries,
            "indexed page"
        );
        Ok(())
    }
}
