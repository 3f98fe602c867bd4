//! Sled-backed search store
//!
//! Layout: five named trees. Sites are keyed by big-endian id; pages, lemmas,
//! and index entries are keyed with the owning site's big-endian id as a
//! prefix so `scan_prefix` implements per-site reads and cascade deletes.
//! Insert-if-absent goes through `compare_and_swap`; frequency increments go
//! through `update_and_fetch`, so both are atomic under concurrent writers.

use std::path::Path;

use chrono::Utc;
use tracing::warn;

use crate::types::{LemmaId, LemmaRecord, PageId, PageRecord, SiteId, SiteRecord, SiteStatus};

use super::{SearchStore, StoreError};

pub struct SledStore {
    db: sled::Db,
    /// site id -> SiteRecord
    sites: sled::Tree,
    /// site url -> site id (for url lookups and uniqueness)
    site_urls: sled::Tree,
    /// site id + path -> PageRecord
    pages: sled::Tree,
    /// site id + lemma -> LemmaRecord
    lemmas: sled::Tree,
    /// site id + page id + lemma id -> IndexEntry
    index: sled::Tree,
}

fn scoped_key(site_id: SiteId, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + suffix.len());
    key.extend_from_slice(&site_id.to_be_bytes());
    key.extend_from_slice(suffix);
    key
}

fn index_key(site_id: SiteId, page_id: PageId, lemma_id: LemmaId) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(&site_id.to_be_bytes());
    key.extend_from_slice(&page_id.to_be_bytes());
    key.extend_from_slice(&lemma_id.to_be_bytes());
    key
}

impl SledStore {
    /// Open or create the database under `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = data_dir.as_ref().join("sitelex.sled");
        let db = sled::open(db_path)?;
        let sites = db.open_tree("sites")?;
        let site_urls = db.open_tree("site_urls")?;
        let pages = db.open_tree("pages")?;
        let lemmas = db.open_tree("lemmas")?;
        let index = db.open_tree("index")?;
        Ok(Self {
            db,
            sites,
            site_urls,
            pages,
            lemmas,
            index,
        })
    }

    fn next_id(&self) -> Result<u64, StoreError> {
        Ok(self.db.generate_id()?)
    }

    fn remove_site_scope(&self, tree: &sled::Tree, site_id: SiteId) -> Result<(), StoreError> {
        let keys: Vec<sled::IVec> = tree
            .scan_prefix(site_id.to_be_bytes())
            .keys()
            .collect::<Result<_, _>>()?;
        for key in keys {
            tree.remove(key)?;
        }
        Ok(())
    }
}

impl SearchStore for SledStore {
    fn create_site(
        &self,
        url: &str,
        name: &str,
        status: SiteStatus,
    ) -> Result<SiteRecord, StoreError> {
        let record = SiteRecord {
            id: self.next_id()?,
            url: url.to_string(),
            name: name.to_string(),
            status,
            status_time: Utc::now(),
            last_error: None,
        };
        self.sites
            .insert(record.id.to_be_bytes(), bincode::serialize(&record)?)?;
        self.site_urls
            .insert(url.as_bytes(), &record.id.to_be_bytes())?;
        Ok(record)
    }

    fn update_site(&self, site: &SiteRecord) -> Result<(), StoreError> {
        self.sites
            .insert(site.id.to_be_bytes(), bincode::serialize(site)?)?;
        Ok(())
    }

    fn find_site(&self, id: SiteId) -> Result<Option<SiteRecord>, StoreError> {
        match self.sites.get(id.to_be_bytes())? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    fn find_site_by_url(&self, url: &str) -> Result<Option<SiteRecord>, StoreError> {
        let Some(id_bytes) = self.site_urls.get(url.as_bytes())? else {
            return Ok(None);
        };
        let mut id = [0u8; 8];
        id.copy_from_slice(&id_bytes);
        self.find_site(u64::from_be_bytes(id))
    }

    fn sites_by_status(&self, status: SiteStatus) -> Result<Vec<SiteRecord>, StoreError> {
        Ok(self
            .all_sites()?
            .into_iter()
            .filter(|site| site.status == status)
            .collect())
    }

    fn all_sites(&self) -> Result<Vec<SiteRecord>, StoreError> {
        let mut sites = Vec::new();
        for entry in self.sites.iter() {
            let (key, data) = entry?;
            match bincode::deserialize(&data) {
                Ok(site) => sites.push(site),
                Err(e) => warn!("Skipping corrupt site record {:?}: {}", key, e),
            }
        }
        Ok(sites)
    }

    fn delete_site(&self, id: SiteId) -> Result<(), StoreError> {
        let Some(site) = self.find_site(id)? else {
            return Ok(());
        };
        self.sites.remove(id.to_be_bytes())?;
        self.site_urls.remove(site.url.as_bytes())?;
        self.remove_site_scope(&self.pages, id)?;
        self.remove_site_scope(&self.lemmas, id)?;
        self.remove_site_scope(&self.index, id)?;
        Ok(())
    }

    fn find_page(&self, site_id: SiteId, path: &str) -> Result<Option<PageRecord>, StoreError> {
        match self.pages.get(scoped_key(site_id, path.as_bytes()))? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    fn insert_page_if_absent(
        &self,
        site_id: SiteId,
        path: &str,
        code: u16,
        content: &str,
    ) -> Result<Option<PageRecord>, StoreError> {
        let key = scoped_key(site_id, path.as_bytes());
        if self.pages.contains_key(&key)? {
            return Ok(None);
        }
        let record = PageRecord {
            id: self.next_id()?,
            site_id,
            path: path.to_string(),
            code,
            content: content.to_string(),
        };
        let data = bincode::serialize(&record)?;
        match self
            .pages
            .compare_and_swap(&key, None as Option<&[u8]>, Some(data))?
        {
            Ok(()) => Ok(Some(record)),
            // Lost the race to a concurrent inserter; the key now exists.
            Err(_) => Ok(None),
        }
    }

    fn upsert_page(
        &self,
        site_id: SiteId,
        path: &str,
        code: u16,
        content: &str,
    ) -> Result<PageRecord, StoreError> {
        let id = match self.find_page(site_id, path)? {
            Some(existing) => existing.id,
            None => self.next_id()?,
        };
        let record = PageRecord {
            id,
            site_id,
            path: path.to_string(),
            code,
            content: content.to_string(),
        };
        self.pages
            .insert(scoped_key(site_id, path.as_bytes()), bincode::serialize(&record)?)?;
        Ok(record)
    }

    fn find_lemma(&self, site_id: SiteId, lemma: &str) -> Result<Option<LemmaRecord>, StoreError> {
        match self.lemmas.get(scoped_key(site_id, lemma.as_bytes()))? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    fn find_or_create_lemma(
        &self,
        site_id: SiteId,
        lemma: &str,
    ) -> Result<LemmaRecord, StoreError> {
        let key = scoped_key(site_id, lemma.as_bytes());
        loop {
            if let Some(data) = self.lemmas.get(&key)? {
                return Ok(bincode::deserialize(&data)?);
            }
            let record = LemmaRecord {
                id: self.next_id()?,
                site_id,
                lemma: lemma.to_string(),
                frequency: 0,
            };
            let data = bincode::serialize(&record)?;
            match self
                .lemmas
                .compare_and_swap(&key, None as Option<&[u8]>, Some(data))?
            {
                Ok(()) => return Ok(record),
                // Lost the race; loop around and read the winner's row.
                Err(_) => continue,
            }
        }
    }

    fn bump_lemma_frequency(&self, site_id: SiteId, lemma: &str) -> Result<u32, StoreError> {
        let key = scoped_key(site_id, lemma.as_bytes());
        let updated = self.lemmas.update_and_fetch(&key, |old| {
            let old_bytes = old?;
            let mut record: LemmaRecord = match bincode::deserialize(old_bytes) {
                Ok(record) => record,
                Err(_) => return Some(old_bytes.to_vec()),
            };
            record.frequency += 1;
            match bincode::serialize(&record) {
                Ok(data) => Some(data),
                Err(_) => Some(old_bytes.to_vec()),
            }
        })?;
        match updated {
            Some(data) => {
                let record: LemmaRecord = bincode::deserialize(&data)?;
                Ok(record.frequency)
            }
            None => Err(StoreError::Missing(format!(
                "lemma '{}' for site {}",
                lemma, site_id
            ))),
        }
    }

    fn insert_index_entry(
        &self,
        site_id: SiteId,
        page_id: PageId,
        lemma_id: LemmaId,
        rank: f32,
    ) -> Result<bool, StoreError> {
        let key = index_key(site_id, page_id, lemma_id);
        let entry = crate::types::IndexEntry {
            page_id,
            lemma_id,
            rank,
        };
        let data = bincode::serialize(&entry)?;
        match self
            .index
            .compare_and_swap(&key, None as Option<&[u8]>, Some(data))?
        {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    fn clear_page_index(&self, site_id: SiteId, page_id: PageId) -> Result<u64, StoreError> {
        let mut prefix = Vec::with_capacity(16);
        prefix.extend_from_slice(&site_id.to_be_bytes());
        prefix.extend_from_slice(&page_id.to_be_bytes());

        let keys: Vec<sled::IVec> = self
            .index
            .scan_prefix(&prefix)
            .keys()
            .collect::<Result<_, _>>()?;
        let mut lemma_ids = std::collections::HashSet::new();
        for key in &keys {
            if key.len() == 24 {
                let mut id = [0u8; 8];
                id.copy_from_slice(&key[16..24]);
                lemma_ids.insert(u64::from_be_bytes(id));
            }
            self.index.remove(key)?;
        }
        if lemma_ids.is_empty() {
            return Ok(keys.len() as u64);
        }

        // Walk the site's lemma rows once and decrement the affected ones.
        let lemma_keys: Vec<sled::IVec> = self
            .lemmas
            .scan_prefix(site_id.to_be_bytes())
            .filter_map(|entry| match entry {
                Ok((key, data)) => match bincode::deserialize::<LemmaRecord>(&data) {
                    Ok(record) if lemma_ids.contains(&record.id) => Some(Ok(key)),
                    Ok(_) => None,
                    Err(e) => {
                        warn!("Skipping corrupt lemma record {:?}: {}", key, e);
                        None
                    }
                },
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<_, _>>()?;
        for key in lemma_keys {
            self.lemmas.update_and_fetch(&key, |old| {
                let old_bytes = old?;
                let mut record: LemmaRecord = match bincode::deserialize(old_bytes) {
                    Ok(record) => record,
                    Err(_) => return Some(old_bytes.to_vec()),
                };
                if record.frequency <= 1 {
                    return None;
                }
                record.frequency -= 1;
                match bincode::serialize(&record) {
                    Ok(data) => Some(data),
                    Err(_) => Some(old_bytes.to_vec()),
                }
            })?;
        }
        Ok(keys.len() as u64)
    }

    fn page_count(&self, site_id: SiteId) -> Result<u64, StoreError> {
        let mut count = 0;
        for entry in self.pages.scan_prefix(site_id.to_be_bytes()) {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    fn lemma_count(&self, site_id: SiteId) -> Result<u64, StoreError> {
        let mut count = 0;
        for entry in self.lemmas.scan_prefix(site_id.to_be_bytes()) {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}
