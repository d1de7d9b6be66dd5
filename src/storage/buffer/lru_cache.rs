use linked_hash_map::LinkedHashMap;
use log::trace;
use parking_lot::Mutex;

use crate::common::types::{PageId, PagePtr};
use crate::storage::buffer::error::{BufferPoolError, Result};

/// Fixed-capacity page cache ordered by recency.
///
/// The front of the map is the least recently used entry. Only clean pages
/// are ever evicted, so a full cache of dirty pages refuses new entries.
pub struct LruPageCache {
    capacity: usize,
    pages: Mutex<LinkedHashMap<PageId, PagePtr>>,
}

impl LruPageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            pages: Mutex::new(LinkedHashMap::new()),
        }
    }

    /// Look up a page and mark it most recently used
    pub fn get(&self, page_id: PageId) -> Option<PagePtr> {
        self.pages.lock().get_refresh(&page_id).map(|page| page.clone())
    }

    /// Look up a page without touching its recency
    pub fn peek(&self, page_id: PageId) -> Option<PagePtr> {
        self.pages.lock().get(&page_id).cloned()
    }

    /// Insert or overwrite `page_id`, making it most recently used.
    ///
    /// Returns the evicted page when a new entry pushed the cache over capacity.
    pub fn put(&self, page_id: PageId, page: PagePtr) -> Result<Option<(PageId, PagePtr)>> {
        let mut pages = self.pages.lock();

        if pages.remove(&page_id).is_some() {
            pages.insert(page_id, page);
            return Ok(None);
        }

        let victim = if pages.len() >= self.capacity {
            Self::evict_from(&mut pages)?
        } else {
            None
        };
        pages.insert(page_id, page);
        Ok(victim)
    }

    /// Return the resident copy of `page_id`, or insert `page` when there is
    /// none. The lookup, eviction and insert happen under one lock so two
    /// loaders of the same page agree on a single copy.
    pub fn get_or_insert(&self, page_id: PageId, page: PagePtr) -> Result<PagePtr> {
        let mut pages = self.pages.lock();

        if let Some(resident) = pages.get_refresh(&page_id) {
            return Ok(resident.clone());
        }

        if pages.len() >= self.capacity {
            Self::evict_from(&mut pages)?;
        }
        pages.insert(page_id, page.clone());
        Ok(page)
    }

    /// Evict the least recently used clean page.
    ///
    /// `Ok(None)` if the cache is empty, `NoCleanPageAvailable` if every
    /// resident page is dirty.
    pub fn evict_one(&self) -> Result<Option<(PageId, PagePtr)>> {
        Self::evict_from(&mut self.pages.lock())
    }

    fn evict_from(pages: &mut LinkedHashMap<PageId, PagePtr>) -> Result<Option<(PageId, PagePtr)>> {
        if pages.is_empty() {
            return Ok(None);
        }

        // A write-locked page may be getting dirtied right now; skip it
        let victim = pages
            .iter()
            .find(|(_, page)| page.try_read().is_some_and(|guard| guard.is_dirty().is_none()))
            .map(|(page_id, _)| *page_id);

        match victim {
            Some(page_id) => {
                trace!("Evicting page {}", page_id);
                Ok(pages.remove(&page_id).map(|page| (page_id, page)))
            }
            None => Err(BufferPoolError::NoCleanPageAvailable),
        }
    }

    /// Remove a page regardless of its state
    pub fn discard(&self, page_id: PageId) -> Option<PagePtr> {
        self.pages.lock().remove(&page_id)
    }

    /// Resident page ids, least recently used first
    pub fn keys(&self) -> Vec<PageId> {
        self.pages.lock().keys().copied().collect()
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.pages.lock().contains_key(&page_id)
    }

    pub fn len(&self) -> usize {
        self.pages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
