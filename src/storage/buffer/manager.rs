use std::sync::Arc;
use log::{debug, info};
use parking_lot::{Mutex, RwLock};

use crate::catalog::Catalog;
use crate::common::config::BufferPoolConfig;
use crate::common::types::{PageId, PagePtr, Permission, TableId, TxnId};
use crate::storage::buffer::error::{BufferPoolError, Result};
use crate::storage::buffer::lru_cache::LruPageCache;
use crate::storage::heap::Tuple;
use crate::storage::store::PageStore;
use crate::transaction::concurrency::LockManager;
use crate::transaction::wal::WriteAheadLog;

mod transactions;

/// Transactional page cache.
///
/// Every page handed out has been locked for the requesting transaction
/// first. Locks are only dropped at commit or abort, or by an explicit
/// `release_page`. Pages dirtied by a live transaction stay resident until
/// that transaction ends.
pub struct BufferPool {
    config: BufferPoolConfig,
    cache: LruPageCache,
    lock_manager: LockManager,
    catalog: Arc<Catalog>,
    log: Arc<dyn WriteAheadLog>,
    /// Serializes page flushes
    flush_latch: Mutex<()>,
}

impl BufferPool {
    pub fn new(
        config: BufferPoolConfig,
        catalog: Arc<Catalog>,
        log: Arc<dyn WriteAheadLog>,
    ) -> Result<Self> {
        if config.num_pages == 0 {
            return Err(BufferPoolError::InvalidOperation(
                "Buffer pool capacity must be at least one page".to_string(),
            ));
        }

        info!(
            "Buffer pool with {} pages, lock wait {:?}..{:?}",
            config.num_pages, config.lock_timeout_min, config.lock_timeout_max
        );

        Ok(Self {
            cache: LruPageCache::new(config.num_pages),
            config,
            lock_manager: LockManager::new(),
            catalog,
            log,
            flush_latch: Mutex::new(()),
        })
    }

    /// Fetch a page on behalf of `txn_id` with the given permission.
    ///
    /// Blocks until the lock is granted or a randomized wait bound expires,
    /// in which case `TransactionAborted` is returned and the caller must
    /// abort. Nothing is rolled back here.
    pub fn fetch_page(&self, txn_id: TxnId, page_id: PageId, permission: Permission) -> Result<PagePtr> {
        let timeout = self.config.lock_timeout();
        if !self.lock_manager.acquire_timeout(txn_id, page_id, permission, timeout) {
            debug!("Txn {} timed out on page {}", txn_id, page_id);
            return Err(BufferPoolError::TransactionAborted { txn_id, page_id });
        }

        if let Some(page) = self.cache.get(page_id) {
            return Ok(page);
        }

        // Read outside the cache lock; if another transaction loaded the
        // same page meanwhile its copy wins
        let page = self.page_store(page_id.table_id)?.read_page(page_id)?;
        self.cache.get_or_insert(page_id, Arc::new(RwLock::new(page)))
    }

    /// Insert `tuple` into table `table_id`. On success the tuple carries the
    /// record id it was stored under.
    pub fn insert_tuple(&self, txn_id: TxnId, table_id: TableId, tuple: &mut Tuple) -> Result<()> {
        let store = self.page_store(table_id)?;
        let pages = store.insert_tuple(self, txn_id, tuple)?;
        self.install_dirty_pages(txn_id, pages)
    }

    /// Delete `tuple` from the table its record id points into
    pub fn delete_tuple(&self, txn_id: TxnId, tuple: &Tuple) -> Result<()> {
        let record_id = tuple.record_id.ok_or_else(|| {
            BufferPoolError::InvalidOperation("Cannot delete a tuple without a record id".to_string())
        })?;

        let store = self.page_store(record_id.page_id.table_id)?;
        let pages = store.delete_tuple(self, txn_id, tuple)?;
        self.install_dirty_pages(txn_id, pages)
    }

    /// Write modified pages back into the cache as dirtied by `txn_id`
    fn install_dirty_pages(&self, txn_id: TxnId, pages: Vec<PagePtr>) -> Result<()> {
        for page in pages {
            let page_id = {
                let mut guard = page.write();
                guard.mark_dirty(txn_id);
                guard.id()
            };
            self.cache.put(page_id, page)?;
        }
        Ok(())
    }

    /// Drop a page from the cache without writing it
    pub fn discard_page(&self, page_id: PageId) {
        if self.cache.discard(page_id).is_some() {
            debug!("Discarded page {}", page_id);
        }
    }

    /// Give up the lock `txn_id` holds on `page_id` before the transaction
    /// ends. This breaks two-phase locking and is only safe for pages the
    /// transaction did not read anything meaningful from.
    pub fn release_page(&self, txn_id: TxnId, page_id: PageId) -> bool {
        self.lock_manager.release(txn_id, page_id)
    }

    pub fn holds_lock(&self, txn_id: TxnId, page_id: PageId) -> bool {
        self.lock_manager.holds(txn_id, page_id)
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &BufferPoolConfig {
        &self.config
    }

    /// Ids of the resident pages, least recently used first
    pub fn resident_pages(&self) -> Vec<PageId> {
        self.cache.keys()
    }

    pub fn is_resident(&self, page_id: PageId) -> bool {
        self.cache.contains(page_id)
    }

    /// Number of resident pages
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.capacity()
    }

    fn page_store(&self, table_id: TableId) -> Result<Arc<dyn PageStore>> {
        self.catalog
            .page_store(table_id)
            .ok_or(BufferPoolError::TableNotFound(table_id))
    }
}
