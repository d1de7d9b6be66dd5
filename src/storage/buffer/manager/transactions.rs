use std::sync::Arc;
use log::{debug, warn};
use parking_lot::RwLock;

use crate::common::types::{PageId, PagePtr, TxnId};
use crate::storage::buffer::error::Result;
use super::BufferPool;

impl BufferPool {
    /// Commit `txn_id`: flush every page it dirtied, take the flushed content
    /// as the page's new before-image, then release all of its locks.
    ///
    /// If a flush fails the error is returned with the page still dirty and
    /// every lock still held; the transaction has to be aborted.
    pub fn commit(&self, txn_id: TxnId) -> Result<()> {
        let mut flushed = 0;
        for (page_id, page) in self.pages_dirtied_by(txn_id) {
            self.flush_page(page_id)?;
            page.write().set_before_image();
            flushed += 1;
        }

        self.lock_manager.release_all(txn_id);
        self.log.transaction_finished(txn_id);
        debug!("Committed txn {} ({} pages flushed)", txn_id, flushed);
        Ok(())
    }

    /// Abort `txn_id`: throw away every page it dirtied, reload the committed
    /// copy from the page store, then release all of its locks.
    ///
    /// Locks are released even if a reload fails; the first failure is
    /// returned.
    pub fn abort(&self, txn_id: TxnId) -> Result<()> {
        let mut first_error = None;

        for (page_id, _) in self.pages_dirtied_by(txn_id) {
            self.cache.discard(page_id);
            if let Err(e) = self.reload_page(page_id) {
                warn!("Txn {} abort: reloading page {} failed: {}", txn_id, page_id, e);
                first_error.get_or_insert(e);
            }
        }

        self.lock_manager.release_all(txn_id);
        self.log.transaction_finished(txn_id);
        debug!("Aborted txn {}", txn_id);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Commit or abort `txn_id`
    pub fn transaction_complete(&self, txn_id: TxnId, commit: bool) -> Result<()> {
        if commit {
            self.commit(txn_id)
        } else {
            self.abort(txn_id)
        }
    }

    /// Write a dirty page through to its page store.
    ///
    /// The page's update record is logged and forced before the store sees
    /// the page. Clean or non-resident pages are left alone.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let _latch = self.flush_latch.lock();

        let Some(page) = self.cache.peek(page_id) else {
            return Ok(());
        };
        let mut page = page.write();
        let Some(dirtier) = page.is_dirty() else {
            return Ok(());
        };

        let before = page.before_image();
        let lsn = self.log.log_write(dirtier, &before, &page)?;
        self.log.force()?;
        page.lsn = lsn;

        self.page_store(page_id.table_id)?.write_page(&page)?;
        page.mark_clean();

        debug!("Flushed page {} of txn {} at LSN {}", page_id, dirtier, lsn);
        Ok(())
    }

    /// Flush every dirty resident page
    pub fn flush_all_pages(&self) -> Result<()> {
        for page_id in self.cache.keys() {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Flush the resident pages dirtied by `txn_id`
    pub fn flush_pages(&self, txn_id: TxnId) -> Result<()> {
        for (page_id, _) in self.pages_dirtied_by(txn_id) {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Snapshot of the resident pages currently dirtied by `txn_id`
    fn pages_dirtied_by(&self, txn_id: TxnId) -> Vec<(PageId, PagePtr)> {
        self.cache
            .keys()
            .into_iter()
            .filter_map(|page_id| self.cache.peek(page_id).map(|page| (page_id, page)))
            .filter(|(_, page)| page.read().is_dirty() == Some(txn_id))
            .collect()
    }

    fn reload_page(&self, page_id: PageId) -> Result<()> {
        let page = self.page_store(page_id.table_id)?.read_page(page_id)?;
        if let Some((victim, _)) = self.cache.put(page_id, Arc::new(RwLock::new(page)))? {
            debug!("Reloading page {} evicted page {}", page_id, victim);
        }
        Ok(())
    }
}
