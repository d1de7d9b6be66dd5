use std::fs::File;
use std::io;
use std::path::Path;
use log::debug;

use crate::common::types::{PageId, PagePtr, Permission, TableId, TxnId, PAGE_SIZE};
use crate::storage::buffer::BufferPool;
use crate::storage::buffer::error::{BufferPoolError, Result};
use crate::storage::disk::{DiskManager, DiskManagerError};
use crate::storage::heap::tuple::{RecordId, Tuple};
use crate::storage::page::layout::MAX_RECORD_SIZE;
use crate::storage::page::{Page, PageError, PageManager};
use crate::storage::store::PageStore;

/// Unordered table stored as a sequence of slotted pages in one file
pub struct HeapFile {
    table_id: TableId,
    disk_manager: DiskManager,
    page_manager: PageManager,
}

impl HeapFile {
    /// Create an empty table file at `path`, truncating any existing one
    pub fn create(table_id: TableId, path: impl AsRef<Path>) -> Result<Self> {
        File::create(path.as_ref()).map_err(DiskManagerError::from)?;
        Self::open(table_id, path)
    }

    /// Open an existing table file
    pub fn open(table_id: TableId, path: impl AsRef<Path>) -> Result<Self> {
        if !path.as_ref().exists() {
            let err = io::Error::new(
                io::ErrorKind::NotFound,
                format!("table file {} does not exist", path.as_ref().display()),
            );
            return Err(DiskManagerError::from(err).into());
        }

        Ok(Self {
            table_id,
            disk_manager: DiskManager::new(path)?,
            page_manager: PageManager::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.disk_manager.path()
    }

    /// Every live tuple of the table, read under shared locks held by `txn_id`
    pub fn scan(&self, pool: &BufferPool, txn_id: TxnId) -> Result<Vec<Tuple>> {
        let mut tuples = Vec::new();

        for page_no in 0..self.num_pages()? {
            let page_id = PageId::new(self.table_id, page_no);
            let page = pool.fetch_page(txn_id, page_id, Permission::Shared)?;
            let guard = page.read();
            tuples.extend(
                self.page_manager
                    .records(&guard)
                    .into_iter()
                    .map(|(slot, data)| Tuple::with_record_id(data, RecordId::new(page_id, slot))),
            );
        }

        Ok(tuples)
    }

    /// Store `tuple` in an already exclusively locked page
    fn insert_into(&self, page: &PagePtr, txn_id: TxnId, tuple: &mut Tuple) -> Result<()> {
        let mut guard = page.write();
        let slot = self.page_manager.insert_record(&mut guard, &tuple.data)?;
        guard.mark_dirty(txn_id);
        tuple.record_id = Some(RecordId::new(guard.id(), slot));
        Ok(())
    }

    /// Append an initialized empty page to the file
    fn append_page(&self) -> Result<PageId> {
        let mut page = Page::new(PageId::new(self.table_id, 0));
        self.page_manager.init_page(&mut page);

        let page_no = self.disk_manager.allocate_page(&page.data)?;
        debug!("Table {} grew to {} pages", self.table_id, page_no + 1);
        Ok(PageId::new(self.table_id, page_no))
    }

    fn check_table(&self, page_id: PageId) -> Result<()> {
        if page_id.table_id != self.table_id {
            return Err(BufferPoolError::InvalidOperation(format!(
                "Page {} does not belong to table {}",
                page_id, self.table_id
            )));
        }
        Ok(())
    }
}

impl PageStore for HeapFile {
    fn table_id(&self) -> TableId {
        self.table_id
    }

    fn read_page(&self, page_id: PageId) -> Result<Page> {
        self.check_table(page_id)?;
        let data = self.disk_manager.read_page(page_id.page_no)?;
        Ok(Page::from_data(page_id, data))
    }

    fn write_page(&self, page: &Page) -> Result<()> {
        self.check_table(page.id())?;
        let data: &[u8; PAGE_SIZE] = &page.data;
        self.disk_manager.write_page(page.id().page_no, data)?;
        Ok(())
    }

    fn num_pages(&self) -> Result<u32> {
        Ok(self.disk_manager.num_pages()?)
    }

    fn insert_tuple(&self, pool: &BufferPool, txn_id: TxnId, tuple: &mut Tuple) -> Result<Vec<PagePtr>> {
        let len = tuple.data.len();
        if len == 0 || len > MAX_RECORD_SIZE {
            return Err(PageError::RecordTooLarge(len).into());
        }

        for page_no in 0..self.num_pages()? {
            let page_id = PageId::new(self.table_id, page_no);
            let held_before = pool.holds_lock(txn_id, page_id);

            // Exclusive up front: shared holders of one page cannot both upgrade
            let page = pool.fetch_page(txn_id, page_id, Permission::Exclusive)?;
            let fits = self.page_manager.can_fit(&page.read(), len);
            if !fits {
                // Nothing was read from this page, so letting go early is safe
                if !held_before {
                    pool.release_page(txn_id, page_id);
                }
                continue;
            }

            self.insert_into(&page, txn_id, tuple)?;
            return Ok(vec![page]);
        }

        let page_id = self.append_page()?;
        let page = pool.fetch_page(txn_id, page_id, Permission::Exclusive)?;
        self.insert_into(&page, txn_id, tuple)?;
        Ok(vec![page])
    }

    fn delete_tuple(&self, pool: &BufferPool, txn_id: TxnId, tuple: &Tuple) -> Result<Vec<PagePtr>> {
        let record_id = tuple.record_id.ok_or(PageError::InvalidRecordId)?;
        self.check_table(record_id.page_id)?;

        let page = pool.fetch_page(txn_id, record_id.page_id, Permission::Exclusive)?;
        {
            let mut guard = page.write();
            self.page_manager.delete_record(&mut guard, record_id.slot)?;
            guard.mark_dirty(txn_id);
        }
        Ok(vec![page])
    }
}
