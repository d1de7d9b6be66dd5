#![allow(dead_code)]

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use anyhow::Result;
use parking_lot::Mutex;
use tempfile::TempDir;

use keeldb::common::types::{Lsn, PAGE_SIZE};
use keeldb::storage::buffer::error::Result as PoolResult;
use keeldb::storage::disk::DiskManagerError;
use keeldb::transaction::wal::{self, LogManagerError};
use keeldb::{
    BufferPool, BufferPoolConfig, Catalog, HeapFile, LogManager, LogManagerConfig, Page, PageId,
    PageManager, PagePtr, PageStore, Permission, TableId, TxnId, Tuple, WriteAheadLog,
};

pub const TABLE_ID: TableId = 1;

/// Calls observed by the instrumented store and log, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    LogWrite(PageId),
    Force,
    WritePage(PageId),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// In-memory page store that records every write
pub struct MemoryPageStore {
    table_id: TableId,
    pages: Mutex<Vec<[u8; PAGE_SIZE]>>,
    events: EventLog,
    reads: AtomicUsize,
}

impl MemoryPageStore {
    /// Store with `num_pages` pages, page `n` filled with byte `n`
    pub fn new(table_id: TableId, num_pages: u32, events: EventLog) -> Self {
        let pages = (0..num_pages).map(|n| [n as u8; PAGE_SIZE]).collect();
        Self {
            table_id,
            pages: Mutex::new(pages),
            events,
            reads: AtomicUsize::new(0),
        }
    }

    /// Stored bytes of page `page_no`
    pub fn stored(&self, page_no: u32) -> [u8; PAGE_SIZE] {
        self.pages.lock()[page_no as usize]
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl PageStore for MemoryPageStore {
    fn table_id(&self) -> TableId {
        self.table_id
    }

    fn read_page(&self, page_id: PageId) -> PoolResult<Page> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let pages = self.pages.lock();
        let data = pages.get(page_id.page_no as usize).ok_or(DiskManagerError::PageOutOfRange {
            page_no: page_id.page_no,
            num_pages: pages.len() as u32,
        })?;
        Ok(Page::from_data(page_id, *data))
    }

    fn write_page(&self, page: &Page) -> PoolResult<()> {
        self.events.lock().push(Event::WritePage(page.id()));
        self.pages.lock()[page.id().page_no as usize] = page.data;
        Ok(())
    }

    fn num_pages(&self) -> PoolResult<u32> {
        Ok(self.pages.lock().len() as u32)
    }

    /// Appends a fresh page for every tuple
    fn insert_tuple(&self, pool: &BufferPool, txn_id: TxnId, tuple: &mut Tuple) -> PoolResult<Vec<PagePtr>> {
        let page_no = {
            let mut pages = self.pages.lock();
            pages.push([0u8; PAGE_SIZE]);
            pages.len() as u32 - 1
        };

        let page_id = PageId::new(self.table_id, page_no);
        let page = pool.fetch_page(txn_id, page_id, Permission::Exclusive)?;
        {
            let mut guard = page.write();
            let slot = PageManager::new().insert_record(&mut guard, &tuple.data)?;
            guard.mark_dirty(txn_id);
            tuple.record_id = Some(keeldb::RecordId::new(page_id, slot));
        }
        Ok(vec![page])
    }

    fn delete_tuple(&self, pool: &BufferPool, txn_id: TxnId, tuple: &Tuple) -> PoolResult<Vec<PagePtr>> {
        let record_id = tuple.record_id.ok_or(keeldb::PageError::InvalidRecordId)?;
        let page = pool.fetch_page(txn_id, record_id.page_id, Permission::Exclusive)?;
        {
            let mut guard = page.write();
            PageManager::new().delete_record(&mut guard, record_id.slot)?;
            guard.mark_dirty(txn_id);
        }
        Ok(vec![page])
    }
}

/// One update record captured by `RecordingLog`
#[derive(Debug, Clone)]
pub struct LoggedUpdate {
    pub txn_id: TxnId,
    pub page_id: PageId,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
}

/// Write-ahead log that only remembers what it was asked to do
#[derive(Default)]
pub struct RecordingLog {
    events: EventLog,
    updates: Mutex<Vec<LoggedUpdate>>,
    finished: Mutex<Vec<TxnId>>,
    fail_force: AtomicBool,
}

impl RecordingLog {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn updates(&self) -> Vec<LoggedUpdate> {
        self.updates.lock().clone()
    }

    /// Transactions the pool reported as committed or aborted, in order
    pub fn finished(&self) -> Vec<TxnId> {
        self.finished.lock().clone()
    }

    /// Make every subsequent `force` fail
    pub fn fail_force(&self, fail: bool) {
        self.fail_force.store(fail, Ordering::SeqCst);
    }
}

impl WriteAheadLog for RecordingLog {
    fn log_write(&self, txn_id: TxnId, before: &Page, after: &Page) -> wal::Result<Lsn> {
        let mut updates = self.updates.lock();
        updates.push(LoggedUpdate {
            txn_id,
            page_id: after.id(),
            before: before.data.to_vec(),
            after: after.data.to_vec(),
        });
        self.events.lock().push(Event::LogWrite(after.id()));
        Ok(updates.len() as Lsn)
    }

    fn force(&self) -> wal::Result<()> {
        if self.fail_force.load(Ordering::SeqCst) {
            return Err(LogManagerError::IoError(io::Error::other("injected force failure")));
        }
        self.events.lock().push(Event::Force);
        Ok(())
    }

    fn transaction_finished(&self, txn_id: TxnId) {
        self.finished.lock().push(txn_id);
    }
}

/// Pool over a single instrumented in-memory table
pub struct MemoryDb {
    pub pool: Arc<BufferPool>,
    pub store: Arc<MemoryPageStore>,
    pub log: Arc<RecordingLog>,
    pub events: EventLog,
}

impl MemoryDb {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

pub fn create_memory_db(capacity: usize, num_pages: u32, lock_timeout: Duration) -> Result<MemoryDb> {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::new(MemoryPageStore::new(TABLE_ID, num_pages, events.clone()));
    let log = Arc::new(RecordingLog::new(events.clone()));

    let catalog = Arc::new(Catalog::new());
    catalog.add_table(store.clone());

    let config = BufferPoolConfig::with_pages(capacity).with_lock_timeout(lock_timeout);
    let pool = Arc::new(BufferPool::new(config, catalog, log.clone())?);

    Ok(MemoryDb { pool, store, log, events })
}

/// Pool over a heap file table with a real log, all inside `temp_dir`
pub fn create_heap_db(
    temp_dir: &TempDir,
    capacity: usize,
) -> Result<(Arc<BufferPool>, Arc<HeapFile>, Arc<LogManager>)> {
    let heap = Arc::new(HeapFile::create(TABLE_ID, temp_dir.path().join("table1.dat"))?);
    let log = Arc::new(LogManager::new(LogManagerConfig {
        log_dir: temp_dir.path().to_path_buf(),
        log_file_name: "test.wal".to_string(),
        force_sync: false,
    })?);

    let catalog = Arc::new(Catalog::new());
    catalog.add_table(heap.clone());

    // Randomized waits so that contending writers do not time out in lockstep
    let config = BufferPoolConfig {
        num_pages: capacity,
        lock_timeout_min: Duration::from_millis(10),
        lock_timeout_max: Duration::from_millis(500),
    };
    let pool = Arc::new(BufferPool::new(config, catalog, log.clone())?);
    Ok((pool, heap, log))
}

pub fn page_id(page_no: u32) -> PageId {
    PageId::new(TABLE_ID, page_no)
}

/// Fetch `page_no` exclusively, overwrite its first byte and mark it dirty
pub fn dirty_page(db: &MemoryDb, txn_id: TxnId, page_no: u32, value: u8) -> Result<PagePtr> {
    let page = db.pool.fetch_page(txn_id, page_id(page_no), Permission::Exclusive)?;
    {
        let mut guard = page.write();
        guard.data[0] = value;
        guard.mark_dirty(txn_id);
    }
    Ok(page)
}

// Generate test data of specified size
pub fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}
