use crate::common::types::{PageId, PagePtr, TableId, TxnId};
use crate::storage::buffer::BufferPool;
use crate::storage::buffer::error::Result;
use crate::storage::heap::Tuple;
use crate::storage::page::Page;

/// Backing storage of one table.
///
/// `read_page` and `write_page` move whole pages between the store and the
/// buffer pool. Tuple mutation goes the other way round: the store fetches
/// the pages it needs through `pool`, so it is subject to the same locking as
/// any other access, and returns the pages it changed.
pub trait PageStore: Send + Sync {
    fn table_id(&self) -> TableId;

    /// Read the stored copy of `page_id`
    fn read_page(&self, page_id: PageId) -> Result<Page>;

    /// Persist `page` at its own id
    fn write_page(&self, page: &Page) -> Result<()>;

    fn num_pages(&self) -> Result<u32>;

    /// Insert `tuple` for `txn_id`, filling in its record id.
    ///
    /// Every returned page must already be marked dirty by `txn_id`, and must
    /// have been marked while its write guard was still held.
    fn insert_tuple(&self, pool: &BufferPool, txn_id: TxnId, tuple: &mut Tuple) -> Result<Vec<PagePtr>>;

    /// Delete the record `tuple` points at. Same contract as `insert_tuple`.
    fn delete_tuple(&self, pool: &BufferPool, txn_id: TxnId, tuple: &Tuple) -> Result<Vec<PagePtr>>;
}
