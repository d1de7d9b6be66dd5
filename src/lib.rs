// KeelDB transactional page cache

pub mod common;
pub mod storage;
pub mod transaction;
pub mod catalog;

// Re-export key items for convenient access
pub use common::config::{BufferPoolConfig, LogManagerConfig};
pub use common::types::{PageId, Permission, PagePtr, TxnId, TableId};
pub use storage::buffer::{BufferPool, BufferPoolError};
pub use storage::heap::{HeapFile, RecordId, Tuple};
pub use storage::page::{Page, PageManager, PageError};
pub use storage::store::PageStore;
pub use transaction::concurrency::{LockManager, TransactionManager, TransactionError};
pub use transaction::wal::{LogManager, WriteAheadLog};
pub use catalog::Catalog;
