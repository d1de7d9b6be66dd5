pub mod config;
pub mod logger;
pub mod types;

pub use config::{BufferPoolConfig, LogManagerConfig};
pub use types::{PageId, Permission, PagePtr, TxnId, TableId, Lsn, PAGE_SIZE};
