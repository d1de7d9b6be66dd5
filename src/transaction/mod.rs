// Transaction management: locking, write-ahead logging and the transaction lifecycle

pub mod concurrency;
pub mod wal;

// Public exports
pub use concurrency::{LockManager, TransactionManager, TransactionError};
pub use wal::{LogManager, LogRecord, LogRecordType, WriteAheadLog};
