// Write-ahead logging

pub mod log_record;
pub mod log_manager;

pub use log_manager::{LogManager, LogManagerError, Result};
pub use log_record::{LogRecord, LogRecordType, LogRecordContent, PageImageContent};

use crate::common::types::{Lsn, TxnId};
use crate::storage::page::Page;

/// The log as seen from the buffer pool's flush path.
///
/// `log_write` must be followed by `force` before the page itself is handed
/// to the page store.
pub trait WriteAheadLog: Send + Sync {
    /// Append an update record for `after`, whose last committed content is `before`
    fn log_write(&self, txn_id: TxnId, before: &Page, after: &Page) -> Result<Lsn>;

    /// Block until every appended record is durable
    fn force(&self) -> Result<()>;

    /// The pool has committed or aborted `txn_id`
    fn transaction_finished(&self, _txn_id: TxnId) {}
}
