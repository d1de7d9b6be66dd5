use thiserror::Error;
use crate::common::types::{PageId, TableId, TxnId};
use crate::storage::disk::DiskManagerError;
use crate::storage::page::PageError;
use crate::transaction::wal::LogManagerError;

#[derive(Error, Debug)]
pub enum BufferPoolError {
    /// The lock wait bound ran out. The caller must abort the transaction.
    #[error("Transaction {txn_id} aborted waiting for a lock on page {page_id}")]
    TransactionAborted { txn_id: TxnId, page_id: PageId },
    #[error("No clean page available for eviction")]
    NoCleanPageAvailable,
    #[error("Table {0} not found in catalog")]
    TableNotFound(TableId),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Disk manager error: {0}")]
    DiskManagerError(#[from] DiskManagerError),
    #[error("Page error: {0}")]
    PageError(#[from] PageError),
    #[error("Log error: {0}")]
    LogError(#[from] LogManagerError),
}

pub type Result<T> = std::result::Result<T, BufferPoolError>;
