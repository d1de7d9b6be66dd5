use thiserror::Error;
use serde::{Serialize, Deserialize};
use bincode::{serialize, deserialize};

use crate::common::types::{Lsn, PageId, TxnId};

/// Error type for log record operations
#[derive(Error, Debug)]
pub enum LogRecordError {
    #[error("Failed to serialize log record: {0}")]
    SerializationError(String),

    #[error("Failed to deserialize log record: {0}")]
    DeserializationError(String),
}

/// Result type for log record operations
pub type Result<T> = std::result::Result<T, LogRecordError>;

/// Types of log records written by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogRecordType {
    /// Marks the beginning of a transaction
    Begin,
    /// Marks the successful completion of a transaction
    Commit,
    /// Marks the rollback of a transaction
    Abort,
    /// Full before/after images of a page written on flush
    Update,
}

/// Before and after images of one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImageContent {
    pub page_id: PageId,
    pub before_image: Vec<u8>,
    pub after_image: Vec<u8>,
}

/// Content of a transaction boundary record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionOperationContent {
    /// Seconds since the Unix epoch
    pub timestamp: u64,
}

impl TransactionOperationContent {
    fn now() -> Self {
        Self {
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogRecordContent {
    PageImage(PageImageContent),
    Transaction(TransactionOperationContent),
}

/// Main log record structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Log Sequence Number - unique identifier for this log record
    pub lsn: Lsn,
    /// Transaction ID that generated this log record
    pub txn_id: TxnId,
    /// LSN of the previous log record of the same transaction (0 if none)
    pub prev_lsn: Lsn,
    pub record_type: LogRecordType,
    pub content: LogRecordContent,
}

impl LogRecord {
    pub fn new(
        lsn: Lsn,
        txn_id: TxnId,
        prev_lsn: Lsn,
        record_type: LogRecordType,
        content: LogRecordContent,
    ) -> Self {
        Self {
            lsn,
            txn_id,
            prev_lsn,
            record_type,
            content,
        }
    }

    /// Create a BEGIN, COMMIT or ABORT record
    pub fn new_transaction(lsn: Lsn, txn_id: TxnId, prev_lsn: Lsn, record_type: LogRecordType) -> Self {
        Self::new(
            lsn,
            txn_id,
            prev_lsn,
            record_type,
            LogRecordContent::Transaction(TransactionOperationContent::now()),
        )
    }

    /// Create an UPDATE record carrying full page images
    pub fn new_update(
        lsn: Lsn,
        txn_id: TxnId,
        prev_lsn: Lsn,
        page_id: PageId,
        before_image: Vec<u8>,
        after_image: Vec<u8>,
    ) -> Self {
        Self::new(
            lsn,
            txn_id,
            prev_lsn,
            LogRecordType::Update,
            LogRecordContent::PageImage(PageImageContent {
                page_id,
                before_image,
                after_image,
            }),
        )
    }

    /// Page images of an UPDATE record
    pub fn page_image(&self) -> Option<&PageImageContent> {
        match &self.content {
            LogRecordContent::PageImage(content) => Some(content),
            LogRecordContent::Transaction(_) => None,
        }
    }

    /// Serialize the log record to bytes
    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self).map_err(|e| LogRecordError::SerializationError(e.to_string()))
    }

    /// Deserialize bytes into a log record
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        deserialize(data).map_err(|e| LogRecordError::DeserializationError(e.to_string()))
    }
}
