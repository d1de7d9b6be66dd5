use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use log::{debug, warn};
use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::TxnId;
use crate::storage::buffer::{BufferPool, BufferPoolError};
use crate::transaction::wal::{LogManager, LogManagerError};

/// Errors that can occur during transaction processing
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Transaction {0} is not active")]
    NotActive(TxnId),

    #[error("Buffer pool error: {0}")]
    Pool(#[from] BufferPoolError),

    #[error("Failed to write to WAL: {0}")]
    Log(#[from] LogManagerError),
}

/// Result type for transaction operations
pub type Result<T> = std::result::Result<T, TransactionError>;

/// Hands out transaction ids and drives commit/abort through the buffer pool,
/// bracketing each transaction with BEGIN and COMMIT/ABORT log records.
///
/// Only active transactions are tracked; a finished one is indistinguishable
/// from one that never existed.
pub struct TransactionManager {
    next_txn_id: AtomicU32,
    pool: Arc<BufferPool>,
    log_manager: Arc<LogManager>,
    active: Mutex<HashSet<TxnId>>,
}

impl TransactionManager {
    /// Ids continue after the highest one already in the log
    pub fn new(pool: Arc<BufferPool>, log_manager: Arc<LogManager>) -> Self {
        Self {
            next_txn_id: AtomicU32::new(log_manager.max_txn_id() + 1),
            pool,
            log_manager,
            active: Mutex::new(HashSet::new()),
        }
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Start a new transaction
    pub fn begin(&self) -> Result<TxnId> {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        self.log_manager.log_begin(txn_id)?;
        self.active.lock().insert(txn_id);
        debug!("Began txn {}", txn_id);
        Ok(txn_id)
    }

    /// Commit `txn_id`: flush its pages, release its locks, then force a
    /// COMMIT record.
    ///
    /// If the pool fails to flush, the transaction stays active and still
    /// holds its locks; the caller is expected to abort it. Once the pool
    /// commit succeeds the transaction is over, even if the COMMIT record
    /// then fails to reach the log.
    pub fn commit(&self, txn_id: TxnId) -> Result<()> {
        self.ensure_active(txn_id)?;

        self.pool.commit(txn_id)?;
        self.active.lock().remove(&txn_id);

        if let Err(e) = self.log_manager.log_commit(txn_id) {
            warn!("Txn {} is committed but its COMMIT record was not forced: {}", txn_id, e);
            return Err(e.into());
        }
        debug!("Committed txn {}", txn_id);
        Ok(())
    }

    /// Abort `txn_id`: drop its changes, release its locks, then force an
    /// ABORT record. The transaction ends even if reloading one of its pages
    /// fails; that error is still returned.
    pub fn abort(&self, txn_id: TxnId) -> Result<()> {
        self.ensure_active(txn_id)?;

        let pool_result = self.pool.abort(txn_id);
        if let Err(e) = &pool_result {
            warn!("Abort of txn {} could not reload every page: {}", txn_id, e);
        }

        self.active.lock().remove(&txn_id);
        self.log_manager.log_abort(txn_id)?;
        debug!("Aborted txn {}", txn_id);

        pool_result.map_err(TransactionError::from)
    }

    fn ensure_active(&self, txn_id: TxnId) -> Result<()> {
        if self.is_active(txn_id) {
            Ok(())
        } else {
            Err(TransactionError::NotActive(txn_id))
        }
    }

    pub fn is_active(&self, txn_id: TxnId) -> bool {
        self.active.lock().contains(&txn_id)
    }

    /// Ids of all active transactions, in ascending order
    pub fn active_transactions(&self) -> Vec<TxnId> {
        let mut ids: Vec<TxnId> = self.active.lock().iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}
