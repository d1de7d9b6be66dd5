use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use log::{debug, warn};
use parking_lot::Mutex;
use thiserror::Error;

use crate::common::config::LogManagerConfig;
use crate::common::types::{Lsn, TxnId};
use crate::storage::page::Page;
use crate::transaction::wal::WriteAheadLog;
use crate::transaction::wal::log_record::{LogRecord, LogRecordType, LogRecordError};

/// Error type for log manager operations
#[derive(Error, Debug)]
pub enum LogManagerError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Log record error: {0}")]
    LogRecordError(#[from] LogRecordError),

    #[error("Invalid log file format")]
    InvalidFormat,
}

/// Result type for log manager operations
pub type Result<T> = std::result::Result<T, LogManagerError>;

/// Log file header: magic number followed by the format version
struct LogFileHeader;

impl LogFileHeader {
    /// "KWAL" in ASCII
    const MAGIC: u32 = 0x4B57414C;
    const VERSION: u32 = 1;
    const SIZE: u64 = 8;

    fn write_to(file: &mut File) -> io::Result<()> {
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&Self::MAGIC.to_le_bytes())?;
        file.write_all(&Self::VERSION.to_le_bytes())?;
        file.flush()
    }

    fn validate(file: &mut File) -> io::Result<bool> {
        file.seek(SeekFrom::Start(0))?;
        let mut bytes = [0u8; 8];
        file.read_exact(&mut bytes)?;
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Ok(magic == Self::MAGIC && version == Self::VERSION)
    }
}

/// Records appended but not yet written to the file
#[derive(Default)]
struct LogTail {
    /// Length-prefixed serialized records
    pending: Vec<u8>,
    /// Highest LSN in `pending`
    pending_lsn: Lsn,
    /// Last record of each live transaction, for prev_lsn chaining
    chains: HashMap<TxnId, Chain>,
}

#[derive(Clone, Copy)]
struct Chain {
    last_lsn: Lsn,
    /// Opened by a BEGIN record, so only an end record closes it
    begun: bool,
}

/// Manager for write-ahead logging
pub struct LogManager {
    config: LogManagerConfig,

    /// The log file; held for the whole duration of a flush
    log_file: Mutex<File>,

    tail: Mutex<LogTail>,

    /// Next LSN to assign
    next_lsn: AtomicU64,

    /// Highest LSN known to be on disk
    flushed_lsn: AtomicU64,

    /// Highest transaction id seen in the log
    max_txn_id: AtomicU32,

    #[cfg(test)]
    fail_writes: std::sync::atomic::AtomicBool,
}

impl LogManager {
    /// Open the log described by `config`, creating it if needed
    pub fn new(config: LogManagerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.log_dir)?;

        let path = config.log_path();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        let file_size = file.metadata()?.len();
        let (max_lsn, max_txn_id) = if file_size == 0 {
            LogFileHeader::write_to(&mut file)?;
            (0, 0)
        } else {
            if !LogFileHeader::validate(&mut file)? {
                return Err(LogManagerError::InvalidFormat);
            }
            let (records, end) = Self::read_from(&mut file)?;
            if end < file_size {
                warn!("Dropping {} bytes of torn records from {}", file_size - end, path.display());
                file.set_len(end)?;
            }
            (
                records.iter().map(|record| record.lsn).max().unwrap_or(0),
                records.iter().map(|record| record.txn_id).max().unwrap_or(0),
            )
        };

        debug!("Opened log {} at LSN {}", path.display(), max_lsn);

        Ok(Self {
            config,
            log_file: Mutex::new(file),
            tail: Mutex::new(LogTail::default()),
            next_lsn: AtomicU64::new(max_lsn + 1),
            flushed_lsn: AtomicU64::new(max_lsn),
            max_txn_id: AtomicU32::new(max_txn_id),
            #[cfg(test)]
            fail_writes: std::sync::atomic::AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.config.log_path()
    }

    /// Append an UPDATE record with the full before and after images of a page
    pub fn log_update(&self, txn_id: TxnId, before: &Page, after: &Page) -> Result<Lsn> {
        self.append(txn_id, |lsn, prev_lsn| {
            LogRecord::new_update(
                lsn,
                txn_id,
                prev_lsn,
                after.id(),
                before.data.to_vec(),
                after.data.to_vec(),
            )
        })
    }

    pub fn log_begin(&self, txn_id: TxnId) -> Result<Lsn> {
        let lsn = self.append(txn_id, |lsn, prev_lsn| {
            LogRecord::new_transaction(lsn, txn_id, prev_lsn, LogRecordType::Begin)
        })?;
        if let Some(chain) = self.tail.lock().chains.get_mut(&txn_id) {
            chain.begun = true;
        }
        Ok(lsn)
    }

    /// Append a COMMIT record and make it durable
    pub fn log_commit(&self, txn_id: TxnId) -> Result<Lsn> {
        self.log_end(txn_id, LogRecordType::Commit)
    }

    /// Append an ABORT record and make it durable
    pub fn log_abort(&self, txn_id: TxnId) -> Result<Lsn> {
        self.log_end(txn_id, LogRecordType::Abort)
    }

    fn log_end(&self, txn_id: TxnId, record_type: LogRecordType) -> Result<Lsn> {
        let lsn = self.append(txn_id, |lsn, prev_lsn| {
            LogRecord::new_transaction(lsn, txn_id, prev_lsn, record_type)
        })?;
        self.tail.lock().chains.remove(&txn_id);
        self.flush()?;
        Ok(lsn)
    }

    /// Assign an LSN and buffer the record built by `build(lsn, prev_lsn)`
    fn append<F>(&self, txn_id: TxnId, build: F) -> Result<Lsn>
    where
        F: FnOnce(Lsn, Lsn) -> LogRecord,
    {
        let mut tail = self.tail.lock();

        // LSNs are assigned under the tail lock so the buffer stays in LSN order
        let lsn = self.next_lsn.fetch_add(1, Ordering::SeqCst);
        let chain = tail.chains.get(&txn_id).copied();
        let prev_lsn = chain.map_or(0, |chain| chain.last_lsn);
        let data = build(lsn, prev_lsn).serialize()?;

        tail.pending.extend_from_slice(&(data.len() as u32).to_le_bytes());
        tail.pending.extend_from_slice(&data);
        tail.pending_lsn = lsn;
        tail.chains.insert(txn_id, Chain {
            last_lsn: lsn,
            begun: chain.is_some_and(|chain| chain.begun),
        });
        self.max_txn_id.fetch_max(txn_id, Ordering::SeqCst);

        Ok(lsn)
    }

    /// Forget the prev_lsn chain of a transaction that never logged BEGIN.
    /// Chains opened by `log_begin` are closed by `log_commit`/`log_abort`.
    pub fn finish_transaction(&self, txn_id: TxnId) {
        let mut tail = self.tail.lock();
        if tail.chains.get(&txn_id).is_some_and(|chain| !chain.begun) {
            tail.chains.remove(&txn_id);
        }
    }

    /// Write all buffered records to the file. Returns the durable LSN.
    pub fn flush(&self) -> Result<Lsn> {
        let mut file = self.log_file.lock();

        let (data, lsn) = {
            let mut tail = self.tail.lock();
            (std::mem::take(&mut tail.pending), tail.pending_lsn)
        };

        if data.is_empty() {
            return Ok(self.flushed_lsn());
        }

        let start = file.seek(SeekFrom::End(0))?;
        if let Err(e) = self.write_records(&mut file, &data) {
            warn!("Log write failed up to LSN {}: {}", lsn, e);

            // Cut off whatever part made it to the file and put the records
            // back ahead of anything appended meanwhile
            if let Err(truncate_err) = file.set_len(start) {
                warn!("Could not truncate log back to {} bytes: {}", start, truncate_err);
            }
            let mut tail = self.tail.lock();
            let newer = std::mem::replace(&mut tail.pending, data);
            tail.pending.extend_from_slice(&newer);
            return Err(e.into());
        }

        self.flushed_lsn.fetch_max(lsn, Ordering::SeqCst);
        Ok(self.flushed_lsn())
    }

    fn write_records(&self, file: &mut File, data: &[u8]) -> io::Result<()> {
        if self.write_should_fail() {
            file.write_all(&data[..data.len() / 2])?;
            return Err(io::Error::other("injected log write failure"));
        }

        file.write_all(data)?;
        file.flush()?;
        if self.config.force_sync {
            file.sync_data()?;
        }
        Ok(())
    }

    /// Make every following flush fail after writing half of its records
    #[cfg(test)]
    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    #[cfg(test)]
    fn write_should_fail(&self) -> bool {
        self.fail_writes.load(Ordering::SeqCst)
    }

    #[cfg(not(test))]
    fn write_should_fail(&self) -> bool {
        false
    }

    /// Highest LSN known to be durable
    pub fn flushed_lsn(&self) -> Lsn {
        self.flushed_lsn.load(Ordering::SeqCst)
    }

    /// LSN that the next appended record will get
    pub fn next_lsn(&self) -> Lsn {
        self.next_lsn.load(Ordering::SeqCst)
    }

    /// Highest transaction id found in the log or appended since it was opened
    pub fn max_txn_id(&self) -> TxnId {
        self.max_txn_id.load(Ordering::SeqCst)
    }

    /// Read back every durable record in LSN order
    pub fn read_records(&self) -> Result<Vec<LogRecord>> {
        let mut file = self.log_file.lock();
        Ok(Self::read_from(&mut file)?.0)
    }

    /// Every complete record after the header, and the offset where the last
    /// one ends
    fn read_from(file: &mut File) -> Result<(Vec<LogRecord>, u64)> {
        let file_size = file.metadata()?.len();
        let mut offset = file.seek(SeekFrom::Start(LogFileHeader::SIZE))?;

        let mut records = Vec::new();
        while file_size - offset >= 4 {
            let mut size_bytes = [0u8; 4];
            file.read_exact(&mut size_bytes)?;

            let size = u32::from_le_bytes(size_bytes) as u64;
            if size > file_size - offset - 4 {
                // Torn write at the tail
                warn!("Ignoring truncated log record at offset {}", offset);
                break;
            }

            let mut record_data = vec![0u8; size as usize];
            file.read_exact(&mut record_data)?;
            records.push(LogRecord::deserialize(&record_data)?);
            offset += 4 + size;
        }

        Ok((records, offset))
    }
}

impl WriteAheadLog for LogManager {
    fn log_write(&self, txn_id: TxnId, before: &Page, after: &Page) -> Result<Lsn> {
        self.log_update(txn_id, before, after)
    }

    fn force(&self) -> Result<()> {
        self.flush().map(|_| ())
    }

    fn transaction_finished(&self, txn_id: TxnId) {
        self.finish_transaction(txn_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::PageId;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> LogManagerConfig {
        LogManagerConfig {
            log_dir: dir.path().to_path_buf(),
            log_file_name: "test.wal".to_string(),
            force_sync: false,
        }
    }

    #[test]
    fn test_log_manager_creation() {
        let temp_dir = TempDir::new().unwrap();
        let log_manager = LogManager::new(test_config(&temp_dir)).unwrap();

        assert!(log_manager.path().exists());
        assert_eq!(log_manager.next_lsn(), 1);
        assert_eq!(log_manager.flushed_lsn(), 0);
        assert!(log_manager.read_records().unwrap().is_empty());
    }

    #[test]
    fn test_records_not_durable_until_flush() {
        let temp_dir = TempDir::new().unwrap();
        let log_manager = LogManager::new(test_config(&temp_dir)).unwrap();

        let lsn1 = log_manager.log_begin(1).unwrap();
        let lsn2 = log_manager.log_begin(2).unwrap();
        assert_eq!(lsn2, lsn1 + 1);
        assert!(log_manager.read_records().unwrap().is_empty());

        assert_eq!(log_manager.flush().unwrap(), lsn2);
        let records = log_manager.read_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].lsn, lsn1);
        assert_eq!(records[1].txn_id, 2);
    }

    #[test]
    fn test_prev_lsn_chain_and_commit_forces() {
        let temp_dir = TempDir::new().unwrap();
        let log_manager = LogManager::new(test_config(&temp_dir)).unwrap();

        let mut before = Page::new(PageId::new(1, 0));
        before.data[0] = 1;
        let mut after = before.clone();
        after.data[0] = 2;

        let begin = log_manager.log_begin(7).unwrap();
        let update = log_manager.log_update(7, &before, &after).unwrap();
        let commit = log_manager.log_commit(7).unwrap();

        // Commit is forced without an explicit flush
        assert_eq!(log_manager.flushed_lsn(), commit);
        let records = log_manager.read_records().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].prev_lsn, begin);
        assert_eq!(records[2].prev_lsn, update);
        assert_eq!(records[2].record_type, LogRecordType::Commit);

        let image = records[1].page_image().unwrap();
        assert_eq!(image.page_id, PageId::new(1, 0));
        assert_eq!(image.before_image[0], 1);
        assert_eq!(image.after_image[0], 2);
    }

    #[test]
    fn test_reopen_continues_lsn_sequence() {
        let temp_dir = TempDir::new().unwrap();
        {
            let log_manager = LogManager::new(test_config(&temp_dir)).unwrap();
            log_manager.log_begin(1).unwrap();
            log_manager.log_abort(1).unwrap();
        }

        let log_manager = LogManager::new(test_config(&temp_dir)).unwrap();
        assert_eq!(log_manager.next_lsn(), 3);
        assert_eq!(log_manager.flushed_lsn(), 2);
        assert_eq!(log_manager.read_records().unwrap().len(), 2);
    }

    #[test]
    fn test_failed_flush_keeps_records_and_leaves_no_torn_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        {
            let log_manager = LogManager::new(config.clone()).unwrap();
            log_manager.log_begin(1).unwrap();
            log_manager.flush().unwrap();
            let durable_len = std::fs::metadata(config.log_path()).unwrap().len();

            log_manager.log_begin(2).unwrap();
            log_manager.fail_writes(true);
            assert!(log_manager.flush().is_err());
            assert_eq!(std::fs::metadata(config.log_path()).unwrap().len(), durable_len);
            assert_eq!(log_manager.flushed_lsn(), 1);

            // Appended while the write was failing, flushed after the lost one
            log_manager.log_begin(3).unwrap();
            log_manager.fail_writes(false);
            assert_eq!(log_manager.flush().unwrap(), 3);

            let lsns: Vec<Lsn> = log_manager.read_records().unwrap().iter().map(|r| r.lsn).collect();
            assert_eq!(lsns, vec![1, 2, 3]);
        }

        let reopened = LogManager::new(config).unwrap();
        assert_eq!(reopened.read_records().unwrap().len(), 3);
        assert_eq!(reopened.next_lsn(), 4);
    }

    #[test]
    fn test_oversized_length_prefix_is_dropped_on_open() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        {
            let log_manager = LogManager::new(config.clone()).unwrap();
            log_manager.log_begin(1).unwrap();
            log_manager.log_commit(1).unwrap();
        }
        let good_len = std::fs::metadata(config.log_path()).unwrap().len();

        let mut file = OpenOptions::new().append(true).open(config.log_path()).unwrap();
        file.write_all(&u32::MAX.to_le_bytes()).unwrap();
        file.write_all(b"garbage").unwrap();
        drop(file);

        let log_manager = LogManager::new(config.clone()).unwrap();
        assert_eq!(std::fs::metadata(config.log_path()).unwrap().len(), good_len);
        assert_eq!(log_manager.read_records().unwrap().len(), 2);

        // New records land right after the last good one
        log_manager.log_begin(2).unwrap();
        log_manager.flush().unwrap();
        assert_eq!(log_manager.read_records().unwrap().len(), 3);
    }

    #[test]
    fn test_chains_are_dropped_when_transactions_finish() {
        let temp_dir = TempDir::new().unwrap();
        let log_manager = LogManager::new(test_config(&temp_dir)).unwrap();
        let page = Page::new(PageId::new(1, 0));

        // Logged only through the pool: closed by transaction_finished
        log_manager.log_write(5, &page, &page).unwrap();
        log_manager.transaction_finished(5);
        assert!(log_manager.tail.lock().chains.is_empty());

        // Opened with BEGIN: survives the pool and is closed by COMMIT
        let begin = log_manager.log_begin(6).unwrap();
        log_manager.log_write(6, &page, &page).unwrap();
        log_manager.transaction_finished(6);
        let commit = log_manager.log_commit(6).unwrap();
        assert!(log_manager.tail.lock().chains.is_empty());

        let records = log_manager.read_records().unwrap();
        let commit_record = records.iter().find(|r| r.lsn == commit).unwrap();
        assert_eq!(commit_record.prev_lsn, begin + 1);
    }

    #[test]
    fn test_max_txn_id_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let log_manager = LogManager::new(test_config(&temp_dir)).unwrap();
            assert_eq!(log_manager.max_txn_id(), 0);
            log_manager.log_begin(4).unwrap();
            log_manager.log_begin(9).unwrap();
            log_manager.log_abort(9).unwrap();
            assert_eq!(log_manager.max_txn_id(), 9);
        }

        let log_manager = LogManager::new(test_config(&temp_dir)).unwrap();
        assert_eq!(log_manager.max_txn_id(), 9);
    }

    #[test]
    fn test_rejects_foreign_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        std::fs::write(config.log_path(), b"definitely not a log").unwrap();

        assert!(matches!(LogManager::new(config), Err(LogManagerError::InvalidFormat)));
    }
}
