use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use keeldb::common::logger::initialize_logger;
use keeldb::storage::buffer::BufferPoolError;
use keeldb::{
    BufferPool, BufferPoolConfig, Catalog, HeapFile, LogManager, LogManagerConfig, PageStore,
    TransactionManager, Tuple,
};

const TABLE_ID: u32 = 1;
const MAX_ATTEMPTS: usize = 100;

#[derive(Parser)]
#[command(author, version, about = "KeelDB - transactional page cache workload driver")]
struct Cli {
    /// Directory holding the table file and the log
    #[arg(short, long, default_value = "keeldb-data")]
    data_dir: PathBuf,

    /// Buffer pool size (number of pages)
    #[arg(short, long, default_value_t = 50)]
    buffer_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run concurrent insert transactions against a fresh table
    Run {
        /// Worker threads
        #[arg(short, long, default_value_t = 4)]
        threads: usize,

        /// Transactions per thread
        #[arg(long, default_value_t = 25)]
        txns: usize,

        /// Tuples inserted by each transaction
        #[arg(long, default_value_t = 10)]
        tuples: usize,

        /// Upper bound of the randomized lock wait, in milliseconds
        #[arg(long, default_value_t = 200)]
        lock_timeout_ms: u64,
    },

    /// Show the table and log in the data directory
    Info,
}

/// Everything a workload needs, wired together
struct Database {
    heap: Arc<HeapFile>,
    log: Arc<LogManager>,
    txn_manager: TransactionManager,
}

impl Database {
    fn open(data_dir: &Path, buffer_size: usize, lock_timeout: Duration, fresh: bool) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("creating {}", data_dir.display()))?;

        let table_path = data_dir.join("table1.dat");
        let log_config = LogManagerConfig {
            log_dir: data_dir.to_path_buf(),
            ..LogManagerConfig::default()
        };
        if fresh {
            // A new table invalidates any old log
            let _ = std::fs::remove_file(log_config.log_path());
        }

        let heap = Arc::new(if fresh {
            HeapFile::create(TABLE_ID, &table_path)?
        } else {
            HeapFile::open(TABLE_ID, &table_path)?
        });
        let log = Arc::new(LogManager::new(log_config)?);

        let catalog = Arc::new(Catalog::new());
        catalog.add_table(heap.clone());

        let mut config = BufferPoolConfig::with_pages(buffer_size);
        config.lock_timeout_max = lock_timeout.max(config.lock_timeout_min);
        let pool = Arc::new(BufferPool::new(config, catalog, log.clone())?);

        Ok(Self {
            heap,
            txn_manager: TransactionManager::new(pool, log.clone()),
            log,
        })
    }

    /// Insert `tuples` rows in one transaction, retrying from scratch when a
    /// lock wait times out. Returns the number of aborted attempts.
    fn insert_batch(&self, worker: usize, batch: usize, tuples: usize) -> Result<usize> {
        let pool = self.txn_manager.pool();

        for attempt in 0..MAX_ATTEMPTS {
            let txn_id = self.txn_manager.begin()?;

            let outcome = (0..tuples).try_for_each(|i| {
                let mut tuple = Tuple::new(format!("worker {} batch {} row {}", worker, batch, i));
                pool.insert_tuple(txn_id, TABLE_ID, &mut tuple)
            });

            match outcome {
                Ok(()) => {
                    self.txn_manager.commit(txn_id)?;
                    return Ok(attempt);
                }
                Err(BufferPoolError::TransactionAborted { page_id, .. }) => {
                    warn!("Txn {} timed out on page {}, retrying", txn_id, page_id);
                    self.txn_manager.abort(txn_id)?;
                }
                Err(e) => {
                    self.txn_manager.abort(txn_id)?;
                    return Err(e.into());
                }
            }
        }

        Err(anyhow!("worker {} batch {} gave up after {} attempts", worker, batch, MAX_ATTEMPTS))
    }
}

fn run(cli: &Cli, threads: usize, txns: usize, tuples: usize, lock_timeout_ms: u64) -> Result<()> {
    let db = Database::open(&cli.data_dir, cli.buffer_size, Duration::from_millis(lock_timeout_ms), true)?;
    let retries = AtomicUsize::new(0);
    let start = Instant::now();

    crossbeam::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                let db = &db;
                let retries = &retries;
                s.spawn(move |_| -> Result<()> {
                    for batch in 0..txns {
                        let aborted = db.insert_batch(worker, batch, tuples)?;
                        retries.fetch_add(aborted, Ordering::Relaxed);
                    }
                    Ok(())
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| anyhow!("worker thread panicked"))?)
            .collect::<Result<Vec<()>>>()
    })
    .map_err(|_| anyhow!("worker scope panicked"))??;

    let elapsed = start.elapsed();
    let reader = db.txn_manager.begin()?;
    let rows = db.heap.scan(db.txn_manager.pool(), reader)?.len();
    db.txn_manager.commit(reader)?;

    info!("Workload finished in {:?}", elapsed);
    println!("Committed {} transactions in {:?}", threads * txns, elapsed);
    println!("Retried after lock timeouts: {}", retries.load(Ordering::Relaxed));
    println!("Rows: {}, pages: {}", rows, db.heap.num_pages()?);
    println!("WAL records: {}", db.log.read_records()?.len());
    Ok(())
}

fn info(cli: &Cli) -> Result<()> {
    let db = Database::open(&cli.data_dir, cli.buffer_size, Duration::from_millis(2000), false)?;

    let reader = db.txn_manager.begin()?;
    let rows = db.heap.scan(db.txn_manager.pool(), reader)?.len();
    db.txn_manager.commit(reader)?;

    println!("Table file: {}", db.heap.path().display());
    println!("Pages: {}, rows: {}", db.heap.num_pages()?, rows);
    println!("Log file: {}", db.log.path().display());
    println!("WAL records: {}, durable LSN: {}", db.log.read_records()?.len(), db.log.flushed_lsn());
    Ok(())
}

fn main() -> Result<()> {
    initialize_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { threads, txns, tuples, lock_timeout_ms } => {
            run(&cli, threads, txns, tuples, lock_timeout_ms)
        }
        Commands::Info => info(&cli),
    }
}
