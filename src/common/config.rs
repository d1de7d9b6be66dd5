use std::path::PathBuf;
use std::time::Duration;
use rand::Rng;

/// Default number of pages cached by a buffer pool
pub const DEFAULT_PAGES: usize = 50;

/// Configuration for the buffer pool
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Maximum number of resident pages
    pub num_pages: usize,

    /// Lower bound of the randomized lock wait
    pub lock_timeout_min: Duration,

    /// Upper bound of the randomized lock wait
    pub lock_timeout_max: Duration,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            num_pages: DEFAULT_PAGES,
            lock_timeout_min: Duration::from_millis(10),
            lock_timeout_max: Duration::from_millis(2000),
        }
    }
}

impl BufferPoolConfig {
    /// Config with the given capacity and default lock timeouts
    pub fn with_pages(num_pages: usize) -> Self {
        Self {
            num_pages,
            ..Self::default()
        }
    }

    /// Pin the lock wait to a fixed duration
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_min = timeout;
        self.lock_timeout_max = timeout;
        self
    }

    /// Draw the wait bound for one lock request.
    ///
    /// Each call picks a fresh value so that transactions stuck in a cycle
    /// time out at different moments and one of them gets through.
    pub fn lock_timeout(&self) -> Duration {
        let min = self.lock_timeout_min.as_millis() as u64;
        let max = self.lock_timeout_max.as_millis() as u64;
        if min >= max {
            return self.lock_timeout_min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// Configuration for the log manager
#[derive(Debug, Clone)]
pub struct LogManagerConfig {
    /// Path to the log directory
    pub log_dir: PathBuf,

    /// Name of the log file inside `log_dir`
    pub log_file_name: String,

    /// Whether `force` syncs the file to stable storage
    pub force_sync: bool,
}

impl Default for LogManagerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            log_file_name: "keeldb.wal".to_string(),
            force_sync: true,
        }
    }
}

impl LogManagerConfig {
    /// Full path of the log file
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(&self.log_file_name)
    }
}
