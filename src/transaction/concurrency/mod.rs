// Transaction concurrency module exports

pub mod lock;
pub mod lock_manager;
pub mod transaction_manager;

// Public exports
pub use lock::{Lock, LockSet};
pub use lock_manager::LockManager;
pub use transaction_manager::{TransactionManager, TransactionError};
