pub mod error;
pub mod lru_cache;
pub mod manager;

pub use error::BufferPoolError;
pub use lru_cache::LruPageCache;
pub use manager::BufferPool;
