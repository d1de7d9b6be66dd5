// Storage layer: pages, files and the buffer pool

pub mod buffer;
pub mod disk;
pub mod heap;
pub mod page;
pub mod store;

pub use store::PageStore;
