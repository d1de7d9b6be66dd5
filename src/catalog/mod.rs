//! Table registry consulted by the buffer pool to find a page's store

pub mod catalog;

pub use self::catalog::Catalog;
