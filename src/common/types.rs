use std::fmt;
use std::sync::Arc;
use parking_lot::RwLock;
use serde::{Serialize, Deserialize};

use crate::storage::page::Page;

/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Table ID type
pub type TableId = u32;

/// Transaction ID type
pub type TxnId = u32;

/// Slot index of a record within a page
pub type SlotId = u32;

/// LSN (Log Sequence Number) type
pub type Lsn = u64;

/// Identifies a page: the table it belongs to and its position in that table's file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId {
    pub table_id: TableId,
    pub page_no: u32,
}

impl PageId {
    pub fn new(table_id: TableId, page_no: u32) -> Self {
        Self { table_id, page_no }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table_id, self.page_no)
    }
}

/// Access mode requested on a page. Exclusive implies Shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Shared,
    Exclusive,
}

impl Permission {
    /// True if holding `self` is enough to satisfy a request for `requested`
    pub fn covers(self, requested: Permission) -> bool {
        self == Permission::Exclusive || requested == Permission::Shared
    }
}

/// Smart pointer to a cached page
pub type PagePtr = Arc<RwLock<Page>>;
