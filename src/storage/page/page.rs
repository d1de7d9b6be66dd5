use std::fmt;

use crate::common::types::{Lsn, PageId, TxnId, PAGE_SIZE};

/// In-memory copy of a table page.
///
/// `dirtier` doubles as the ownership tag for uncommitted work: while it is
/// set, the page holds changes of that transaction which the page store has
/// not seen yet, and the cache refuses to evict it.
#[derive(Clone)]
pub struct Page {
    pub data: [u8; PAGE_SIZE],
    pub page_id: PageId,
    /// LSN of the last update record written for this page
    pub lsn: Lsn,
    dirtier: Option<TxnId>,
    before_image: Box<[u8; PAGE_SIZE]>,
}

impl Page {
    /// Create a zero-filled, clean page
    pub fn new(page_id: PageId) -> Self {
        Self::from_data(page_id, [0; PAGE_SIZE])
    }

    /// Wrap bytes read from the page store. The page starts clean and the
    /// bytes double as its before-image.
    pub fn from_data(page_id: PageId, data: [u8; PAGE_SIZE]) -> Self {
        Self {
            data,
            page_id,
            lsn: 0,
            dirtier: None,
            before_image: Box::new(data),
        }
    }

    pub fn id(&self) -> PageId {
        self.page_id
    }

    /// The transaction holding uncommitted changes on this page, if any
    pub fn is_dirty(&self) -> Option<TxnId> {
        self.dirtier
    }

    /// Record that `txn_id` modified this page
    pub fn mark_dirty(&mut self, txn_id: TxnId) {
        self.dirtier = Some(txn_id);
    }

    /// Only the flush path and fresh loads may clear the tag
    pub(crate) fn mark_clean(&mut self) {
        self.dirtier = None;
    }

    /// Snapshot of the page as it was at the last commit boundary
    pub fn before_image(&self) -> Page {
        Page::from_data(self.page_id, *self.before_image)
    }

    pub fn before_image_data(&self) -> &[u8] {
        &self.before_image[..]
    }

    /// Take the current content as the before-image for the next writer
    pub fn set_before_image(&mut self) {
        self.before_image.copy_from_slice(&self.data);
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("page_id", &self.page_id)
            .field("lsn", &self.lsn)
            .field("dirtier", &self.dirtier)
            .finish()
    }
}
