use std::fmt;

use crate::common::types::{PageId, SlotId};

/// Location of a stored record: its page and slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: SlotId,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: SlotId) -> Self {
        Self { page_id, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.page_id, self.slot)
    }
}

/// Opaque record bytes, plus where they are stored once inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub data: Vec<u8>,
    pub record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            record_id: None,
        }
    }

    pub fn with_record_id(data: impl Into<Vec<u8>>, record_id: RecordId) -> Self {
        Self {
            data: data.into(),
            record_id: Some(record_id),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
