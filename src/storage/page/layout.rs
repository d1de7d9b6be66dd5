use byteorder::{ByteOrder, LittleEndian};
use crate::common::types::PAGE_SIZE;

pub const HEADER_SIZE: usize = 12; // 4 bytes per field * 3 fields
pub const RECORD_OFFSET_SIZE: usize = 8; // 4 bytes for offset + 4 bytes for length

/// Largest record a single empty page can hold
pub const MAX_RECORD_SIZE: usize = PAGE_SIZE - HEADER_SIZE - RECORD_OFFSET_SIZE;

#[derive(Debug, Clone, Copy)]
pub struct RecordLocation {
    pub offset: u32,
    pub length: u32,
}

impl RecordLocation {
    pub fn to_bytes(&self) -> [u8; RECORD_OFFSET_SIZE] {
        let mut bytes = [0u8; RECORD_OFFSET_SIZE];
        LittleEndian::write_u32(&mut bytes[0..4], self.offset);
        LittleEndian::write_u32(&mut bytes[4..8], self.length);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let offset = LittleEndian::read_u32(&bytes[0..4]);
        let length = LittleEndian::read_u32(&bytes[4..8]);
        Self { offset, length }
    }

    /// Deleted slots keep their entry with a zero length
    pub fn is_deleted(&self) -> bool {
        self.length == 0
    }
}
