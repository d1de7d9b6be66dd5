use byteorder::{ByteOrder, LittleEndian};
use crate::common::types::PAGE_SIZE;
use crate::storage::page::layout::HEADER_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub free_space_offset: u32,
    pub free_space_size: u32,
    pub record_count: u32,
}

impl Default for PageHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl PageHeader {
    pub fn new() -> Self {
        Self {
            free_space_offset: HEADER_SIZE as u32,
            free_space_size: (PAGE_SIZE - HEADER_SIZE) as u32,
            record_count: 0,
        }
    }

    // Serialize header to bytes
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];

        LittleEndian::write_u32(&mut bytes[0..4], self.free_space_offset);
        LittleEndian::write_u32(&mut bytes[4..8], self.free_space_size);
        LittleEndian::write_u32(&mut bytes[8..12], self.record_count);

        bytes
    }

    // Deserialize header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            free_space_offset: LittleEndian::read_u32(&bytes[0..4]),
            free_space_size: LittleEndian::read_u32(&bytes[4..8]),
            record_count: LittleEndian::read_u32(&bytes[8..12]),
        }
    }

    /// A zero-filled page has never been initialized
    pub fn is_initialized(&self) -> bool {
        self.free_space_offset >= HEADER_SIZE as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_bytes() {
        let header = PageHeader {
            free_space_offset: 100,
            free_space_size: 2000,
            record_count: 7,
        };
        assert_eq!(PageHeader::from_bytes(&header.to_bytes()), header);
        assert!(header.is_initialized());
        assert!(!PageHeader::from_bytes(&[0u8; HEADER_SIZE]).is_initialized());
    }
}
