use crate::common::types::{SlotId, PAGE_SIZE};
use crate::storage::page::Page;
use crate::storage::page::header::PageHeader;
use crate::storage::page::error::PageError;
use crate::storage::page::layout::{HEADER_SIZE, MAX_RECORD_SIZE, RECORD_OFFSET_SIZE, RecordLocation};

/// Slotted-page record layout used by heap files.
///
/// Record bytes grow from the end of the header towards the end of the page;
/// slot entries grow from the end of the page backwards. Deleting a record
/// leaves a tombstone slot so record IDs stay stable.
#[derive(Debug, Default, Clone, Copy)]
pub struct PageManager;

impl PageManager {
    pub fn new() -> Self {
        Self
    }

    pub fn init_page(&self, page: &mut Page) {
        let header = PageHeader::new();
        page.data[0..HEADER_SIZE].copy_from_slice(&header.to_bytes());
    }

    pub fn get_header(&self, page: &Page) -> PageHeader {
        PageHeader::from_bytes(&page.data[0..HEADER_SIZE])
    }

    pub fn get_free_space(&self, page: &Page) -> u32 {
        self.get_header(page).free_space_size
    }

    /// Whether a record of `len` bytes plus its slot entry fits
    pub fn can_fit(&self, page: &Page, len: usize) -> bool {
        let header = self.get_header(page);
        header.is_initialized() && header.free_space_size as usize >= len + RECORD_OFFSET_SIZE
    }

    pub fn insert_record(&self, page: &mut Page, data: &[u8]) -> Result<SlotId, PageError> {
        if data.is_empty() || data.len() > MAX_RECORD_SIZE {
            return Err(PageError::RecordTooLarge(data.len()));
        }

        let mut header = self.get_header(page);
        if !header.is_initialized() {
            self.init_page(page);
            header = self.get_header(page);
        }

        let record_size = data.len() as u32;
        if header.free_space_size < record_size + RECORD_OFFSET_SIZE as u32 {
            return Err(PageError::InsufficientSpace);
        }

        let slot = header.record_count;
        let record_loc = RecordLocation {
            offset: header.free_space_offset,
            length: record_size,
        };

        // Write record data
        let start = header.free_space_offset as usize;
        page.data[start..start + data.len()].copy_from_slice(data);

        // Write slot entry
        let slot_pos = Self::slot_position(slot);
        page.data[slot_pos..slot_pos + RECORD_OFFSET_SIZE].copy_from_slice(&record_loc.to_bytes());

        header.free_space_offset += record_size;
        header.free_space_size -= record_size + RECORD_OFFSET_SIZE as u32;
        header.record_count += 1;
        page.data[0..HEADER_SIZE].copy_from_slice(&header.to_bytes());

        Ok(slot)
    }

    /// Tombstone a record. Its bytes are not reclaimed.
    pub fn delete_record(&self, page: &mut Page, slot: SlotId) -> Result<(), PageError> {
        let mut record_loc = self.record_location(page, slot)?;
        if record_loc.is_deleted() {
            return Err(PageError::RecordNotFound);
        }

        record_loc.length = 0;
        let slot_pos = Self::slot_position(slot);
        page.data[slot_pos..slot_pos + RECORD_OFFSET_SIZE].copy_from_slice(&record_loc.to_bytes());

        Ok(())
    }

    pub fn get_record(&self, page: &Page, slot: SlotId) -> Result<Vec<u8>, PageError> {
        let record_loc = self.record_location(page, slot)?;
        if record_loc.is_deleted() {
            return Err(PageError::RecordNotFound);
        }

        let start = record_loc.offset as usize;
        let end = start + record_loc.length as usize;
        Ok(page.data[start..end].to_vec())
    }

    /// Live records of the page in slot order
    pub fn records(&self, page: &Page) -> Vec<(SlotId, Vec<u8>)> {
        let header = self.get_header(page);
        if !header.is_initialized() {
            return Vec::new();
        }

        (0..header.record_count)
            .filter_map(|slot| self.get_record(page, slot).ok().map(|data| (slot, data)))
            .collect()
    }

    fn record_location(&self, page: &Page, slot: SlotId) -> Result<RecordLocation, PageError> {
        let header = self.get_header(page);
        if !header.is_initialized() || slot >= header.record_count {
            return Err(PageError::InvalidRecordId);
        }

        let slot_pos = Self::slot_position(slot);
        Ok(RecordLocation::from_bytes(&page.data[slot_pos..slot_pos + RECORD_OFFSET_SIZE]))
    }

    // Slot entries are stored from the end of the page
    fn slot_position(slot: SlotId) -> usize {
        PAGE_SIZE - RECORD_OFFSET_SIZE * (slot as usize + 1)
    }
}
