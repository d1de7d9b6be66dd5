use std::fs::{File, OpenOptions};
use std::io::{Read, Write, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::PAGE_SIZE;

#[derive(Error, Debug)]
pub enum DiskManagerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Page {page_no} is past the end of the file ({num_pages} pages)")]
    PageOutOfRange { page_no: u32, num_pages: u32 },
}

/// DiskManager performs page-sized I/O on a single table file.
/// Page `n` lives at byte offset `n * PAGE_SIZE`.
pub struct DiskManager {
    path: PathBuf,
    db_file: Mutex<File>,
}

impl DiskManager {
    /// Open (creating if missing) the file at `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DiskManagerError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            db_file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a page from disk
    pub fn read_page(&self, page_no: u32) -> Result<[u8; PAGE_SIZE], DiskManagerError> {
        let mut file = self.db_file.lock();

        let num_pages = Self::pages_in(&file)?;
        if page_no >= num_pages {
            return Err(DiskManagerError::PageOutOfRange { page_no, num_pages });
        }

        let mut buffer = [0u8; PAGE_SIZE];
        file.seek(SeekFrom::Start(Self::page_offset(page_no)))?;
        file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    /// Write a page to disk. Writing one page past the end extends the file.
    pub fn write_page(&self, page_no: u32, data: &[u8; PAGE_SIZE]) -> Result<(), DiskManagerError> {
        let mut file = self.db_file.lock();

        let num_pages = Self::pages_in(&file)?;
        if page_no > num_pages {
            return Err(DiskManagerError::PageOutOfRange { page_no, num_pages });
        }

        file.seek(SeekFrom::Start(Self::page_offset(page_no)))?;
        file.write_all(data)?;
        file.flush()?;

        Ok(())
    }

    /// Append a page with the given content and return its number
    pub fn allocate_page(&self, data: &[u8; PAGE_SIZE]) -> Result<u32, DiskManagerError> {
        let mut file = self.db_file.lock();

        let page_no = Self::pages_in(&file)?;
        file.seek(SeekFrom::Start(Self::page_offset(page_no)))?;
        file.write_all(data)?;
        file.flush()?;

        Ok(page_no)
    }

    /// Number of whole pages in the file
    pub fn num_pages(&self) -> Result<u32, DiskManagerError> {
        let file = self.db_file.lock();
        Self::pages_in(&file)
    }

    fn pages_in(file: &File) -> Result<u32, DiskManagerError> {
        Ok((file.metadata()?.len() / PAGE_SIZE as u64) as u32)
    }

    fn page_offset(page_no: u32) -> u64 {
        page_no as u64 * PAGE_SIZE as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_allocate_read_write() {
        let dir = TempDir::new().unwrap();
        let disk = DiskManager::new(dir.path().join("t.dat")).unwrap();
        assert_eq!(disk.num_pages().unwrap(), 0);

        let mut data = [0u8; PAGE_SIZE];
        data[0] = 1;
        assert_eq!(disk.allocate_page(&data).unwrap(), 0);
        data[0] = 2;
        assert_eq!(disk.allocate_page(&data).unwrap(), 1);
        assert_eq!(disk.num_pages().unwrap(), 2);

        data[0] = 9;
        disk.write_page(0, &data).unwrap();
        assert_eq!(disk.read_page(0).unwrap()[0], 9);
        assert_eq!(disk.read_page(1).unwrap()[0], 2);
    }

    #[test]
    fn test_read_past_end() {
        let dir = TempDir::new().unwrap();
        let disk = DiskManager::new(dir.path().join("t.dat")).unwrap();

        match disk.read_page(3) {
            Err(DiskManagerError::PageOutOfRange { page_no, num_pages }) => {
                assert_eq!(page_no, 3);
                assert_eq!(num_pages, 0);
            }
            other => panic!("Expected PageOutOfRange, got {:?}", other.map(|_| ())),
        }
        assert!(disk.write_page(2, &[0u8; PAGE_SIZE]).is_err());
    }

    #[test]
    fn test_reopen_keeps_pages() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.dat");
        {
            let disk = DiskManager::new(&path).unwrap();
            disk.allocate_page(&[5u8; PAGE_SIZE]).unwrap();
        }

        let disk = DiskManager::new(&path).unwrap();
        assert_eq!(disk.num_pages().unwrap(), 1);
        assert_eq!(disk.read_page(0).unwrap()[100], 5);
    }
}
