//! The pager: demand-loads pages from the database file into a fixed-size
//! cache and writes them back on close. It knows nothing about node
//! structure — that's `page`'s job — only about page-sized chunks of bytes
//! at page-sized offsets.
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, trace};

use crate::err;
use crate::errors::Error;

use super::page::{Page, PAGE_SIZE};

/// Upper bound on the number of pages the pager will cache at once. A page
/// index reaching this is reported as `Error::Capacity`, matching the fixed
/// array of page slots the tutorial's pager is built around.
pub const MAX_PAGES: usize = 100;

pub struct Pager {
    file: File,
    /// Number of pages known to exist, on disk or newly allocated.
    num_pages: u32,
    cache: Vec<Option<Box<Page>>>,
}

impl Pager {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        debug!(path = %path.as_ref().display(), "opening database file");
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path.as_ref())?;

        let file_length = file.seek(SeekFrom::End(0))?;
        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(err!(
                Corruption,
                "database file length {} is not a multiple of page size {}",
                file_length,
                PAGE_SIZE
            ));
        }
        let num_pages = (file_length / PAGE_SIZE as u64) as u32;

        let mut cache = Vec::with_capacity(MAX_PAGES);
        cache.resize_with(MAX_PAGES, || None);

        debug!(num_pages, "opened database file");
        Ok(Pager {
            file,
            num_pages,
            cache,
        })
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Returns a reference to the page at `page_idx`, reading it from disk
    /// into the cache first if it isn't already resident.
    pub fn get_page(&mut self, page_idx: u32) -> Result<&Page, Error> {
        self.load(page_idx)?;
        Ok(self.cache[page_idx as usize].as_ref().unwrap())
    }

    /// Same as `get_page`, but mutable. Any write through this reference is
    /// flushed to disk at `close`, not immediately.
    pub fn get_page_mut(&mut self, page_idx: u32) -> Result<&mut Page, Error> {
        self.load(page_idx)?;
        Ok(self.cache[page_idx as usize].as_mut().unwrap())
    }

    fn load(&mut self, page_idx: u32) -> Result<(), Error> {
        let idx = page_idx as usize;
        if idx >= MAX_PAGES {
            return Err(err!(
                Capacity,
                "page index {} exceeds the pager's {} page cache",
                page_idx,
                MAX_PAGES
            ));
        }
        if self.cache[idx].is_some() {
            return Ok(());
        }

        let page = if page_idx < self.num_pages {
            debug!(page_idx, "page fault: reading page from disk");
            let mut bytes = [0u8; PAGE_SIZE];
            self.file.seek(SeekFrom::Start(page_idx as u64 * PAGE_SIZE as u64))?;
            self.file.read_exact(&mut bytes)?;
            Page::from_bytes(bytes)
        } else {
            Page::zeroed()
        };
        if page_idx >= self.num_pages {
            self.num_pages = page_idx + 1;
        }
        self.cache[idx] = Some(Box::new(page));
        Ok(())
    }

    /// Allocates a fresh page index one past the current end of the file,
    /// without reading anything from disk for it.
    pub fn allocate_page(&mut self) -> Result<u32, Error> {
        if self.num_pages as usize >= MAX_PAGES {
            return Err(err!(
                Capacity,
                "cannot allocate page: cache capacity {} reached",
                MAX_PAGES
            ));
        }
        let idx = self.num_pages;
        self.load(idx)?;
        Ok(idx)
    }

    /// Writes a single cached page back to disk.
    pub fn flush(&mut self, page_idx: u32) -> Result<(), Error> {
        let idx = page_idx as usize;
        let page = match &self.cache[idx] {
            Some(p) => p,
            None => return Ok(()),
        };
        trace!(page_idx, "flushing page");
        self.file.seek(SeekFrom::Start(page_idx as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(page.as_bytes())?;
        Ok(())
    }

    /// Flushes every resident page and syncs the underlying file.
    pub fn close(&mut self) -> Result<(), Error> {
        for idx in 0..self.num_pages {
            self.flush(idx)?;
        }
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn allocate_and_reopen_round_trips() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        {
            let mut pager = Pager::open(&path).unwrap();
            let idx = pager.allocate_page().unwrap();
            assert_eq!(idx, 0);
            let page = pager.get_page_mut(idx).unwrap();
            page.initialize_leaf();
            page.set_leaf_num_cells(5);
            pager.close().unwrap();
        }
        {
            let mut pager = Pager::open(&path).unwrap();
            assert_eq!(pager.num_pages(), 1);
            let page = pager.get_page(0).unwrap();
            assert_eq!(page.leaf_num_cells(), 5);
        }
    }

    #[test]
    fn rejects_truncated_file() {
        let tmp = NamedTempFile::new().unwrap();
        {
            let mut f = tmp.reopen().unwrap();
            f.write_all(&[0u8; 10]).unwrap();
        }
        assert!(matches!(Pager::open(tmp.path()), Err(Error::Corruption(_))));
    }

    #[test]
    fn get_page_past_capacity_is_an_error() {
        let tmp = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(tmp.path()).unwrap();
        assert!(matches!(
            pager.get_page(MAX_PAGES as u32),
            Err(Error::Capacity(_))
        ));
    }
}
