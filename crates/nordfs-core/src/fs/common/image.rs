/// Flat disk image access by page number
use anyhow::Result;
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::Path;

use crate::error::FormatError;

/// NORD page: 1024 words of 16 bits
pub const PAGE_SIZE: usize = 2048;

enum Backing {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

/// A read-only, flattened single-sided disk image
pub struct Image {
    backing: Backing,
}

impl Image {
    /// Memory-map an image file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let size = file.metadata()?.len();

        if size == 0 {
            return Ok(Self::from_bytes(Vec::new()));
        }

        let mmap = unsafe { MmapOptions::new().map(&file)? };

        tracing::debug!("Mapped {} ({} bytes)", path.as_ref().display(), size);

        Ok(Image {
            backing: Backing::Mapped(mmap),
        })
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Image {
            backing: Backing::Owned(data),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.backing {
            Backing::Owned(data) => data.as_slice(),
            Backing::Mapped(mmap) => &mmap[..],
        }
    }

    /// Number of whole pages in the image
    pub fn page_count(&self) -> usize {
        self.len() / PAGE_SIZE
    }

    /// Read one full page
    pub fn get_page(&self, page_number: u32) -> Result<&[u8; PAGE_SIZE], FormatError> {
        let out_of_range = || FormatError::OutOfRange {
            page: page_number,
            image_len: self.len(),
        };

        let start = (page_number as usize)
            .checked_mul(PAGE_SIZE)
            .ok_or_else(out_of_range)?;
        let end = start.checked_add(PAGE_SIZE).ok_or_else(out_of_range)?;

        self.as_bytes()
            .get(start..end)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(out_of_range)
    }

    /// Iterate over whole pages with their page numbers
    pub fn pages(&self) -> impl Iterator<Item = (u32, &[u8; PAGE_SIZE])> + '_ {
        self.as_bytes()
            .chunks_exact(PAGE_SIZE)
            .enumerate()
            .filter_map(|(i, chunk)| Some((i as u32, chunk.try_into().ok()?)))
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.backing {
            Backing::Owned(_) => "owned",
            Backing::Mapped(_) => "mapped",
        };
        f.debug_struct("Image")
            .field("backing", &kind)
            .field("len", &self.len())
            .finish()
    }
}
