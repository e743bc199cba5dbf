//! File content reconstruction
//!
//! A NORD file is either continuous (the file pointer addresses the first of
//! `pages_in_file` consecutive pages) or indexed (the file pointer addresses
//! an index page holding one double word page pointer per logical page).
//! The entry's max byte pointer gives the exact length.

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

use super::codec::decode_pointer;
use super::entry::ObjectEntry;
use crate::error::{DataIntegrityWarning, FormatError, NordError};
use crate::fs::common::{Image, PAGE_SIZE};

/// Page pointers held by a file index page
pub const FILE_INDEX_ENTRIES: usize = PAGE_SIZE / 4;

/// How the pages of a file are located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Allocation {
    Continuous,
    Indexed,
}

/// Exact content of one object file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructedFile {
    pub name: String,
    pub object_type: String,
    pub allocation: Allocation,
    pub data: Vec<u8>,
    /// Physical page numbers read, in logical order
    pub pages: Vec<u32>,
    pub warning: Option<DataIntegrityWarning>,
}

impl ReconstructedFile {
    pub fn is_complete(&self) -> bool {
        self.warning.is_none()
    }
}

/// Concatenates pages until the declared length is covered or a page is missing
struct PageChain<'a> {
    image: &'a Image,
    limit: usize,
    data: Vec<u8>,
    pages: Vec<u32>,
}

impl<'a> PageChain<'a> {
    fn new(image: &'a Image, limit: usize) -> Self {
        Self {
            image,
            limit,
            data: Vec::with_capacity(limit.min(image.len())),
            pages: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.data.len() >= self.limit
    }

    /// Append one page. Returns false when the page cannot be read.
    fn push(&mut self, page_number: u32) -> bool {
        match self.image.get_page(page_number) {
            Ok(page) => {
                self.data.extend_from_slice(page);
                self.pages.push(page_number);
                true
            }
            Err(e) => {
                tracing::warn!("Stopping page chain: {}", e);
                false
            }
        }
    }
}

/// Reconstruct the content of `entry`, truncated to its declared length.
///
/// Missing data pages do not fail the reconstruction: the bytes that could
/// be read are returned with a `DataIntegrityWarning`.
pub fn reconstruct_file(
    image: &Image,
    entry: &ObjectEntry,
) -> Result<ReconstructedFile, NordError> {
    let pointer = entry.file_pointer;
    if pointer.subindexed {
        return Err(NordError::UnsupportedIndirection { pointer });
    }

    let allocation = if pointer.indexed {
        Allocation::Indexed
    } else {
        Allocation::Continuous
    };

    let declared = entry.declared_len();
    if entry.pages_in_file == 0 {
        // A zero max byte pointer with no pages is an empty file
        let warning = (entry.max_byte_pointer != 0).then(|| {
            let warning = DataIntegrityWarning {
                declared,
                available: 0,
            };
            tracing::warn!("{}: no pages allocated, {}", entry.file_name(), warning);
            warning
        });
        return Ok(ReconstructedFile {
            name: entry.name.clone(),
            object_type: entry.object_type.clone(),
            allocation,
            data: Vec::new(),
            pages: Vec::new(),
            warning,
        });
    }

    let limit = usize::try_from(declared).unwrap_or(usize::MAX);
    let mut chain = PageChain::new(image, limit);

    match allocation {
        Allocation::Continuous => {
            tracing::debug!(
                "Continuous file {} at page {:#x}, {} pages",
                entry.file_name(),
                pointer.page_number,
                entry.pages_in_file
            );
            for i in 0..entry.pages_in_file {
                if chain.is_full() {
                    break;
                }
                let Some(page_number) = pointer.page_number.checked_add(i) else {
                    break;
                };
                if !chain.push(page_number) {
                    break;
                }
            }
        }
        Allocation::Indexed => {
            if entry.pages_in_file as usize > FILE_INDEX_ENTRIES {
                return Err(FormatError::IndexOverflow {
                    pages: entry.pages_in_file,
                    max: FILE_INDEX_ENTRIES,
                }
                .into());
            }

            let index = image.get_page(pointer.page_number)?;
            let slots = index
                .chunks_exact(4)
                .take(entry.pages_in_file as usize)
                .map(BigEndian::read_u32);

            for (i, raw) in slots.enumerate() {
                if chain.is_full() {
                    break;
                }
                if raw == 0 {
                    tracing::warn!("{}: index entry {} is unallocated", entry.file_name(), i);
                    break;
                }
                let page_pointer = decode_pointer(raw);
                if page_pointer.subindexed || page_pointer.indexed {
                    return Err(NordError::UnsupportedIndirection {
                        pointer: page_pointer,
                    });
                }
                if !chain.push(page_pointer.page_number) {
                    break;
                }
            }
        }
    }

    let PageChain {
        mut data, pages, ..
    } = chain;

    let warning = if data.len() < limit {
        let warning = DataIntegrityWarning {
            declared,
            available: data.len() as u64,
        };
        tracing::warn!("{}: {}", entry.file_name(), warning);
        Some(warning)
    } else {
        data.truncate(limit);
        None
    };

    Ok(ReconstructedFile {
        name: entry.name.clone(),
        object_type: entry.object_type.clone(),
        allocation,
        data,
        pages,
        warning,
    })
}
