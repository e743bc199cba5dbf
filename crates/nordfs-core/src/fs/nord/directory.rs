//! Directory file traversal
//!
//! The object file and the user file share one organisation. The directory
//! pointer either addresses a single page of 32 entries, or (indexed) an
//! index page whose first 8 double words point to entry pages. That caps a
//! directory at 8 * 32 = 256 entries.

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

use super::codec::{decode_pointer, Pointer};
use super::layout::{ENTRIES_PER_PAGE, ENTRY_SIZE};
use crate::error::{DecodeError, FormatError, NordError};
use crate::fs::common::Image;

/// Page pointers held by a directory index page
pub const DIRECTORY_INDEX_SLOTS: usize = 8;

/// Maximum entries a directory can describe
pub const MAX_DIRECTORY_ENTRIES: usize = DIRECTORY_INDEX_SLOTS * ENTRIES_PER_PAGE;

/// A decoded record and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<R> {
    pub page: u32,
    pub slot: usize,
    pub record: R,
}

/// A contained failure inside one directory
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryIssue {
    #[error("index slot {index_slot}: unsupported pointer {pointer}")]
    UnsupportedIndirection { index_slot: usize, pointer: Pointer },

    #[error("index slot {index_slot}: {error}")]
    PageUnreadable {
        index_slot: usize,
        error: FormatError,
    },

    #[error("page {page:#x} slot {slot}: {error}")]
    Malformed {
        page: u32,
        slot: usize,
        error: DecodeError,
    },
}

/// One step of a directory walk, in the order it was encountered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanItem<'a, R> {
    Record(usize, &'a Located<R>),
    Issue(&'a DirectoryIssue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanStep {
    Record(usize),
    Issue(usize),
}

/// Entries found in a directory, plus whatever went wrong along the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryListing<R> {
    pub records: Vec<Located<R>>,
    pub issues: Vec<DirectoryIssue>,
    order: Vec<ScanStep>,
}

impl<R> Default for DirectoryListing<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            issues: Vec::new(),
            order: Vec::new(),
        }
    }
}

impl<R> DirectoryListing<R> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.iter().map(|located| &located.record)
    }

    /// Records and issues interleaved as the walk met them.
    /// Records carry their index into `records`.
    pub fn in_scan_order(&self) -> impl Iterator<Item = ScanItem<'_, R>> {
        self.order.iter().filter_map(move |step| match *step {
            ScanStep::Record(i) => self.records.get(i).map(|r| ScanItem::Record(i, r)),
            ScanStep::Issue(i) => self.issues.get(i).map(ScanItem::Issue),
        })
    }

    fn push_record(&mut self, located: Located<R>) {
        self.order.push(ScanStep::Record(self.records.len()));
        self.records.push(located);
    }

    fn push_issue(&mut self, issue: DirectoryIssue) {
        self.order.push(ScanStep::Issue(self.issues.len()));
        self.issues.push(issue);
    }
}

/// Walk a directory starting at `root`, keeping every slot `decode` accepts.
///
/// Fails only when the root (or index) page itself cannot be used. Bad data
/// pages and malformed entries are recorded in `issues`.
pub fn scan_directory<R, F>(
    image: &Image,
    root: Pointer,
    decode: F,
) -> Result<DirectoryListing<R>, NordError>
where
    F: Fn(&[u8; ENTRY_SIZE]) -> Result<Option<R>, DecodeError>,
{
    if root.subindexed {
        return Err(NordError::UnsupportedIndirection { pointer: root });
    }

    let mut listing = DirectoryListing::default();

    if !root.indexed {
        let page = image.get_page(root.page_number)?;
        scan_page(root.page_number, page, &decode, &mut listing);
        return Ok(listing);
    }

    let index = image.get_page(root.page_number)?;
    tracing::debug!("Directory index page {:#x}", root.page_number);

    for (index_slot, raw) in index
        .chunks_exact(4)
        .take(DIRECTORY_INDEX_SLOTS)
        .map(BigEndian::read_u32)
        .enumerate()
    {
        if raw == 0 {
            continue;
        }

        let pointer = decode_pointer(raw);
        if pointer.subindexed || pointer.indexed {
            tracing::warn!("Directory index slot {} holds {}", index_slot, pointer);
            listing.push_issue(DirectoryIssue::UnsupportedIndirection {
                index_slot,
                pointer,
            });
            continue;
        }

        match image.get_page(pointer.page_number) {
            Ok(page) => scan_page(pointer.page_number, page, &decode, &mut listing),
            Err(error) => {
                tracing::warn!("Directory index slot {}: {}", index_slot, error);
                listing.push_issue(DirectoryIssue::PageUnreadable { index_slot, error });
            }
        }
    }

    Ok(listing)
}

fn scan_page<R, F>(page_number: u32, page: &[u8], decode: &F, listing: &mut DirectoryListing<R>)
where
    F: Fn(&[u8; ENTRY_SIZE]) -> Result<Option<R>, DecodeError>,
{
    for (slot, chunk) in page.chunks_exact(ENTRY_SIZE).enumerate() {
        let Ok(record) = <&[u8; ENTRY_SIZE]>::try_from(chunk) else {
            continue;
        };

        match decode(record) {
            Ok(Some(decoded)) => listing.push_record(Located {
                page: page_number,
                slot,
                record: decoded,
            }),
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(
                    "Malformed entry at page {:#x} slot {}: {}",
                    page_number,
                    slot,
                    error
                );
                listing.push_issue(DirectoryIssue::Malformed {
                    page: page_number,
                    slot,
                    error,
                });
            }
        }
    }
}
