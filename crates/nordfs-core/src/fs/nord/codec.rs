//! Pointer and packed date codecs
//!
//! A NORD pointer is a 32-bit double word:
//! - bit 31: subindexed (two levels of index pages)
//! - bit 30: indexed (one level of index page)
//! - bits 0-29: page number
//!
//! A packed date is also a double word:
//! - bits 26-31: year - 1950
//! - bits 22-25: month
//! - bits 17-21: day
//! - bits 12-16: hour
//! - bits 6-11: minute
//! - bits 0-5: second

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const SUBINDEXED_BIT: u32 = 1 << 31;
const INDEXED_BIT: u32 = 1 << 30;
const PAGE_NUMBER_MASK: u32 = 0x3fff_ffff;

const DATE_YEAR_BASE: u16 = 1950;

/// Decoded 32-bit page pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pointer {
    pub subindexed: bool,
    pub indexed: bool,
    pub page_number: u32,
}

impl Pointer {
    pub fn from_raw(raw: u32) -> Self {
        Self {
            subindexed: raw & SUBINDEXED_BIT != 0,
            indexed: raw & INDEXED_BIT != 0,
            page_number: raw & PAGE_NUMBER_MASK,
        }
    }

    /// Pack back into the on-disk double word.
    pub fn to_raw(self) -> u32 {
        let mut raw = self.page_number & PAGE_NUMBER_MASK;
        if self.subindexed {
            raw |= SUBINDEXED_BIT;
        }
        if self.indexed {
            raw |= INDEXED_BIT;
        }
        raw
    }

    /// Direct pointer to a single page
    pub fn direct(page_number: u32) -> Self {
        Self {
            subindexed: false,
            indexed: false,
            page_number,
        }
    }

    /// Pointer to an index page
    pub fn indexed(page_number: u32) -> Self {
        Self {
            subindexed: false,
            indexed: true,
            page_number,
        }
    }
}

impl std::fmt::Display for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match (self.subindexed, self.indexed) {
            (true, _) => "subindexed",
            (false, true) => "indexed",
            (false, false) => "direct",
        };
        write!(f, "{:#010x} ({} page {:#x})", self.to_raw(), kind, self.page_number)
    }
}

pub fn decode_pointer(raw: u32) -> Pointer {
    Pointer::from_raw(raw)
}

pub fn encode_pointer(pointer: Pointer) -> u32 {
    pointer.to_raw()
}

/// Packed timestamp fields. No calendar validation is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl PackedDate {
    /// Calendar-checked conversion. `None` when any field is out of range.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?.and_hms_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
        )
    }

    pub fn is_valid(&self) -> bool {
        self.to_datetime().is_some()
    }
}

impl std::fmt::Display for PackedDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

pub fn decode_date(raw: u32) -> PackedDate {
    PackedDate {
        year: ((raw >> 26) & 0x3f) as u16 + DATE_YEAR_BASE,
        month: ((raw >> 22) & 0xf) as u8,
        day: ((raw >> 17) & 0x1f) as u8,
        hour: ((raw >> 12) & 0x1f) as u8,
        minute: ((raw >> 6) & 0x3f) as u8,
        second: (raw & 0x3f) as u8,
    }
}

/// Inverse of `decode_date` for fields that fit their bit widths.
pub fn encode_date(date: &PackedDate) -> u32 {
    let year = (date.year.saturating_sub(DATE_YEAR_BASE) as u32) & 0x3f;
    (year << 26)
        | ((date.month as u32 & 0xf) << 22)
        | ((date.day as u32 & 0x1f) << 17)
        | ((date.hour as u32 & 0x1f) << 12)
        | ((date.minute as u32 & 0x3f) << 6)
        | (date.second as u32 & 0x3f)
}
