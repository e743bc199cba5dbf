//! Fixed record layouts for NORD directory entries
//!
//! The NORD File System documentation gives entry offsets as octal word
//! indices into a 32-word (64 byte) record. Every field here keeps the
//! documented word range; byte offsets are derived as `word * 2`.

use byteorder::{BigEndian, ByteOrder};
use std::ops::Range;

/// Directory entry size in bytes (32 words)
pub const ENTRY_SIZE: usize = 64;

/// Entries per directory page
pub const ENTRIES_PER_PAGE: usize = crate::fs::common::PAGE_SIZE / ENTRY_SIZE;

/// A record field spanning an inclusive range of 16-bit words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub first_word: usize,
    pub last_word: usize,
}

impl Field {
    pub const fn words(name: &'static str, first_word: usize, last_word: usize) -> Self {
        Self {
            name,
            first_word,
            last_word,
        }
    }

    pub const fn word(name: &'static str, word: usize) -> Self {
        Self::words(name, word, word)
    }

    pub const fn byte_range(&self) -> Range<usize> {
        self.first_word * 2..(self.last_word + 1) * 2
    }

    pub const fn len(&self) -> usize {
        (self.last_word + 1 - self.first_word) * 2
    }

    pub fn bytes<'a>(&self, record: &'a [u8; ENTRY_SIZE]) -> &'a [u8] {
        &record[self.byte_range()]
    }

    /// Big-endian 16-bit value at the field start
    pub fn read_word(&self, record: &[u8; ENTRY_SIZE]) -> u16 {
        BigEndian::read_u16(self.bytes(record))
    }

    /// Big-endian 32-bit value at the field start
    pub fn read_double_word(&self, record: &[u8; ENTRY_SIZE]) -> u32 {
        BigEndian::read_u32(self.bytes(record))
    }
}

/// Object file entry (one per stored file)
pub mod object {
    use super::Field;

    pub const INFO: Field = Field::word("info", 0o0);
    pub const NAME: Field = Field::words("name", 0o1, 0o10);
    pub const TYPE: Field = Field::words("type", 0o11, 0o12);
    pub const NEXT_VERSION: Field = Field::word("next_version", 0o13);
    pub const PREV_VERSION: Field = Field::word("prev_version", 0o14);
    pub const ACCESS: Field = Field::word("access", 0o15);
    pub const FILE_TYPE: Field = Field::word("file_type", 0o16);
    pub const DEVICE_NUMBER: Field = Field::word("device_number", 0o17);
    pub const RESERVED_BY: Field = Field::word("reserved_by", 0o20);
    pub const OBJECT_INDEX: Field = Field::word("object_index", 0o21);
    pub const CURRENT_OPENS: Field = Field::word("current_opens", 0o22);
    pub const TOTAL_OPENS: Field = Field::word("total_opens", 0o23);
    pub const CREATED: Field = Field::words("created", 0o24, 0o25);
    pub const LAST_READ: Field = Field::words("last_read", 0o26, 0o27);
    pub const LAST_WRITTEN: Field = Field::words("last_written", 0o30, 0o31);
    pub const PAGES_IN_FILE: Field = Field::words("pages_in_file", 0o32, 0o33);
    pub const MAX_BYTE_POINTER: Field = Field::words("max_byte_pointer", 0o34, 0o35);
    pub const FILE_POINTER: Field = Field::words("file_pointer", 0o36, 0o37);

    pub const FIELDS: &[Field] = &[
        INFO,
        NAME,
        TYPE,
        NEXT_VERSION,
        PREV_VERSION,
        ACCESS,
        FILE_TYPE,
        DEVICE_NUMBER,
        RESERVED_BY,
        OBJECT_INDEX,
        CURRENT_OPENS,
        TOTAL_OPENS,
        CREATED,
        LAST_READ,
        LAST_WRITTEN,
        PAGES_IN_FILE,
        MAX_BYTE_POINTER,
        FILE_POINTER,
    ];

    // Bits of the info word
    pub const USED_BIT: u16 = 1 << 15;
    pub const WRITE_OPEN_BIT: u16 = 1 << 14;
    pub const RESERVED_BIT: u16 = 1 << 13;
    pub const MODIFIED_BIT: u16 = 1 << 12;
}

/// User file entry (one per registered user)
pub mod user {
    use super::Field;

    pub const INFO: Field = Field::word("info", 0o0);
    pub const NAME: Field = Field::words("user_name", 0o1, 0o10);
    pub const PASSWORD: Field = Field::word("password", 0o11);
    pub const CREATED: Field = Field::words("created", 0o12, 0o13);
    pub const LAST_ENTERED: Field = Field::words("last_entered", 0o14, 0o15);
    pub const PAGES_RESERVED: Field = Field::words("pages_reserved", 0o16, 0o17);
    pub const PAGES_USED: Field = Field::words("pages_used", 0o20, 0o21);
    pub const USER_INDEX: Field = Field::word("user_index", 0o22);
    pub const MAIL_FLAG: Field = Field::word("mail_flag", 0o23);
    pub const DEFAULT_ACCESS: Field = Field::word("default_access", 0o24);
    pub const FRIEND_TABLE: Field = Field::words("friend_table", 0o30, 0o37);

    pub const FIELDS: &[Field] = &[
        INFO,
        NAME,
        PASSWORD,
        CREATED,
        LAST_ENTERED,
        PAGES_RESERVED,
        PAGES_USED,
        USER_INDEX,
        MAIL_FLAG,
        DEFAULT_ACCESS,
        FRIEND_TABLE,
    ];

    pub const USED_BIT: u16 = 1 << 15;
    pub const FRIEND_BIT: u16 = 1 << 8;
    pub const ENTER_COUNT_MASK: u16 = 0xf;
}
