//! NORD directory entry decoding
//!
//! Both the object file and the user file are arrays of 32-word entries.
//! The first word of each entry carries an "entry used" bit; unused slots
//! are skipped before any other field is looked at, so stale bytes left in
//! free slots never produce decode errors.

use serde::{Deserialize, Serialize};

use super::codec::{decode_date, decode_pointer, PackedDate, Pointer};
use super::layout::{object, user, Field, ENTRY_SIZE};
use crate::error::DecodeError;

/// NORD names end at the first apostrophe
const NAME_TERMINATOR: char = '\'';

/// One five-bit access field: delete, create, append, write, read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessMask(pub u8);

impl AccessMask {
    pub const READ: u8 = 1 << 0;
    pub const WRITE: u8 = 1 << 1;
    pub const APPEND: u8 = 1 << 2;
    pub const CREATE: u8 = 1 << 3;
    pub const DELETE: u8 = 1 << 4;

    pub fn from_bits(bits: u16) -> Self {
        AccessMask((bits & 0x1f) as u8)
    }

    pub fn can_read(&self) -> bool {
        self.0 & Self::READ != 0
    }

    pub fn can_write(&self) -> bool {
        self.0 & Self::WRITE != 0
    }

    pub fn can_append(&self) -> bool {
        self.0 & Self::APPEND != 0
    }

    pub fn can_create(&self) -> bool {
        self.0 & Self::CREATE != 0
    }

    pub fn can_delete(&self) -> bool {
        self.0 & Self::DELETE != 0
    }
}

impl std::fmt::Display for AccessMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flags = [
            (Self::DELETE, 'D'),
            (Self::CREATE, 'C'),
            (Self::APPEND, 'A'),
            (Self::WRITE, 'W'),
            (Self::READ, 'R'),
        ];
        for (bit, c) in flags {
            write!(f, "{}", if self.0 & bit != 0 { c } else { '-' })?;
        }
        Ok(())
    }
}

/// Object file entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub used: bool,
    /// Currently opened for write
    pub write_open: bool,
    pub reserved: bool,
    /// Modified, or a magnetic tape file
    pub modified: bool,
    pub name: String,
    pub object_type: String,
    pub next_version: u16,
    pub prev_version: u16,
    /// Raw access word: public, friend and owner fields
    pub access_bits: u16,
    pub file_type: u16,
    pub device_number: u16,
    /// Index of the user reserving the file
    pub reserved_by: u16,
    pub object_index: u16,
    pub current_opens: u16,
    pub total_opens: u16,
    pub created: PackedDate,
    pub last_read: PackedDate,
    pub last_written: PackedDate,
    pub pages_in_file: u32,
    /// Offset of the last byte in the file (0-based, inclusive)
    pub max_byte_pointer: u32,
    pub file_pointer: Pointer,
}

impl ObjectEntry {
    /// Decode one 64-byte slot. `Ok(None)` for unused slots.
    pub fn decode(record: &[u8; ENTRY_SIZE]) -> Result<Option<Self>, DecodeError> {
        let info = object::INFO.read_word(record);
        if info & object::USED_BIT == 0 {
            return Ok(None);
        }

        Ok(Some(ObjectEntry {
            used: true,
            write_open: info & object::WRITE_OPEN_BIT != 0,
            reserved: info & object::RESERVED_BIT != 0,
            modified: info & object::MODIFIED_BIT != 0,
            name: decode_text(object::NAME, record)?,
            object_type: decode_text(object::TYPE, record)?,
            next_version: object::NEXT_VERSION.read_word(record),
            prev_version: object::PREV_VERSION.read_word(record),
            access_bits: object::ACCESS.read_word(record),
            file_type: object::FILE_TYPE.read_word(record),
            device_number: object::DEVICE_NUMBER.read_word(record),
            reserved_by: object::RESERVED_BY.read_word(record),
            object_index: object::OBJECT_INDEX.read_word(record),
            current_opens: object::CURRENT_OPENS.read_word(record),
            total_opens: object::TOTAL_OPENS.read_word(record),
            created: decode_date(object::CREATED.read_double_word(record)),
            last_read: decode_date(object::LAST_READ.read_double_word(record)),
            last_written: decode_date(object::LAST_WRITTEN.read_double_word(record)),
            pages_in_file: object::PAGES_IN_FILE.read_double_word(record),
            max_byte_pointer: object::MAX_BYTE_POINTER.read_double_word(record),
            file_pointer: decode_pointer(object::FILE_POINTER.read_double_word(record)),
        }))
    }

    pub fn owner_access(&self) -> AccessMask {
        AccessMask::from_bits(self.access_bits)
    }

    pub fn friend_access(&self) -> AccessMask {
        AccessMask::from_bits(self.access_bits >> 5)
    }

    pub fn public_access(&self) -> AccessMask {
        AccessMask::from_bits(self.access_bits >> 10)
    }

    /// Declared file length in bytes
    pub fn declared_len(&self) -> u64 {
        self.max_byte_pointer as u64 + 1
    }

    /// `NAME.TYPE`, or just `NAME` when the type is blank
    pub fn file_name(&self) -> String {
        if self.object_type.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.object_type)
        }
    }
}

/// User file entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub used: bool,
    pub friend: bool,
    pub enter_count: u8,
    pub user_name: String,
    /// Stored scrambled; kept opaque
    pub password: [u8; 2],
    pub created: PackedDate,
    pub last_entered: PackedDate,
    pub pages_reserved: u32,
    pub pages_used: u32,
    pub user_index: u16,
    pub mail_flag: u16,
    pub default_access: u16,
    pub friend_table: [u8; 16],
}

impl UserEntry {
    /// Decode one 64-byte slot. `Ok(None)` for unused slots.
    pub fn decode(record: &[u8; ENTRY_SIZE]) -> Result<Option<Self>, DecodeError> {
        let info = user::INFO.read_word(record);
        if info & user::USED_BIT == 0 {
            return Ok(None);
        }

        let mut password = [0u8; 2];
        password.copy_from_slice(user::PASSWORD.bytes(record));
        let mut friend_table = [0u8; 16];
        friend_table.copy_from_slice(user::FRIEND_TABLE.bytes(record));

        Ok(Some(UserEntry {
            used: true,
            friend: info & user::FRIEND_BIT != 0,
            enter_count: (info & user::ENTER_COUNT_MASK) as u8,
            user_name: decode_text(user::NAME, record)?,
            password,
            created: decode_date(user::CREATED.read_double_word(record)),
            last_entered: decode_date(user::LAST_ENTERED.read_double_word(record)),
            pages_reserved: user::PAGES_RESERVED.read_double_word(record),
            pages_used: user::PAGES_USED.read_double_word(record),
            user_index: user::USER_INDEX.read_word(record),
            mail_flag: user::MAIL_FLAG.read_word(record),
            default_access: user::DEFAULT_ACCESS.read_word(record),
            friend_table,
        }))
    }
}

fn decode_text(field: Field, record: &[u8; ENTRY_SIZE]) -> Result<String, DecodeError> {
    decode_name(field.bytes(record)).map_err(|bytes| DecodeError::InvalidText {
        field: field.name,
        bytes,
    })
}

/// Decode an ASCII name, cut at the terminator and trimmed.
/// On failure the raw bytes are handed back.
pub fn decode_name(raw: &[u8]) -> Result<String, Vec<u8>> {
    if !raw.is_ascii() {
        return Err(raw.to_vec());
    }

    let text: String = raw.iter().map(|&b| b as char).collect();
    let name = text.split(NAME_TERMINATOR).next().unwrap_or_default();
    Ok(name
        .trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0')
        .to_string())
}
