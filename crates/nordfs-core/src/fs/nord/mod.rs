/// NORD File System support (Norsk Data floppy media)
use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::fs::common::Image;

// Sub-modules
pub mod codec;
pub mod directory;
pub mod entry;
pub mod file;
pub mod layout;
pub mod recovery;

use codec::{decode_pointer, Pointer};

/// The master block entry sits in the last 32 bytes of page 0;
/// the rest of the page may hold bootstrap code.
pub const MASTER_BLOCK_OFFSET: usize = 0x7e0;
pub const MASTER_BLOCK_END: usize = 0x800;

/// Directory entry describing the medium
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterBlock {
    pub volume_name: String,
    pub object_directory: Pointer,
    pub user_directory: Pointer,
    /// Bit file recording page allocation
    pub allocation_file: Pointer,
    pub reserved_pages: u32,
}

impl MasterBlock {
    /// Parse the master block from the start of an image
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < MASTER_BLOCK_END {
            return Err(FormatError::TooShort {
                len: data.len(),
                needed: MASTER_BLOCK_END,
            });
        }

        let block = &data[MASTER_BLOCK_OFFSET..MASTER_BLOCK_END];

        Ok(MasterBlock {
            volume_name: decode_volume_name(&block[0..16]),
            object_directory: decode_pointer(BigEndian::read_u32(&block[16..20])),
            user_directory: decode_pointer(BigEndian::read_u32(&block[20..24])),
            allocation_file: decode_pointer(BigEndian::read_u32(&block[24..28])),
            reserved_pages: BigEndian::read_u32(&block[28..32]),
        })
    }

    pub fn read(image: &Image) -> Result<Self, FormatError> {
        Self::parse(image.as_bytes())
    }

    /// Human-readable summary of the master block
    pub fn describe(&self) -> String {
        format!(
            "NORD File System\n\
             - Volume Name: {}\n\
             - Object File: {}\n\
             - User File: {}\n\
             - Bit File: {}\n\
             - Reserved Pages: {} ({:#x})",
            self.volume_name,
            self.object_directory,
            self.user_directory,
            self.allocation_file,
            self.reserved_pages,
            self.reserved_pages,
        )
    }
}

/// Volume names are informational only: bad bytes are replaced, not fatal.
fn decode_volume_name(raw: &[u8]) -> String {
    match entry::decode_name(raw) {
        Ok(name) => name,
        Err(bytes) => {
            tracing::warn!("Volume name is not ASCII: {:02x?}", bytes);
            let lossy: String = bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { '?' })
                .collect();
            lossy
                .trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0')
                .to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::common::PAGE_SIZE;

    fn page_zero(name: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; PAGE_SIZE];
        let block = &mut data[MASTER_BLOCK_OFFSET..MASTER_BLOCK_END];
        block[..name.len()].copy_from_slice(name);
        block[16..20].copy_from_slice(&0x4000_0004u32.to_be_bytes());
        block[20..24].copy_from_slice(&0x4000_0002u32.to_be_bytes());
        block[24..28].copy_from_slice(&0x0000_0006u32.to_be_bytes());
        block[28..32].copy_from_slice(&0x0000_0010u32.to_be_bytes());
        data
    }

    #[test]
    fn test_parse_master_block() {
        let master = MasterBlock::parse(&page_zero(b"FLOPPY-USER'")).unwrap();
        assert_eq!(master.volume_name, "FLOPPY-USER");
        assert_eq!(master.object_directory, Pointer::indexed(4));
        assert_eq!(master.user_directory, Pointer::indexed(2));
        assert_eq!(master.allocation_file, Pointer::direct(6));
        assert_eq!(master.reserved_pages, 16);
    }

    #[test]
    fn test_too_short() {
        let err = MasterBlock::parse(&[0u8; 0x7ff]).unwrap_err();
        assert_eq!(
            err,
            FormatError::TooShort {
                len: 0x7ff,
                needed: 0x800
            }
        );
    }

    #[test]
    fn test_non_ascii_volume_name_is_replaced() {
        let master = MasterBlock::parse(&page_zero(&[b'N', b'D', 0xE5, b'1'])).unwrap();
        assert_eq!(master.volume_name, "ND?1");
    }

    #[test]
    fn test_describe() {
        let master = MasterBlock::parse(&page_zero(b"VOL'")).unwrap();
        let info = master.describe();
        assert!(info.starts_with("NORD File System\n"));
        assert!(info.contains("- Volume Name: VOL"));
        assert!(info.contains("- Object File: 0x40000004 (indexed page 0x4)"));
        assert!(info.contains("- Reserved Pages: 16 (0x10)"));
    }
}
