//! Error taxonomy for NORD image decoding
//!
//! Structural problems (`FormatError`) are fatal to the structure being read,
//! unsupported pointers (`NordError::UnsupportedIndirection`) and bad text
//! (`DecodeError`) are contained to one directory, slot or file. A short file
//! is not an error at all: it is reported through `DataIntegrityWarning`
//! next to the bytes that could be recovered.

use thiserror::Error;

use crate::fs::nord::codec::Pointer;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("image too short: {len} bytes, need at least {needed}")]
    TooShort { len: usize, needed: usize },

    #[error("page {page} out of range (image is {image_len} bytes)")]
    OutOfRange { page: u32, image_len: usize },

    #[error("file index overflow: {pages} pages declared, an index page holds at most {max}")]
    IndexOverflow { pages: u32, max: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid text in {field}: {bytes:02x?}")]
    InvalidText { field: &'static str, bytes: Vec<u8> },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NordError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("subindexed pointer {pointer} is not supported")]
    UnsupportedIndirection { pointer: Pointer },
}

/// Reconstructed content is shorter than the entry declares.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("data integrity: {available} of {declared} declared bytes available")]
pub struct DataIntegrityWarning {
    pub declared: u64,
    pub available: u64,
}

/// Selecting a legacy disk format by name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatSelectError {
    #[error("unknown disk format: {0}")]
    UnknownFormat(String),

    #[error("{0} images are not handled by this decoder")]
    UnsupportedFormat(crate::DiskFormat),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_values() {
        let err = FormatError::OutOfRange {
            page: 77,
            image_len: 4096,
        };
        assert_eq!(err.to_string(), "page 77 out of range (image is 4096 bytes)");

        let err = DecodeError::InvalidText {
            field: "name",
            bytes: vec![0xc3, 0x41],
        };
        assert_eq!(err.to_string(), "invalid text in name: [c3, 41]");

        let warning = DataIntegrityWarning {
            declared: 4096,
            available: 2048,
        };
        assert_eq!(
            warning.to_string(),
            "data integrity: 2048 of 4096 declared bytes available"
        );
    }

    #[test]
    fn test_format_error_converts_into_nord_error() {
        let err: NordError = FormatError::TooShort {
            len: 10,
            needed: 0x800,
        }
        .into();
        assert!(matches!(err, NordError::Format(FormatError::TooShort { .. })));
    }
}
