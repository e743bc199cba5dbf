//! Recovery of files from NORD File System disk images
//!
//! The decoder reads a raw image of a Norsk Data floppy, walks the user and
//! object directories and rebuilds the content of every used file. Output is
//! a text manifest plus one named blob per file, with a serializable report
//! alongside.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub mod error;
pub mod fs;
pub mod recovery;

pub use error::{DataIntegrityWarning, DecodeError, FormatError, FormatSelectError, NordError};
pub use fs::common::{Image, PAGE_SIZE};
pub use fs::get_filesystem_info;
pub use fs::nord::MasterBlock;
pub use recovery::{
    recover_image, recover_image_file, Archive, ArchiveFile, DecodeConfig, ObjectReport,
    ObjectStatus, RecoveryError, RecoveryOutcome, RecoveryReport,
};

/// Legacy disk formats a caller may ask for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiskFormat {
    Nord,
    Mycron,
    Tram,
}

impl DiskFormat {
    pub const ALL: [DiskFormat; 3] = [DiskFormat::Nord, DiskFormat::Mycron, DiskFormat::Tram];

    pub fn is_supported(&self) -> bool {
        matches!(self, DiskFormat::Nord)
    }
}

impl std::fmt::Display for DiskFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiskFormat::Nord => write!(f, "NORD"),
            DiskFormat::Mycron => write!(f, "Mycron"),
            DiskFormat::Tram => write!(f, "Tram"),
        }
    }
}

impl FromStr for DiskFormat {
    type Err = FormatSelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nord" | "nd" => Ok(DiskFormat::Nord),
            "mycron" => Ok(DiskFormat::Mycron),
            "tram" => Ok(DiskFormat::Tram),
            _ => Err(FormatSelectError::UnknownFormat(s.to_string())),
        }
    }
}
