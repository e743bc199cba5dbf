/// On-disk formats and shared image access
use anyhow::Result;
use std::path::Path;

pub mod common;
pub mod nord;

use crate::error::FormatSelectError;
use crate::DiskFormat;
use common::Image;
use nord::MasterBlock;

/// Describe the volume header of an image in the given format
pub fn get_filesystem_info(image_path: &Path, format: DiskFormat) -> Result<String> {
    let image = Image::open(image_path)?;

    match format {
        DiskFormat::Nord => Ok(MasterBlock::read(&image)?.describe()),
        other => Err(FormatSelectError::UnsupportedFormat(other).into()),
    }
}
