/// Format dispatch and run configuration for image recovery
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::error::{FormatError, FormatSelectError};
use crate::fs::common::Image;
use crate::fs::nord::recovery::NordRecoveryEngine;
use crate::recovery::archive::Archive;
use crate::recovery::report::RecoveryReport;
use crate::DiskFormat;

/// Options for one decoding run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Add per-page detail to the manifest
    pub verbose: bool,
    /// Reconstruct files on the rayon pool
    pub parallel: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            parallel: true,
        }
    }
}

impl DecodeConfig {
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecoveryError {
    #[error(transparent)]
    Format(#[from] FormatSelectError),

    #[error("master block unreadable: {0}")]
    MasterBlock(#[from] FormatError),
}

/// Manifest, extracted blobs and summary of one image
#[derive(Debug, Clone)]
pub struct RecoveryOutcome {
    pub manifest: String,
    pub archive: Archive,
    pub report: RecoveryReport,
}

/// Decode an in-memory image in the given format
pub fn recover_image(
    format: DiskFormat,
    image_name: &str,
    image: &Image,
    config: &DecodeConfig,
) -> Result<RecoveryOutcome, RecoveryError> {
    match format {
        DiskFormat::Nord => {
            let engine = NordRecoveryEngine::new(image, image_name, *config);
            Ok(engine.recover()?)
        }
        other => Err(FormatSelectError::UnsupportedFormat(other).into()),
    }
}

/// Open `path` and decode it. The archive is named after the file.
pub fn recover_image_file(
    path: &Path,
    format: DiskFormat,
    config: &DecodeConfig,
) -> Result<RecoveryOutcome> {
    let image = Image::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?;

    let image_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    tracing::info!(
        "Decoding {} as {} ({} bytes, {} pages)",
        image_name,
        format,
        image.len(),
        image.page_count()
    );

    let outcome = recover_image(format, &image_name, &image, config)
        .with_context(|| format!("Failed to decode {}", image_name))?;
    Ok(outcome)
}
