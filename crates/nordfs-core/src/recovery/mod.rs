/// Packaging of decoded images: archive blobs, run reports and format dispatch
pub mod archive;
pub mod engine;
pub mod report;

pub use archive::{Archive, ArchiveFile, META_FILE_NAME};
pub use engine::{recover_image, recover_image_file, DecodeConfig, RecoveryError, RecoveryOutcome};
pub use report::{sha256_hex, ObjectReport, ObjectStatus, RecoveryReport};
