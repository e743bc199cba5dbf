/// Serializable summary of one recovery run
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Per-object outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ObjectStatus {
    Recovered {
        bytes: u64,
        sha256: String,
    },
    /// Fewer bytes than declared could be read
    Partial {
        bytes: u64,
        declared: u64,
        sha256: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReport {
    pub name: String,
    pub page: u32,
    pub slot: usize,
    /// Where the content was stored in the archive, if anywhere
    pub archive_path: Option<String>,
    #[serde(flatten)]
    pub status: ObjectStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub image_name: String,
    pub volume_name: String,
    pub users_found: usize,
    pub objects_found: usize,
    pub recovered_files: usize,
    pub partial_files: usize,
    pub failed_files: usize,
    pub total_bytes_recovered: u64,
    pub objects: Vec<ObjectReport>,
    /// Directory-level failures and contained slot problems
    pub issues: Vec<String>,
}

impl RecoveryReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
