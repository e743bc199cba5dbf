//! Named byte blobs handed to an archive writer
//!
//! Paths are unique: a name that was already added gets a `~N` suffix
//! instead of replacing the earlier blob.

use std::collections::HashSet;

/// Metadata blob holding the run manifest
pub const META_FILE_NAME: &str = ".meta";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub path: String,
    pub data: Vec<u8>,
}

/// Files extracted from one disk image, in insertion order
#[derive(Debug, Clone, Default)]
pub struct Archive {
    pub name: String,
    files: Vec<ArchiveFile>,
    paths: HashSet<String>,
}

impl Archive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
            paths: HashSet::new(),
        }
    }

    /// Add a blob and return the path it was stored under
    pub fn add_file(&mut self, path: &str, data: Vec<u8>) -> String {
        let mut unique = path.to_string();
        let mut n = 2;
        while self.paths.contains(&unique) {
            unique = format!("{}~{}", path, n);
            n += 1;
        }

        if unique != path {
            tracing::warn!("Path '{}' added previously, storing as '{}'", path, unique);
        }

        self.paths.insert(unique.clone());
        self.files.push(ArchiveFile {
            path: unique.clone(),
            data,
        });
        unique
    }

    pub fn files(&self) -> &[ArchiveFile] {
        &self.files
    }

    pub fn get(&self, path: &str) -> Option<&ArchiveFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.data.len() as u64).sum()
    }

    pub fn into_files(self) -> Vec<ArchiveFile> {
        self.files
    }
}
