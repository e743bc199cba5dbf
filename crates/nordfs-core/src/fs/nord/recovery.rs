//! NORD image recovery
//!
//! Reads the master block, walks the user and object files, and rebuilds
//! every used object. Directory failures are isolated per directory and file
//! failures per object; only an unreadable master block stops the run.

use rayon::prelude::*;
use std::fmt::Write as _;

use super::codec::PackedDate;
use super::directory::{scan_directory, DirectoryListing, Located, ScanItem};
use super::entry::{ObjectEntry, UserEntry};
use super::file::{reconstruct_file, Allocation, ReconstructedFile};
use super::MasterBlock;
use crate::error::{FormatError, NordError};
use crate::fs::common::Image;
use crate::recovery::archive::{Archive, META_FILE_NAME};
use crate::recovery::report::{sha256_hex, ObjectReport, ObjectStatus, RecoveryReport};
use crate::recovery::{DecodeConfig, RecoveryOutcome};

/// One used object and what became of its content
#[derive(Debug, Clone)]
pub struct ObjectRecovery {
    pub entry: Located<ObjectEntry>,
    pub result: Result<ReconstructedFile, NordError>,
    /// Hex SHA-256 of the recovered bytes
    pub sha256: Option<String>,
}

/// Everything decoded from one image
#[derive(Debug, Clone)]
pub struct NordScan {
    pub image_name: String,
    pub master: MasterBlock,
    pub users: Result<DirectoryListing<UserEntry>, NordError>,
    pub objects: Result<DirectoryListing<ObjectEntry>, NordError>,
    pub files: Vec<ObjectRecovery>,
}

/// NORD recovery engine
pub struct NordRecoveryEngine<'a> {
    image: &'a Image,
    image_name: String,
    config: DecodeConfig,
}

impl<'a> NordRecoveryEngine<'a> {
    pub fn new(image: &'a Image, image_name: impl Into<String>, config: DecodeConfig) -> Self {
        Self {
            image,
            image_name: image_name.into(),
            config,
        }
    }

    /// Decode directories and reconstruct every used object
    pub fn scan(&self) -> Result<NordScan, FormatError> {
        let master = MasterBlock::read(self.image)?;

        tracing::info!("NORD scan of {}: volume '{}'", self.image_name, master.volume_name);
        tracing::debug!(
            "Object file {}, user file {}",
            master.object_directory,
            master.user_directory
        );

        let users = scan_directory(self.image, master.user_directory, UserEntry::decode);
        match &users {
            Ok(listing) => tracing::info!("Found {} users", listing.len()),
            Err(e) => tracing::warn!("User directory skipped: {}", e),
        }

        let objects = scan_directory(self.image, master.object_directory, ObjectEntry::decode);
        match &objects {
            Ok(listing) => tracing::info!("Found {} objects", listing.len()),
            Err(e) => tracing::warn!("Object directory skipped: {}", e),
        }

        let files = match &objects {
            Ok(listing) => self.reconstruct_all(&listing.records),
            Err(_) => Vec::new(),
        };

        Ok(NordScan {
            image_name: self.image_name.clone(),
            master,
            users,
            objects,
            files,
        })
    }

    /// Scan and package the result for export
    pub fn recover(&self) -> Result<RecoveryOutcome, FormatError> {
        Ok(self.scan()?.into_outcome(&self.config))
    }

    fn reconstruct_all(&self, entries: &[Located<ObjectEntry>]) -> Vec<ObjectRecovery> {
        let rebuild = |located: &Located<ObjectEntry>| {
            let result = reconstruct_file(self.image, &located.record);
            if let Err(e) = &result {
                tracing::warn!("{}: {}", located.record.file_name(), e);
            }
            let sha256 = result.as_ref().ok().map(|file| sha256_hex(&file.data));
            ObjectRecovery {
                entry: located.clone(),
                result,
                sha256,
            }
        };

        // Both paths keep directory order
        if self.config.parallel {
            entries.par_iter().map(rebuild).collect()
        } else {
            entries.iter().map(rebuild).collect()
        }
    }
}

impl NordScan {
    pub fn user_count(&self) -> usize {
        self.users.as_ref().map(DirectoryListing::len).unwrap_or(0)
    }

    pub fn object_count(&self) -> usize {
        self.objects.as_ref().map(DirectoryListing::len).unwrap_or(0)
    }

    /// Build manifest, archive and report
    pub fn into_outcome(self, config: &DecodeConfig) -> RecoveryOutcome {
        let manifest = self.manifest(config);

        let mut archive = Archive::new(self.image_name.clone());
        archive.add_file(META_FILE_NAME, manifest.clone().into_bytes());

        let mut objects = Vec::with_capacity(self.files.len());
        let mut total_bytes_recovered = 0u64;
        let (mut recovered, mut partial, mut failed) = (0, 0, 0);

        for recovery in &self.files {
            let entry = &recovery.entry;
            let name = entry.record.file_name();

            let (archive_path, status) = match &recovery.result {
                Ok(file) => {
                    let sha256 = recovery.sha256.clone().unwrap_or_else(|| sha256_hex(&file.data));
                    let bytes = file.data.len() as u64;
                    total_bytes_recovered += bytes;
                    let status = match file.warning {
                        Some(warning) => {
                            partial += 1;
                            ObjectStatus::Partial {
                                bytes,
                                declared: warning.declared,
                                sha256,
                            }
                        }
                        None => {
                            recovered += 1;
                            ObjectStatus::Recovered { bytes, sha256 }
                        }
                    };
                    (Some(archive.add_file(&name, file.data.clone())), status)
                }
                Err(e) => {
                    failed += 1;
                    (None, ObjectStatus::Failed { error: e.to_string() })
                }
            };

            objects.push(ObjectReport {
                name,
                page: entry.page,
                slot: entry.slot,
                archive_path,
                status,
            });
        }

        let report = RecoveryReport {
            image_name: self.image_name.clone(),
            volume_name: self.master.volume_name.clone(),
            users_found: self.user_count(),
            objects_found: self.object_count(),
            recovered_files: recovered,
            partial_files: partial,
            failed_files: failed,
            total_bytes_recovered,
            objects,
            issues: self.issues(),
        };

        tracing::info!(
            "Recovery complete: {}/{} objects recovered, {} partial, {} failed",
            recovered,
            self.files.len(),
            partial,
            failed
        );

        RecoveryOutcome {
            manifest,
            archive,
            report,
        }
    }

    fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        match &self.users {
            Ok(listing) => issues.extend(
                listing
                    .issues
                    .iter()
                    .map(|i| format!("user directory: {}", i)),
            ),
            Err(e) => issues.push(format!("user directory: {}", e)),
        }
        match &self.objects {
            Ok(listing) => issues.extend(
                listing
                    .issues
                    .iter()
                    .map(|i| format!("object directory: {}", i)),
            ),
            Err(e) => issues.push(format!("object directory: {}", e)),
        }
        issues
    }

    /// Stable text listing of the image contents
    pub fn manifest(&self, config: &DecodeConfig) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.image_name);
        let _ = writeln!(out, "volume {}", self.master.volume_name);
        let _ = writeln!(
            out,
            "# users {}  # objects {}",
            self.user_count(),
            self.object_count()
        );

        // Contained issues appear where the walk met them
        match &self.users {
            Ok(listing) => {
                for item in listing.in_scan_order() {
                    match item {
                        ScanItem::Record(_, user) => write_user(&mut out, user),
                        ScanItem::Issue(issue) => {
                            let _ = writeln!(out, "!!! user directory: {}", issue);
                        }
                    }
                }
            }
            Err(e) => {
                let _ = writeln!(out, "!!! user directory: {}", e);
            }
        }

        match &self.objects {
            Ok(listing) => {
                for item in listing.in_scan_order() {
                    match item {
                        ScanItem::Record(i, _) => {
                            if let Some(recovery) = self.files.get(i) {
                                write_object(&mut out, recovery, config.verbose);
                            }
                        }
                        ScanItem::Issue(issue) => {
                            let _ = writeln!(out, "!!! object directory: {}", issue);
                        }
                    }
                }
            }
            Err(e) => {
                let _ = writeln!(out, "!!! object directory: {}", e);
            }
        }

        out
    }
}

fn date_line(out: &mut String, label: &str, date: &PackedDate) {
    match date.to_datetime() {
        Some(_) => {
            let _ = writeln!(out, " - {:<20}: {}", label, date);
        }
        None => {
            let _ = writeln!(out, " - {:<20}: {} (invalid)", label, date);
        }
    }
}

fn write_user(out: &mut String, located: &Located<UserEntry>) {
    let user = &located.record;
    let _ = writeln!(
        out,
        "--- user entry: {}  (page {:#x} slot {})",
        user.user_name, located.page, located.slot
    );
    let _ = writeln!(
        out,
        " - {:<20}: used={} friend={} enter_count={}",
        "flags", user.used, user.friend, user.enter_count
    );
    let _ = writeln!(
        out,
        " - {:<20}: {:02x} {:02x}",
        "password", user.password[0], user.password[1]
    );
    date_line(out, "date created", &user.created);
    date_line(out, "date last entered", &user.last_entered);
    let _ = writeln!(out, " - {:<20}: {}", "pages reserved", user.pages_reserved);
    let _ = writeln!(out, " - {:<20}: {}", "pages used", user.pages_used);
    let _ = writeln!(out, " - {:<20}: {}", "user index", user.user_index);
    let _ = writeln!(out, " - {:<20}: {}", "mail flag", user.mail_flag);
    let _ = writeln!(out, " - {:<20}: {:#x}", "default file access", user.default_access);
}

fn write_object(out: &mut String, recovery: &ObjectRecovery, verbose: bool) {
    let located = &recovery.entry;
    let obj = &located.record;
    let _ = writeln!(
        out,
        "--- object entry: {}  (page {:#x} slot {})",
        obj.file_name(),
        located.page,
        located.slot
    );
    let _ = writeln!(
        out,
        " - {:<20}: used={} write_open={} reserved={} modified={}",
        "flags", obj.used, obj.write_open, obj.reserved, obj.modified
    );
    let _ = writeln!(
        out,
        " - {:<20}: next={:#x} prev={:#x}",
        "versions", obj.next_version, obj.prev_version
    );
    let _ = writeln!(
        out,
        " - {:<20}: public={} friend={} owner={} ({:#x})",
        "access",
        obj.public_access(),
        obj.friend_access(),
        obj.owner_access(),
        obj.access_bits
    );
    let _ = writeln!(
        out,
        " - {:<20}: type={:#x} device={:#x} index={:#x} reserved_by={:#x}",
        "file", obj.file_type, obj.device_number, obj.object_index, obj.reserved_by
    );
    let _ = writeln!(
        out,
        " - {:<20}: current={} total={}",
        "opens", obj.current_opens, obj.total_opens
    );
    date_line(out, "created", &obj.created);
    date_line(out, "last read", &obj.last_read);
    date_line(out, "last written", &obj.last_written);
    let _ = writeln!(out, " - {:<20}: {}", "pages in file", obj.pages_in_file);
    let _ = writeln!(
        out,
        " - {:<20}: {:#x} ({} bytes)",
        "max byte pointer",
        obj.max_byte_pointer,
        obj.declared_len()
    );
    let _ = writeln!(out, " - {:<20}: {}", "file pointer", obj.file_pointer);

    match &recovery.result {
        Ok(file) => {
            match file.warning {
                Some(warning) => {
                    let _ = writeln!(out, " - {:<20}: PARTIAL {}", "content", warning);
                }
                None => {
                    let _ = writeln!(out, " - {:<20}: {} bytes", "content", file.data.len());
                }
            }
            if let Some(sha256) = &recovery.sha256 {
                let _ = writeln!(out, " - {:<20}: {}", "sha256", sha256);
            }
            if verbose && file.allocation == Allocation::Indexed {
                for (i, page) in file.pages.iter().enumerate() {
                    let _ = writeln!(out, "   {:3} {:#05x}", i, page);
                }
            }
        }
        Err(e) => {
            let _ = writeln!(out, "!!! {:<18}: {}", "content", e);
        }
    }
}
