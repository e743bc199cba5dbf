//! End-to-end decoding of synthetic NORD floppy images

use nordfs_core::fs::nord::codec::{encode_date, PackedDate};
use nordfs_core::recovery::sha256_hex;
use nordfs_core::{recover_image, DecodeConfig, DiskFormat, Image, ObjectStatus, PAGE_SIZE};

const ENTRY_SIZE: usize = 64;

/// Page-granular image writer
struct ImageBuilder {
    data: Vec<u8>,
}

impl ImageBuilder {
    fn new(pages: usize) -> Self {
        Self {
            data: vec![0u8; pages * PAGE_SIZE],
        }
    }

    fn master_block(&mut self, name: &[u8], objects: u32, users: u32) -> &mut Self {
        let mb = 0x7e0;
        self.data[mb..mb + name.len()].copy_from_slice(name);
        self.put_u32(mb + 16, objects);
        self.put_u32(mb + 20, users);
        self.put_u32(mb + 24, 0x0000_0010);
        self.put_u32(mb + 28, 40);
        self
    }

    fn index(&mut self, page: usize, slots: &[u32]) -> &mut Self {
        for (i, &raw) in slots.iter().enumerate() {
            self.put_u32(page * PAGE_SIZE + i * 4, raw);
        }
        self
    }

    fn user(&mut self, page: usize, slot: usize, name: &[u8]) -> &mut Self {
        let at = page * PAGE_SIZE + slot * ENTRY_SIZE;
        self.data[at..at + 2].copy_from_slice(&0x8001u16.to_be_bytes());
        self.data[at + 2..at + 2 + name.len()].copy_from_slice(name);
        self.put_u32(at + 28, 200);
        self.put_u32(at + 32, 12);
        self
    }

    #[allow(clippy::too_many_arguments)]
    fn object(
        &mut self,
        page: usize,
        slot: usize,
        name: &[u8],
        object_type: &[u8],
        pages_in_file: u32,
        max_byte_pointer: u32,
        file_pointer: u32,
    ) -> &mut Self {
        let at = page * PAGE_SIZE + slot * ENTRY_SIZE;
        self.data[at..at + 2].copy_from_slice(&0x8000u16.to_be_bytes());
        self.data[at + 2..at + 2 + name.len()].copy_from_slice(name);
        self.data[at + 18..at + 18 + object_type.len()].copy_from_slice(object_type);
        self.data[at + 26..at + 28].copy_from_slice(&0x7c1fu16.to_be_bytes());
        let created = PackedDate {
            year: 1984,
            month: 11,
            day: 5,
            hour: 10,
            minute: 15,
            second: 30,
        };
        self.put_u32(at + 40, encode_date(&created));
        self.put_u32(at + 52, pages_in_file);
        self.put_u32(at + 56, max_byte_pointer);
        self.put_u32(at + 60, file_pointer);
        self
    }

    /// Slot full of noise with the used bit clear
    fn stale(&mut self, page: usize, slot: usize) -> &mut Self {
        let at = page * PAGE_SIZE + slot * ENTRY_SIZE;
        self.data[at..at + ENTRY_SIZE].fill(0xE9);
        self.data[at] = 0x7F;
        self
    }

    fn fill(&mut self, page: usize, value: u8) -> &mut Self {
        self.data[page * PAGE_SIZE..(page + 1) * PAGE_SIZE].fill(value);
        self
    }

    fn put_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    fn build(&self) -> Image {
        Image::from_bytes(self.data.clone())
    }
}

/// Users via index page 1 -> page 2; objects via index page 3 -> page 4
fn floppy() -> ImageBuilder {
    let mut b = ImageBuilder::new(12);
    b.master_block(b"FLOPPY-USER'", 0x4000_0003, 0x4000_0001)
        .index(1, &[2])
        .user(2, 0, b"SYSTEM'")
        .stale(2, 1)
        .user(2, 2, b"GUEST'")
        .index(3, &[4, 0x8000_0009])
        // continuous, two pages, 10 bytes into the second
        .object(4, 0, b"HELLO'", b"SYMB'", 2, PAGE_SIZE as u32 + 9, 5)
        // indexed over pages 10, 8, 9
        .object(4, 1, b"DATA'", b"BIN'", 3, 3 * PAGE_SIZE as u32 - 1, 0x4000_0007)
        .index(7, &[10, 8, 9])
        // same name again
        .object(4, 2, b"HELLO'", b"SYMB'", 1, 3, 11)
        // second page lies past the end of the image
        .object(4, 3, b"SHORT'", b"TXT'", 2, 2 * PAGE_SIZE as u32 - 1, 11)
        .stale(4, 4)
        .object(4, 5, &[b'B', 0xC4, b'D', b'\''], b"X'", 1, 0, 5)
        .fill(5, b'A')
        .fill(6, b'B')
        .fill(8, 0x02)
        .fill(9, 0x03)
        .fill(10, 0x01)
        .fill(11, b'Z');
    b
}

#[test]
fn test_full_floppy_recovery() {
    let image = floppy().build();
    let outcome = recover_image(
        DiskFormat::Nord,
        "floppy.img",
        &image,
        &DecodeConfig::default(),
    )
    .unwrap();

    let paths: Vec<&str> = outcome
        .archive
        .files()
        .iter()
        .map(|f| f.path.as_str())
        .collect();
    assert_eq!(
        paths,
        vec![".meta", "HELLO.SYMB", "DATA.BIN", "HELLO.SYMB~2", "SHORT.TXT"]
    );

    let hello = &outcome.archive.get("HELLO.SYMB").unwrap().data;
    assert_eq!(hello.len(), PAGE_SIZE + 10);
    assert!(hello[..PAGE_SIZE].iter().all(|&b| b == b'A'));
    assert_eq!(&hello[PAGE_SIZE..], b"BBBBBBBBBB");

    let data = &outcome.archive.get("DATA.BIN").unwrap().data;
    assert_eq!(data.len(), 3 * PAGE_SIZE);
    assert_eq!(data[0], 0x01);
    assert_eq!(data[PAGE_SIZE], 0x02);
    assert_eq!(data[2 * PAGE_SIZE], 0x03);

    assert_eq!(outcome.archive.get("HELLO.SYMB~2").unwrap().data, b"ZZZZ");
    assert_eq!(outcome.archive.get("SHORT.TXT").unwrap().data.len(), PAGE_SIZE);

    let report = &outcome.report;
    assert_eq!(report.volume_name, "FLOPPY-USER");
    assert_eq!(report.users_found, 2);
    assert_eq!(report.objects_found, 4);
    assert_eq!(report.recovered_files, 3);
    assert_eq!(report.partial_files, 1);
    assert_eq!(report.failed_files, 0);
    assert_eq!(
        report.total_bytes_recovered,
        (PAGE_SIZE + 10 + 3 * PAGE_SIZE + 4 + PAGE_SIZE) as u64
    );
    assert_eq!(
        report.objects[3].status,
        ObjectStatus::Partial {
            bytes: PAGE_SIZE as u64,
            declared: 2 * PAGE_SIZE as u64,
            sha256: sha256_hex(&vec![b'Z'; PAGE_SIZE]),
        }
    );
    assert_eq!(report.objects[2].archive_path.as_deref(), Some("HELLO.SYMB~2"));

    // the non-ASCII name on page 4, then the subindexed index slot
    assert_eq!(report.issues.len(), 2);
    assert!(report.issues[0].starts_with("object directory: page 0x4 slot 5"));
    assert!(report.issues[1].starts_with("object directory: index slot 1"));
}

#[test]
fn test_manifest_layout() {
    let image = floppy().build();
    let outcome = recover_image(
        DiskFormat::Nord,
        "floppy.img",
        &image,
        &DecodeConfig::default(),
    )
    .unwrap();
    let manifest = &outcome.manifest;

    assert!(manifest.starts_with("floppy.img\nvolume FLOPPY-USER\n# users 2  # objects 4\n"));
    assert_eq!(outcome.archive.files()[0].data, manifest.as_bytes());

    let user = manifest.find("--- user entry: SYSTEM").unwrap();
    let guest = manifest.find("--- user entry: GUEST").unwrap();
    let first_object = manifest.find("--- object entry: HELLO.SYMB").unwrap();
    assert!(user < guest && guest < first_object);

    assert!(manifest.contains(&format!(" - {:<20}: 1984-11-05 10:15:30\n", "created")));

    // malformed slot 5 follows the last good entry, then the index slot problem
    let short = manifest.find("--- object entry: SHORT.TXT").unwrap();
    let malformed = manifest.find("!!! object directory: page 0x4 slot 5").unwrap();
    let index_issue = manifest.find("!!! object directory: index slot 1").unwrap();
    assert!(short < malformed && malformed < index_issue);
    assert!(manifest.contains("public=DCAWR friend=----- owner=DCAWR"));
    assert!(manifest.contains("PARTIAL data integrity: 2048 of 4096 declared bytes available"));
    assert!(manifest.contains("!!! object directory: index slot 1"));
    assert!(!manifest.contains("     0 0x00a"));
}

#[test]
fn test_verbose_manifest_lists_pages() {
    let image = floppy().build();
    let config = DecodeConfig::default().with_verbose(true);
    let outcome = recover_image(DiskFormat::Nord, "floppy.img", &image, &config).unwrap();

    assert!(outcome
        .manifest
        .contains("     0 0x00a\n     1 0x008\n     2 0x009\n"));
}

#[test]
fn test_runs_are_deterministic() {
    let image = floppy().build();
    let parallel = recover_image(DiskFormat::Nord, "a", &image, &DecodeConfig::default()).unwrap();
    let sequential = recover_image(
        DiskFormat::Nord,
        "a",
        &image,
        &DecodeConfig::default().with_parallel(false),
    )
    .unwrap();

    assert_eq!(parallel.manifest, sequential.manifest);
    assert_eq!(parallel.report, sequential.report);
    assert_eq!(parallel.archive.files(), sequential.archive.files());
}

#[test]
fn test_bad_user_directory_does_not_stop_objects() {
    let mut builder = floppy();
    builder.master_block(b"FLOPPY-USER'", 0x4000_0003, 0x8000_0001);
    let image = builder.build();

    let outcome = recover_image(DiskFormat::Nord, "x.img", &image, &DecodeConfig::default())
        .unwrap();

    assert_eq!(outcome.report.users_found, 0);
    assert_eq!(outcome.report.objects_found, 4);
    assert_eq!(outcome.archive.len(), 5);
    assert!(outcome
        .manifest
        .contains("!!! user directory: subindexed pointer 0x80000001"));
    assert!(outcome.report.issues[0].starts_with("user directory: subindexed pointer"));
}

#[test]
fn test_object_directory_past_end() {
    let mut builder = floppy();
    builder.master_block(b"FLOPPY-USER'", 0x0000_0063, 0x4000_0001);
    let image = builder.build();

    let outcome = recover_image(DiskFormat::Nord, "x.img", &image, &DecodeConfig::default())
        .unwrap();

    assert_eq!(outcome.report.users_found, 2);
    assert_eq!(outcome.report.objects_found, 0);
    assert_eq!(outcome.archive.len(), 1);
    assert!(outcome.manifest.contains("!!! object directory: page 99 out of range"));
}

#[test]
fn test_json_report() {
    let image = floppy().build();
    let outcome = recover_image(DiskFormat::Nord, "floppy.img", &image, &DecodeConfig::default())
        .unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&outcome.report.to_json().unwrap()).unwrap();
    assert_eq!(json["volume_name"], "FLOPPY-USER");
    assert_eq!(json["objects"][0]["status"], "recovered");
    assert_eq!(json["objects"][3]["status"], "partial");
    assert_eq!(json["objects"][3]["declared"], 2 * PAGE_SIZE as u64);
}
