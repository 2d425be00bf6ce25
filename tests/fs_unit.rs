use fat12fs::boot_sector::BootSector;
use fat12fs::dir_entry::{
    decode_datetime, encode_datetime, normalize_name, Attributes, DirEntry, DirSlot,
};
use fat12fs::directory::{DirLocation, Directory};
use fat12fs::fat_constants::*;
use fat12fs::fat_table::FatTable;
use fat12fs::{ErrorKind, FloppyImage};

use chrono::NaiveDate;

fn layout() -> BootSector {
    BootSector::new_1440(0, [b' '; 11])
}

#[test]
fn parse_1440_boot_sector() {
    let mut buf = [0u8; 512];
    // minimal BPB for 1.44MB
    buf[11..13].copy_from_slice(&512u16.to_le_bytes());
    buf[13] = 1; // sectors per cluster
    buf[14..16].copy_from_slice(&1u16.to_le_bytes()); // reserved
    buf[16] = 2; // num_fats
    buf[17..19].copy_from_slice(&MAX_ROOT_DIR_ENTRIES.to_le_bytes());
    buf[19..21].copy_from_slice(&2880u16.to_le_bytes());
    buf[21] = 0xF0;
    buf[22..24].copy_from_slice(&9u16.to_le_bytes());
    buf[BOOT_SIG_OFFSET] = BOOT_SIG_LEAD;
    buf[BOOT_SIG_OFFSET + 1] = BOOT_SIG_TRAIL;

    let bs = BootSector::parse(&buf).expect("parse failed");
    assert_eq!(bs.bytes_per_sector, 512);
    assert_eq!(bs.sectors_per_cluster, 1);
    assert_eq!(bs.reserved_sectors, 1);
    assert_eq!(bs.num_fats, 2);
    assert_eq!(bs.max_root_dir_entries, MAX_ROOT_DIR_ENTRIES);
    assert_eq!(bs.total_sectors, 2880);
    assert_eq!(bs.sectors_per_fat, 9);
    assert_eq!(bs.fat_start_lba, 1);
    assert_eq!(bs.fat2_start_lba, 10);
    assert_eq!(bs.root_dir_start_lba, 19);
    assert_eq!(bs.data_start_lba, 33);
}

#[test]
fn serialize_and_parse_roundtrip() {
    let bs = BootSector::new_1440(0xCAFE_F00D, *b"UNITTEST   ");
    let mut buf = [0u8; 512];
    BootSector::write_bootstrap(&mut buf);
    bs.serialize(&mut buf).expect("serialize failed");
    let bs2 = BootSector::parse(&buf).expect("parse failed");
    assert_eq!(bs2, bs);
}

#[test]
fn non_floppy_geometry_is_rejected() {
    let bs = layout();
    let mut buf = [0u8; 512];
    bs.serialize(&mut buf).unwrap();
    for (offset, bad) in [(16usize, 1u8), (13, 4), (21, 0xF8)] {
        let mut broken = buf;
        broken[offset] = bad;
        let err = BootSector::parse(&broken).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedGeometry, "offset {}", offset);
    }
}

#[test]
fn fat12_read_write_simple() {
    let mut img = FloppyImage::new_blank();
    let bs = layout();
    let mut fat = FatTable::new(&mut img, &bs);
    // write cluster 2->3, 3->EOF
    fat.set(2, 3).unwrap();
    fat.set(3, 0xFFF).unwrap();
    assert_eq!(fat.get(2).unwrap(), 3);
    assert_eq!(fat.get(3).unwrap(), 0xFFF);
    assert_eq!(fat.walk(2).unwrap(), vec![2, 3]);
}

#[test]
fn fat_entries_straddling_sector_boundaries_survive() {
    // byte offset of entry n is n*3/2; entries around 341 straddle the
    // first FAT sector boundary
    let mut img = FloppyImage::new_blank();
    let bs = layout();
    let mut fat = FatTable::new(&mut img, &bs);
    for n in 330..350u16 {
        fat.set(n, 0x800 | n).unwrap();
    }
    for n in 330..350u16 {
        assert_eq!(fat.get(n).unwrap(), 0x800 | n, "entry {}", n);
    }
}

#[test]
fn fat_index_bounds_are_enforced() {
    let mut img = FloppyImage::new_blank();
    let bs = layout();
    let mut fat = FatTable::new(&mut img, &bs);
    assert_eq!(fat.get(2879).unwrap(), 0);
    assert_eq!(fat.get(2880).unwrap_err().kind(), ErrorKind::BadCluster);
    assert_eq!(fat.set(2880, 1).unwrap_err().kind(), ErrorKind::BadCluster);
}

#[test]
fn dir_create_serialize() {
    let mut img = FloppyImage::new_blank();
    let bs = layout();
    {
        let mut fat = FatTable::new(&mut img, &bs);
        let mut dir = Directory::open(&mut fat, DirLocation::Root).unwrap();
        dir.insert(&DirEntry::new(*b"FOO     TXT", Attributes::FILE, 2, 12))
            .unwrap();
        dir.insert(&DirEntry::new(*b"BAR     TXT", Attributes::FILE, 3, 7))
            .unwrap();
        let list = dir.entries().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].1.start_cluster, 2);
        assert_eq!(list[0].1.file_size, 12);
        assert_eq!(list[1].1.start_cluster, 3);
        assert_eq!(list[1].1.file_size, 7);
    }
    // verify the raw slot bytes landed in the root directory sectors
    let sector = img.sector(ROOT_DIR_START_LBA).unwrap();
    assert_eq!(&sector[0..11], b"FOO     TXT");
    assert_eq!(&sector[32..43], b"BAR     TXT");
}

#[test]
fn any_entry_reserialises_to_identical_bytes() {
    let mut raw = [0u8; 32];
    raw[0..11].copy_from_slice(b"REPORT  DOC");
    raw[11] = ATTR_ARCHIVE | ATTR_READ_ONLY;
    raw[22..24].copy_from_slice(&0x6C2Du16.to_le_bytes());
    raw[24..26].copy_from_slice(&0x1CCFu16.to_le_bytes());
    raw[26..28].copy_from_slice(&7u16.to_le_bytes());
    raw[28..32].copy_from_slice(&1234u32.to_le_bytes());
    match DirEntry::parse(&raw) {
        DirSlot::Live(e) => assert_eq!(e.serialize(), raw),
        other => panic!("unexpected slot {:?}", other),
    }
}

#[test]
fn lfn_slots_are_skipped_not_parsed() {
    let mut raw = [0u8; 32];
    raw[0] = 0x41;
    raw[11] = ATTR_LFN;
    assert_eq!(DirEntry::parse(&raw), DirSlot::LfnSkip);
}

#[test]
fn disallowed_characters_fail_bad_name() {
    for c in "\"*+,/:;<=>?[\\]|".chars() {
        let name = format!("A{}B", c);
        assert_eq!(
            normalize_name(&name).unwrap_err().kind(),
            ErrorKind::BadName,
            "{:?} should be rejected",
            c
        );
    }
    assert_eq!(normalize_name("A\u{1}B").unwrap_err().kind(), ErrorKind::BadName);
}

#[test]
fn timestamps_round_trip() {
    let dt = NaiveDate::from_ymd_opt(2003, 12, 31)
        .unwrap()
        .and_hms_opt(23, 59, 58)
        .unwrap();
    let (date, time) = encode_datetime(dt);
    assert_eq!(decode_datetime(date, time), Some(dt));
}

#[test]
fn attribute_accessors_match_their_bits() {
    let attr = Attributes(ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_DIRECTORY);
    assert!(attr.read_only());
    assert!(attr.hidden());
    assert!(!attr.system());
    assert!(attr.directory());
    assert!(!attr.volume_label());
    assert!(!attr.archive());
    assert!(!attr.lfn());
}
