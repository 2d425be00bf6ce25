use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{ErrorKind, FsError};
use crate::fat_constants::*;

/// Attribute bitfield of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes(pub u8);

impl Attributes {
    pub const FILE: Attributes = Attributes(ATTR_ARCHIVE);
    pub const DIRECTORY: Attributes = Attributes(ATTR_DIRECTORY);
    pub const VOLUME_LABEL: Attributes = Attributes(ATTR_VOLUME_LABEL);

    pub fn read_only(self) -> bool {
        self.0 & ATTR_READ_ONLY != 0
    }

    pub fn hidden(self) -> bool {
        self.0 & ATTR_HIDDEN != 0
    }

    pub fn system(self) -> bool {
        self.0 & ATTR_SYSTEM != 0
    }

    pub fn volume_label(self) -> bool {
        self.0 & ATTR_VOLUME_LABEL != 0
    }

    pub fn directory(self) -> bool {
        self.0 & ATTR_DIRECTORY != 0
    }

    pub fn archive(self) -> bool {
        self.0 & ATTR_ARCHIVE != 0
    }

    pub fn lfn(self) -> bool {
        self.0 & 0x3F == ATTR_LFN
    }
}

/// A live 32-byte directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name: [u8; 8],
    pub ext: [u8; 3],
    pub attr: Attributes,
    pub time: u16,
    pub date: u16,
    pub start_cluster: u16,
    pub file_size: u32,
}

/// What a raw 32-byte slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirSlot {
    /// First byte 0x00: never used, and every following slot is free too.
    NeverUsed,
    /// First byte 0xE5: deleted, reusable.
    Deleted,
    /// Attribute 0x0F: long-file-name remnant, skipped on read.
    LfnSkip,
    Live(DirEntry),
}

pub const DOT_NAME: [u8; 11] = *b".          ";
pub const DOTDOT_NAME: [u8; 11] = *b"..         ";

impl DirEntry {
    pub fn new(name11: [u8; 11], attr: Attributes, start_cluster: u16, file_size: u32) -> Self {
        let mut name = [b' '; 8];
        let mut ext = [b' '; 3];
        name.copy_from_slice(&name11[0..8]);
        ext.copy_from_slice(&name11[8..11]);
        DirEntry {
            name,
            ext,
            attr,
            time: 0,
            date: 0,
            start_cluster,
            file_size,
        }
    }

    pub fn with_modified(mut self, now: NaiveDateTime) -> Self {
        let (date, time) = encode_datetime(now);
        self.date = date;
        self.time = time;
        self
    }

    /// Parses one 32-byte slot.
    pub fn parse(raw: &[u8; DIR_ENTRY_SIZE]) -> DirSlot {
        match raw[0] {
            SLOT_NEVER_USED => return DirSlot::NeverUsed,
            SLOT_DELETED => return DirSlot::Deleted,
            _ => {}
        }
        let attr = Attributes(raw[11]);
        if attr.lfn() {
            return DirSlot::LfnSkip;
        }
        let mut name = [0u8; 8];
        name.copy_from_slice(&raw[0..8]);
        if name[0] == SLOT_KANJI_E5 {
            name[0] = 0xE5;
        }
        let mut ext = [0u8; 3];
        ext.copy_from_slice(&raw[8..11]);
        DirSlot::Live(DirEntry {
            name,
            ext,
            attr,
            time: u16::from_le_bytes([raw[22], raw[23]]),
            date: u16::from_le_bytes([raw[24], raw[25]]),
            start_cluster: u16::from_le_bytes([raw[26], raw[27]]),
            file_size: u32::from_le_bytes([raw[28], raw[29], raw[30], raw[31]]),
        })
    }

    /// Serialises the entry back into its 32-byte on-disk form.
    pub fn serialize(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut raw = [0u8; DIR_ENTRY_SIZE];
        raw[0..8].copy_from_slice(&self.name);
        if raw[0] == 0xE5 {
            raw[0] = SLOT_KANJI_E5;
        }
        raw[8..11].copy_from_slice(&self.ext);
        raw[11] = self.attr.0;
        raw[22..24].copy_from_slice(&self.time.to_le_bytes());
        raw[24..26].copy_from_slice(&self.date.to_le_bytes());
        raw[26..28].copy_from_slice(&self.start_cluster.to_le_bytes());
        raw[28..32].copy_from_slice(&self.file_size.to_le_bytes());
        raw
    }

    /// The combined space-padded 11-byte name used for lookups.
    pub fn name11(&self) -> [u8; 11] {
        let mut out = [b' '; 11];
        out[0..8].copy_from_slice(&self.name);
        out[8..11].copy_from_slice(&self.ext);
        out
    }

    /// Human-readable `BASE.EXT` form.
    pub fn display_name(&self) -> String {
        display_name11(&self.name11())
    }

    pub fn is_dot(&self) -> bool {
        self.name11() == DOT_NAME
    }

    pub fn is_dotdot(&self) -> bool {
        self.name11() == DOTDOT_NAME
    }

    pub fn modified(&self) -> Option<NaiveDateTime> {
        decode_datetime(self.date, self.time)
    }
}

fn trim_padding(bytes: &[u8]) -> &str {
    // names are validated to ASCII on the way in
    core::str::from_utf8(bytes).unwrap_or("").trim_end_matches(' ')
}

/// Human-readable `BASE.EXT` form of a combined 11-byte name.
pub fn display_name11(name11: &[u8; 11]) -> String {
    let base = trim_padding(&name11[0..8]);
    let ext = trim_padding(&name11[8..11]);
    if ext.is_empty() {
        base.to_string()
    } else {
        format!("{}.{}", base, ext)
    }
}

/// Bytes that may never appear in an 8.3 name.
const INVALID_NAME_BYTES: &[u8] = b"\"*+,/:;<=>?[\\]|";

fn valid_name_byte(b: u8) -> bool {
    (0x20..0x7F).contains(&b) && !INVALID_NAME_BYTES.contains(&b)
}

/// Normalises one path component into its on-disk 11-byte form: trimmed,
/// split at the last dot, both halves uppercased and space-padded.
pub fn normalize_name(component: &str) -> Result<[u8; 11], FsError> {
    let trimmed = component.trim();
    let (base, ext) = match trimmed.rfind('.') {
        Some(i) => (&trimmed[..i], &trimmed[i + 1..]),
        None => (trimmed, ""),
    };
    if base.is_empty() {
        return Err(FsError::new(
            ErrorKind::BadName,
            format!("empty base name in {:?}", component),
        ));
    }
    if base.len() > 8 || ext.len() > 3 {
        return Err(FsError::new(
            ErrorKind::BadName,
            format!("{:?} does not fit 8.3", component),
        ));
    }
    let mut out = [b' '; 11];
    for (dst, src) in out[0..8].iter_mut().zip(base.bytes()) {
        if src == b'.' || !valid_name_byte(src) {
            return Err(FsError::new(
                ErrorKind::BadName,
                format!("invalid character {:?} in {:?}", src as char, component),
            ));
        }
        *dst = src.to_ascii_uppercase();
    }
    for (dst, src) in out[8..11].iter_mut().zip(ext.bytes()) {
        if !valid_name_byte(src) {
            return Err(FsError::new(
                ErrorKind::BadName,
                format!("invalid character {:?} in {:?}", src as char, component),
            ));
        }
        *dst = src.to_ascii_uppercase();
    }
    Ok(out)
}

/// Normalises a volume label: up to 11 characters stored in the combined
/// name+ext field, space-padded, no dot inserted.
pub fn normalize_label(label: &str) -> Result<[u8; 11], FsError> {
    let trimmed = label.trim();
    if trimmed.len() > 11 {
        return Err(FsError::new(
            ErrorKind::BadName,
            format!("label {:?} is longer than 11 characters", label),
        ));
    }
    let mut out = [b' '; 11];
    for (dst, src) in out.iter_mut().zip(trimmed.bytes()) {
        if !valid_name_byte(src) && src != b' ' {
            return Err(FsError::new(
                ErrorKind::BadName,
                format!("invalid character {:?} in label", src as char),
            ));
        }
        *dst = src.to_ascii_uppercase();
    }
    Ok(out)
}

/// Packs a timestamp into the on-disk date and time words.
///
/// Date: year-1980 (7 bits) | month (4) | day (5). Time: hour (5) |
/// minute (6) | second/2 (5). Years outside 1980..=2107 are clamped.
pub fn encode_datetime(dt: NaiveDateTime) -> (u16, u16) {
    let year = dt.year().clamp(1980, 2107) as u16 - 1980;
    let date = (year << 9) | (dt.month() as u16) << 5 | dt.day() as u16;
    let time = (dt.hour() as u16) << 11 | (dt.minute() as u16) << 5 | (dt.second() as u16 / 2);
    (date, time)
}

/// Unpacks the on-disk date and time words; `None` for encodings that do not
/// name a real calendar instant (month 0, day 32, ...).
pub fn decode_datetime(date: u16, time: u16) -> Option<NaiveDateTime> {
    let d = NaiveDate::from_ymd_opt(
        1980 + (date >> 9) as i32,
        ((date >> 5) & 0x0F) as u32,
        (date & 0x1F) as u32,
    )?;
    d.and_hms_opt(
        (time >> 11) as u32,
        ((time >> 5) & 0x3F) as u32,
        ((time & 0x1F) * 2) as u32,
    )
}
