use chrono::NaiveDateTime;
use log::{debug, info, warn};

use crate::block_device::BlockDevice;
use crate::boot_sector::BootSector;
use crate::clock::{derive_serial, Clock, SystemClock};
use crate::dir_entry::{
    display_name11, normalize_label, Attributes, DirEntry, DirSlot, DOTDOT_NAME, DOT_NAME,
};
use crate::directory::{DirLocation, Directory};
use crate::error::{ErrorKind, FsError};
use crate::fat_constants::*;
use crate::fat_table::FatTable;
use crate::file::{FileHandle, OpenMode};
use crate::path::{parse_path, Component};

/// One listing result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub attributes: Attributes,
    pub modified: Option<NaiveDateTime>,
    pub start_cluster: u16,
    pub size: u32,
}

impl From<&DirEntry> for FileInfo {
    fn from(entry: &DirEntry) -> Self {
        FileInfo {
            name: entry.display_name(),
            attributes: entry.attr,
            modified: entry.modified(),
            start_cluster: entry.start_cluster,
            size: entry.file_size,
        }
    }
}

/// A FAT12 file system over a sector-addressed 1.44 MB image.
///
/// The engine holds an exclusive borrow of the device for its whole
/// lifetime; every operation is synchronous and the image is always in a
/// consistent state when a call returns, success or error.
pub struct FileSystem<'a, D: BlockDevice> {
    pub(crate) device: &'a mut D,
    pub boot_sector: BootSector,
    pub(crate) clock: Box<dyn Clock>,
    needs_remirror: bool,
}

impl<'a, D: BlockDevice> std::fmt::Debug for FileSystem<'a, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystem")
            .field("boot_sector", &self.boot_sector)
            .field("clock", &self.clock)
            .field("needs_remirror", &self.needs_remirror)
            .finish()
    }
}

impl<'a, D: BlockDevice> FileSystem<'a, D> {
    /// Mounts an existing FAT12 volume, using the system clock for
    /// timestamps.
    pub fn mount(device: &'a mut D) -> Result<Self, FsError> {
        Self::mount_with_clock(device, Box::new(SystemClock))
    }

    pub fn mount_with_clock(device: &'a mut D, clock: Box<dyn Clock>) -> Result<Self, FsError> {
        if device.sector_count() != TOTAL_SECTORS as u64 {
            return Err(FsError::new(
                ErrorKind::UnsupportedGeometry,
                format!("device has {} sectors, expected {}", device.sector_count(), TOTAL_SECTORS),
            ));
        }
        let mut buf = [0u8; BYTES_PER_SECTOR];
        device.read_sector(0, &mut buf)?;
        let boot_sector = match BootSector::parse(&buf) {
            Ok(bs) => bs,
            Err(e) => {
                debug!("mount: boot sector rejected: {}", e);
                return Err(e);
            }
        };
        let mut fs = FileSystem {
            device,
            boot_sector,
            clock,
            needs_remirror: false,
        };
        let identical = FatTable::new(&mut *fs.device, &fs.boot_sector).fats_identical()?;
        if !identical {
            warn!("FAT copies differ; reads use FAT1, FAT2 is rewritten on the next write");
            fs.needs_remirror = true;
        }
        debug!("mounted FAT12 volume, serial {:08X}", boot_sector.volume_serial);
        Ok(fs)
    }

    /// Creates a fresh FAT12 file system on the device and mounts it. The
    /// volume serial is derived from the clock.
    pub fn format(device: &'a mut D, label: &str) -> Result<Self, FsError> {
        Self::format_with(device, label, None, Box::new(SystemClock))
    }

    pub fn format_with(
        device: &'a mut D,
        label: &str,
        serial: Option<u32>,
        clock: Box<dyn Clock>,
    ) -> Result<Self, FsError> {
        if device.sector_count() != TOTAL_SECTORS as u64 {
            return Err(FsError::new(
                ErrorKind::UnsupportedGeometry,
                format!("device has {} sectors, expected {}", device.sector_count(), TOTAL_SECTORS),
            ));
        }
        let label11 = if label.trim().is_empty() {
            [b' '; 11]
        } else {
            normalize_label(label)?
        };
        let now = clock.now();
        let serial = serial.unwrap_or_else(|| derive_serial(now));

        let boot_sector = BootSector::new_1440(serial, label11);
        let mut buf = [0u8; BYTES_PER_SECTOR];
        BootSector::write_bootstrap(&mut buf);
        boot_sector.serialize(&mut buf)?;
        device.write_sector(0, &buf)?;

        // zero both FATs and the root directory; data-region bytes stay as
        // they are, the FAT now says every cluster is free
        let zero = [0u8; BYTES_PER_SECTOR];
        for lba in boot_sector.fat_start_lba..boot_sector.data_start_lba {
            device.write_sector(lba, &zero)?;
        }

        let mut fs = FileSystem {
            device,
            boot_sector,
            clock,
            needs_remirror: false,
        };
        {
            let mut fat = FatTable::new(&mut *fs.device, &fs.boot_sector);
            fat.set(0, FAT_ENTRY0)?;
            fat.set(1, FAT_EOC)?;
            if label11 != [b' '; 11] {
                let mut root = Directory::open(&mut fat, DirLocation::Root)?;
                root.insert(
                    &DirEntry::new(label11, Attributes::VOLUME_LABEL, 0, 0).with_modified(now),
                )?;
            }
        }
        info!("formatted 1.44 MB FAT12 volume, serial {:08X}", serial);
        Ok(fs)
    }

    pub(crate) fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Copies FAT1 over FAT2 if mount found them diverged. Every mutating
    /// operation calls this before touching the image.
    pub(crate) fn ensure_mirror(&mut self) -> Result<(), FsError> {
        if self.needs_remirror {
            FatTable::new(&mut *self.device, &self.boot_sector).remirror()?;
            self.needs_remirror = false;
            info!("re-mirrored FAT1 over FAT2");
        }
        Ok(())
    }

    /// Deterministic read-only check: are the two FAT copies identical?
    pub fn fats_identical(&mut self) -> Result<bool, FsError> {
        FatTable::new(&mut *self.device, &self.boot_sector).fats_identical()
    }

    fn resolve_components(&mut self, comps: &[Component]) -> Result<DirLocation, FsError> {
        let mut loc = DirLocation::Root;
        for comp in comps {
            loc = match *comp {
                Component::Current => loc,
                Component::Parent => match loc {
                    DirLocation::Root => DirLocation::Root,
                    DirLocation::Chain(_) => {
                        let mut fat = FatTable::new(&mut *self.device, &self.boot_sector);
                        let dir = Directory::open(&mut fat, loc)?;
                        match DirEntry::parse(&dir.read_slot(1)?) {
                            DirSlot::Live(e) if e.start_cluster == 0 => DirLocation::Root,
                            DirSlot::Live(e) => DirLocation::Chain(e.start_cluster),
                            _ => {
                                return Err(FsError::new(
                                    ErrorKind::CorruptDirectory,
                                    "missing .. entry",
                                ))
                            }
                        }
                    }
                },
                Component::Name(name11) => {
                    let mut fat = FatTable::new(&mut *self.device, &self.boot_sector);
                    let dir = Directory::open(&mut fat, loc)?;
                    match dir.find(name11)? {
                        None => {
                            return Err(FsError::new(
                                ErrorKind::NotFound,
                                format!("no such directory: {}", display_name11(&name11)),
                            ))
                        }
                        Some((_, e)) if !e.attr.directory() => {
                            return Err(FsError::new(
                                ErrorKind::NotADirectory,
                                format!("{} is not a directory", e.display_name()),
                            ))
                        }
                        Some((_, e)) if e.start_cluster < FIRST_DATA_CLUSTER => {
                            return Err(FsError::new(
                                ErrorKind::CorruptDirectory,
                                format!("{} has no cluster chain", e.display_name()),
                            ))
                        }
                        Some((_, e)) => DirLocation::Chain(e.start_cluster),
                    }
                }
            };
        }
        Ok(loc)
    }

    fn resolve_dir(&mut self, path: &str) -> Result<DirLocation, FsError> {
        let parsed = parse_path(path)?;
        self.resolve_components(&parsed.components)
    }

    /// Resolves a path to an existing entry: (parent directory, slot index,
    /// entry). The root itself is not an entry and fails `BadName`.
    fn resolve_entry(&mut self, path: &str) -> Result<(DirLocation, usize, DirEntry), FsError> {
        let (parent_comps, name11, must_be_dir) = parse_path(path)?.split_leaf()?;
        let parent = self.resolve_components(&parent_comps)?;
        let mut fat = FatTable::new(&mut *self.device, &self.boot_sector);
        let dir = Directory::open(&mut fat, parent)?;
        match dir.find(name11)? {
            None => Err(FsError::new(
                ErrorKind::NotFound,
                format!("no such entry: {}", display_name11(&name11)),
            )),
            Some((_, e)) if must_be_dir && !e.attr.directory() => Err(FsError::new(
                ErrorKind::NotADirectory,
                format!("{} is not a directory", e.display_name()),
            )),
            Some((slot, e)) => Ok((parent, slot, e)),
        }
    }

    /// Lists a directory. Sub-directory listings include their `.`/`..`
    /// pair; the volume label never appears.
    pub fn list(&mut self, path: &str) -> Result<Vec<FileInfo>, FsError> {
        let loc = self.resolve_dir(path)?;
        let mut fat = FatTable::new(&mut *self.device, &self.boot_sector);
        let dir = Directory::open(&mut fat, loc)?;
        Ok(dir
            .entries()?
            .into_iter()
            .filter(|(_, e)| !e.attr.volume_label())
            .map(|(_, e)| FileInfo::from(&e))
            .collect())
    }

    /// Returns the listing record for a single path.
    pub fn stat(&mut self, path: &str) -> Result<FileInfo, FsError> {
        let (_, _, entry) = self.resolve_entry(path)?;
        Ok(FileInfo::from(&entry))
    }

    /// True when the path resolves to a live entry (or the root itself).
    pub fn exists(&mut self, path: &str) -> Result<bool, FsError> {
        if parse_path(path)?.is_root() {
            return Ok(true);
        }
        match self.resolve_entry(path) {
            Ok(_) => Ok(true),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Reads a whole file.
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>, FsError> {
        let (_, _, entry) = self.resolve_entry(path)?;
        if entry.attr.directory() {
            return Err(FsError::new(
                ErrorKind::IsADirectory,
                format!("cannot read directory {}", entry.display_name()),
            ));
        }
        let size = entry.file_size as usize;
        if size == 0 {
            return Ok(Vec::new());
        }
        if entry.start_cluster < FIRST_DATA_CLUSTER {
            return Err(FsError::new(
                ErrorKind::CorruptDirectory,
                format!("{} has a size but no start cluster", entry.display_name()),
            ));
        }
        let fat = FatTable::new(&mut *self.device, &self.boot_sector);
        let chain = fat.walk(entry.start_cluster)?;
        let needed = (size + BYTES_PER_SECTOR - 1) / BYTES_PER_SECTOR;
        if chain.len() < needed {
            return Err(FsError::new(
                ErrorKind::BadChain,
                format!(
                    "{} needs {} clusters but its chain has {}",
                    entry.display_name(),
                    needed,
                    chain.len()
                ),
            ));
        }
        let mut out = Vec::with_capacity(needed * BYTES_PER_SECTOR);
        for &c in &chain[..needed] {
            out.extend_from_slice(&fat.read_cluster(c)?);
        }
        out.truncate(size);
        Ok(out)
    }

    /// Writes a whole file, replacing any previous contents. The old chain
    /// is freed first, then `ceil(len/512)` clusters are allocated first-fit.
    pub fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), FsError> {
        self.ensure_mirror()?;
        if data.len() as u64 > MAX_FILE_BYTES {
            return Err(FsError::new(
                ErrorKind::NoSpace,
                format!("{} bytes exceeds the {} byte maximum", data.len(), MAX_FILE_BYTES),
            ));
        }
        let (parent_comps, name11, must_be_dir) = parse_path(path)?.split_leaf()?;
        let parent = self.resolve_components(&parent_comps)?;
        let now = self.now();

        let mut fat = FatTable::new(&mut *self.device, &self.boot_sector);
        let found = Directory::open(&mut fat, parent)?.find(name11)?;
        let (slot, created) = match found {
            Some((slot, e)) => {
                if e.attr.directory() {
                    return Err(FsError::new(
                        ErrorKind::IsADirectory,
                        format!("cannot overwrite directory {}", e.display_name()),
                    ));
                }
                if must_be_dir {
                    return Err(FsError::new(
                        ErrorKind::NotADirectory,
                        format!("{} is not a directory", e.display_name()),
                    ));
                }
                if e.attr.read_only() {
                    return Err(FsError::new(
                        ErrorKind::ReadOnly,
                        format!("{} is read-only", e.display_name()),
                    ));
                }
                // free the old chain and neutralise the entry before
                // reallocating; a failed allocation leaves an empty file
                if e.start_cluster >= FIRST_DATA_CLUSTER {
                    fat.free_chain(e.start_cluster)?;
                }
                let mut empty = e;
                empty.start_cluster = 0;
                empty.file_size = 0;
                Directory::open(&mut fat, parent)?.update(slot, &empty.with_modified(now))?;
                (slot, false)
            }
            None => {
                if must_be_dir {
                    return Err(FsError::new(
                        ErrorKind::IsADirectory,
                        "cannot create a file at a directory path",
                    ));
                }
                let entry = DirEntry::new(name11, Attributes::FILE, 0, 0).with_modified(now);
                (Directory::open(&mut fat, parent)?.insert(&entry)?, true)
            }
        };

        if !data.is_empty() {
            let count = (data.len() + BYTES_PER_SECTOR - 1) / BYTES_PER_SECTOR;
            let clusters = match fat.alloc_chain(count) {
                Ok(clusters) => clusters,
                Err(e) => {
                    // roll back the entry this call created
                    if created {
                        Directory::open(&mut fat, parent)?.mark_deleted(slot)?;
                    }
                    return Err(e);
                }
            };
            for (i, &c) in clusters.iter().enumerate() {
                let mut buf = [0u8; BYTES_PER_SECTOR];
                let start = i * BYTES_PER_SECTOR;
                let end = (start + BYTES_PER_SECTOR).min(data.len());
                buf[..end - start].copy_from_slice(&data[start..end]);
                fat.write_cluster(c, &buf)?;
            }
            let mut dir = Directory::open(&mut fat, parent)?;
            if let DirSlot::Live(mut e) = DirEntry::parse(&dir.read_slot(slot)?) {
                e.start_cluster = clusters[0];
                e.file_size = data.len() as u32;
                dir.update(slot, &e.with_modified(now))?;
            }
        }
        Ok(())
    }

    /// Opens a positioned file handle.
    pub fn open(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle<'_, 'a, D>, FsError> {
        let (parent_comps, name11, must_be_dir) = parse_path(path)?.split_leaf()?;
        let parent = self.resolve_components(&parent_comps)?;
        if mode != OpenMode::Read {
            self.ensure_mirror()?;
        }
        let now = self.now();

        let slot = {
            let mut fat = FatTable::new(&mut *self.device, &self.boot_sector);
            let found = Directory::open(&mut fat, parent)?.find(name11)?;
            match found {
                Some((slot, e)) => {
                    if e.attr.directory() {
                        return Err(FsError::new(
                            ErrorKind::IsADirectory,
                            format!("cannot open directory {}", e.display_name()),
                        ));
                    }
                    if must_be_dir {
                        return Err(FsError::new(
                            ErrorKind::NotADirectory,
                            format!("{} is not a directory", e.display_name()),
                        ));
                    }
                    if mode != OpenMode::Read && e.attr.read_only() {
                        return Err(FsError::new(
                            ErrorKind::ReadOnly,
                            format!("{} is read-only", e.display_name()),
                        ));
                    }
                    if mode == OpenMode::Write {
                        // truncate on open
                        if e.start_cluster >= FIRST_DATA_CLUSTER {
                            fat.free_chain(e.start_cluster)?;
                        }
                        let mut empty = e;
                        empty.start_cluster = 0;
                        empty.file_size = 0;
                        Directory::open(&mut fat, parent)?
                            .update(slot, &empty.with_modified(now))?;
                    }
                    slot
                }
                None => {
                    if mode == OpenMode::Read {
                        return Err(FsError::new(
                            ErrorKind::NotFound,
                            format!("no such file: {}", display_name11(&name11)),
                        ));
                    }
                    if must_be_dir {
                        return Err(FsError::new(
                            ErrorKind::IsADirectory,
                            "cannot create a file at a directory path",
                        ));
                    }
                    let entry = DirEntry::new(name11, Attributes::FILE, 0, 0).with_modified(now);
                    Directory::open(&mut fat, parent)?.insert(&entry)?
                }
            }
        };
        FileHandle::new(self, parent, slot, mode)
    }

    /// Deletes a file. The slot is marked deleted before the chain is freed,
    /// so an interruption can leak clusters but never leave a dangling
    /// reference.
    pub fn delete(&mut self, path: &str) -> Result<(), FsError> {
        self.ensure_mirror()?;
        let (parent, slot, entry) = self.resolve_entry(path)?;
        if entry.attr.directory() {
            return Err(FsError::new(
                ErrorKind::IsADirectory,
                format!("{} is a directory, use rmdir", entry.display_name()),
            ));
        }
        if entry.attr.read_only() {
            return Err(FsError::new(
                ErrorKind::ReadOnly,
                format!("{} is read-only", entry.display_name()),
            ));
        }
        let mut fat = FatTable::new(&mut *self.device, &self.boot_sector);
        Directory::open(&mut fat, parent)?.mark_deleted(slot)?;
        if entry.start_cluster >= FIRST_DATA_CLUSTER {
            fat.free_chain(entry.start_cluster)?;
        }
        Ok(())
    }

    /// Renames an entry within its directory. `new` may be a bare 8.3 name
    /// or a path whose parent resolves to the same directory; the slot is
    /// rewritten in place and never moves.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), FsError> {
        self.ensure_mirror()?;
        let (parent_comps, old11, must_be_dir) = parse_path(old)?.split_leaf()?;
        let parent = self.resolve_components(&parent_comps)?;
        let (new_parent_comps, new11, _) = parse_path(new)?.split_leaf()?;
        if !new_parent_comps.is_empty() {
            let new_parent = self.resolve_components(&new_parent_comps)?;
            if new_parent != parent {
                return Err(FsError::new(
                    ErrorKind::BadName,
                    "cross-directory rename is not supported",
                ));
            }
        }
        let mut fat = FatTable::new(&mut *self.device, &self.boot_sector);
        let mut dir = Directory::open(&mut fat, parent)?;
        if must_be_dir {
            if let Some((_, e)) = dir.find(old11)? {
                if !e.attr.directory() {
                    return Err(FsError::new(
                        ErrorKind::NotADirectory,
                        format!("{} is not a directory", e.display_name()),
                    ));
                }
            }
        }
        dir.rename(old11, new11)
    }

    /// Creates an empty sub-directory with its `.`/`..` pair.
    pub fn mkdir(&mut self, path: &str) -> Result<(), FsError> {
        self.ensure_mirror()?;
        let (parent_comps, name11, _) = parse_path(path)?.split_leaf()?;
        let parent = self.resolve_components(&parent_comps)?;
        let now = self.now();

        let mut fat = FatTable::new(&mut *self.device, &self.boot_sector);
        if Directory::open(&mut fat, parent)?.find(name11)?.is_some() {
            return Err(FsError::new(
                ErrorKind::Exists,
                format!("{} already exists", display_name11(&name11)),
            ));
        }
        let cluster = fat.alloc_one()?;
        let parent_cluster = match parent {
            DirLocation::Root => 0,
            DirLocation::Chain(c) => c,
        };
        let mut buf = [0u8; BYTES_PER_SECTOR];
        buf[0..DIR_ENTRY_SIZE].copy_from_slice(
            &DirEntry::new(DOT_NAME, Attributes::DIRECTORY, cluster, 0)
                .with_modified(now)
                .serialize(),
        );
        buf[DIR_ENTRY_SIZE..2 * DIR_ENTRY_SIZE].copy_from_slice(
            &DirEntry::new(DOTDOT_NAME, Attributes::DIRECTORY, parent_cluster, 0)
                .with_modified(now)
                .serialize(),
        );
        fat.write_cluster(cluster, &buf)?;

        let entry = DirEntry::new(name11, Attributes::DIRECTORY, cluster, 0).with_modified(now);
        let inserted = Directory::open(&mut fat, parent)?.insert(&entry);
        if let Err(e) = inserted {
            fat.free_chain(cluster)?;
            return Err(e);
        }
        Ok(())
    }

    /// Removes an empty sub-directory.
    pub fn rmdir(&mut self, path: &str) -> Result<(), FsError> {
        self.ensure_mirror()?;
        let (parent, slot, entry) = self.resolve_entry(path)?;
        if !entry.attr.directory() {
            return Err(FsError::new(
                ErrorKind::NotADirectory,
                format!("{} is not a directory", entry.display_name()),
            ));
        }
        if entry.start_cluster < FIRST_DATA_CLUSTER {
            return Err(FsError::new(
                ErrorKind::CorruptDirectory,
                format!("{} has no cluster chain", entry.display_name()),
            ));
        }
        let mut fat = FatTable::new(&mut *self.device, &self.boot_sector);
        if !Directory::open(&mut fat, DirLocation::Chain(entry.start_cluster))?.is_empty_subdir()? {
            return Err(FsError::new(
                ErrorKind::DirNotEmpty,
                format!("{} is not empty", entry.display_name()),
            ));
        }
        Directory::open(&mut fat, parent)?.mark_deleted(slot)?;
        fat.free_chain(entry.start_cluster)
    }

    /// Rewrites the read-only/hidden/system/archive bits of an entry. The
    /// directory and volume-label bits cannot be changed this way.
    pub fn set_attributes(&mut self, path: &str, attrs: u8) -> Result<(), FsError> {
        self.ensure_mirror()?;
        let (parent, slot, mut entry) = self.resolve_entry(path)?;
        entry.attr = Attributes(
            (entry.attr.0 & !(ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_SYSTEM | ATTR_ARCHIVE))
                | (attrs & (ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_SYSTEM | ATTR_ARCHIVE)),
        );
        let mut fat = FatTable::new(&mut *self.device, &self.boot_sector);
        Directory::open(&mut fat, parent)?.update(slot, &entry)
    }

    /// The volume label: the root label entry when present, otherwise the
    /// copy stored in the boot sector.
    pub fn label(&mut self) -> Result<String, FsError> {
        let mut fat = FatTable::new(&mut *self.device, &self.boot_sector);
        let root = Directory::open(&mut fat, DirLocation::Root)?;
        let raw = match root.find_label()? {
            Some((_, e)) => e.name11(),
            None => self.boot_sector.volume_label,
        };
        Ok(String::from_utf8_lossy(&raw)
            .trim_end_matches([' ', '\0'])
            .to_string())
    }

    /// Sets the volume label in both the root directory and the boot
    /// sector. An empty label removes the root entry.
    pub fn set_label(&mut self, label: &str) -> Result<(), FsError> {
        self.ensure_mirror()?;
        let clearing = label.trim().is_empty();
        let label11 = if clearing {
            [b' '; 11]
        } else {
            normalize_label(label)?
        };
        let now = self.now();
        {
            let mut fat = FatTable::new(&mut *self.device, &self.boot_sector);
            let mut root = Directory::open(&mut fat, DirLocation::Root)?;
            match root.find_label()? {
                Some((slot, mut e)) => {
                    if clearing {
                        root.mark_deleted(slot)?;
                    } else {
                        e.name.copy_from_slice(&label11[0..8]);
                        e.ext.copy_from_slice(&label11[8..11]);
                        root.update(slot, &e.with_modified(now))?;
                    }
                }
                None if !clearing => {
                    root.insert(
                        &DirEntry::new(label11, Attributes::VOLUME_LABEL, 0, 0).with_modified(now),
                    )?;
                }
                None => {}
            }
        }
        self.boot_sector.volume_label = label11;
        let mut buf = [0u8; BYTES_PER_SECTOR];
        self.device.read_sector(0, &mut buf)?;
        self.boot_sector.serialize(&mut buf)?;
        self.device.write_sector(0, &buf)
    }
}
