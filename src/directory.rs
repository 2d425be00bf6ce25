use crate::block_device::BlockDevice;
use crate::dir_entry::{DirEntry, DirSlot, DOTDOT_NAME, DOT_NAME};
use crate::error::{ErrorKind, FsError};
use crate::fat_constants::*;
use crate::fat_table::FatTable;

/// Where a directory's slots live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirLocation {
    /// The fixed 224-slot root directory at sectors 19..33.
    Root,
    /// A sub-directory stored in the cluster chain starting here.
    Chain(u16),
}

/// Logical view over one directory's 32-byte slots.
///
/// Sector access goes through the borrowed `FatTable` so chained
/// sub-directories can be walked and extended without a second device
/// borrow.
pub struct Directory<'f, 'd, D: BlockDevice> {
    fat: &'f mut FatTable<'d, D>,
    loc: DirLocation,
    chain: Vec<u16>, // empty for the root
}

impl<'f, 'd, D: BlockDevice> std::fmt::Debug for Directory<'f, 'd, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("fat", &self.fat)
            .field("loc", &self.loc)
            .field("chain", &self.chain)
            .finish()
    }
}

impl<'f, 'd, D: BlockDevice> Directory<'f, 'd, D> {
    /// Opens a directory view. A sub-directory must begin with its `.`/`..`
    /// pair; anything else fails `CorruptDirectory`.
    pub fn open(fat: &'f mut FatTable<'d, D>, loc: DirLocation) -> Result<Self, FsError> {
        let chain = match loc {
            DirLocation::Root => Vec::new(),
            DirLocation::Chain(start) => fat.walk(start)?,
        };
        let dir = Directory { fat, loc, chain };
        if let DirLocation::Chain(start) = loc {
            let dot = dir.live_at(0)?;
            let dotdot = dir.live_at(1)?;
            let ok = matches!(dot, Some(e) if e.name11() == DOT_NAME)
                && matches!(dotdot, Some(e) if e.name11() == DOTDOT_NAME);
            if !ok {
                return Err(FsError::new(
                    ErrorKind::CorruptDirectory,
                    format!("directory at cluster {} lacks its dot entries", start),
                ));
            }
        }
        Ok(dir)
    }

    pub fn location(&self) -> DirLocation {
        self.loc
    }

    /// Number of slots currently addressable.
    pub fn capacity(&self) -> usize {
        match self.loc {
            DirLocation::Root => MAX_ROOT_DIR_ENTRIES as usize,
            DirLocation::Chain(_) => self.chain.len() * DIR_ENTRIES_PER_SECTOR,
        }
    }

    fn slot_sector(&self, idx: usize) -> (u64, usize) {
        let layout = self.fat.layout();
        let sector = idx / DIR_ENTRIES_PER_SECTOR;
        let offset = (idx % DIR_ENTRIES_PER_SECTOR) * DIR_ENTRY_SIZE;
        let lba = match self.loc {
            DirLocation::Root => layout.root_dir_start_lba + sector as u64,
            DirLocation::Chain(_) => layout.cluster_lba(self.chain[sector]),
        };
        (lba, offset)
    }

    pub fn read_slot(&self, idx: usize) -> Result<[u8; DIR_ENTRY_SIZE], FsError> {
        let (lba, offset) = self.slot_sector(idx);
        let mut sector = [0u8; BYTES_PER_SECTOR];
        self.fat.read_data_sector(lba, &mut sector)?;
        let mut raw = [0u8; DIR_ENTRY_SIZE];
        raw.copy_from_slice(&sector[offset..offset + DIR_ENTRY_SIZE]);
        Ok(raw)
    }

    pub fn write_slot(&mut self, idx: usize, raw: &[u8; DIR_ENTRY_SIZE]) -> Result<(), FsError> {
        let (lba, offset) = self.slot_sector(idx);
        let mut sector = [0u8; BYTES_PER_SECTOR];
        self.fat.read_data_sector(lba, &mut sector)?;
        sector[offset..offset + DIR_ENTRY_SIZE].copy_from_slice(raw);
        self.fat.write_data_sector(lba, &sector)
    }

    fn live_at(&self, idx: usize) -> Result<Option<DirEntry>, FsError> {
        if idx >= self.capacity() {
            return Ok(None);
        }
        match DirEntry::parse(&self.read_slot(idx)?) {
            DirSlot::Live(e) => Ok(Some(e)),
            _ => Ok(None),
        }
    }

    /// All live entries in slot order. A never-used slot terminates the
    /// scan; deleted and LFN slots are skipped.
    pub fn entries(&self) -> Result<Vec<(usize, DirEntry)>, FsError> {
        let mut out = Vec::new();
        for idx in 0..self.capacity() {
            match DirEntry::parse(&self.read_slot(idx)?) {
                DirSlot::NeverUsed => break,
                DirSlot::Deleted | DirSlot::LfnSkip => continue,
                DirSlot::Live(e) => out.push((idx, e)),
            }
        }
        Ok(out)
    }

    /// Finds a live entry by its normalised 11-byte name. Volume-label slots
    /// never match.
    pub fn find(&self, name11: [u8; 11]) -> Result<Option<(usize, DirEntry)>, FsError> {
        for (idx, entry) in self.entries()? {
            if entry.attr.volume_label() {
                continue;
            }
            if entry.name11() == name11 {
                return Ok(Some((idx, entry)));
            }
        }
        Ok(None)
    }

    /// Finds the volume-label slot, if any. Only meaningful on the root.
    pub fn find_label(&self) -> Result<Option<(usize, DirEntry)>, FsError> {
        for (idx, entry) in self.entries()? {
            if entry.attr.volume_label() {
                return Ok(Some((idx, entry)));
            }
        }
        Ok(None)
    }

    /// Writes `entry` into the first free slot, reusing deleted slots and
    /// extending a sub-directory's chain when every slot is taken. The root
    /// cannot grow and fails `DirFull` instead.
    pub fn insert(&mut self, entry: &DirEntry) -> Result<usize, FsError> {
        if !entry.attr.volume_label() {
            if self.find(entry.name11())?.is_some() {
                return Err(FsError::new(
                    ErrorKind::Exists,
                    format!("{} already exists", entry.display_name()),
                ));
            }
        }
        let idx = match self.first_free_slot()? {
            Some(idx) => idx,
            None => match self.loc {
                DirLocation::Root => {
                    return Err(FsError::new(ErrorKind::DirFull, "root directory is full"));
                }
                DirLocation::Chain(_) => self.grow()?,
            },
        };
        self.write_slot(idx, &entry.serialize())?;
        Ok(idx)
    }

    fn first_free_slot(&self) -> Result<Option<usize>, FsError> {
        for idx in 0..self.capacity() {
            let raw = self.read_slot(idx)?;
            if raw[0] == SLOT_NEVER_USED || raw[0] == SLOT_DELETED {
                return Ok(Some(idx));
            }
        }
        Ok(None)
    }

    /// Appends one zero-filled cluster to a sub-directory chain and returns
    /// the index of its first slot.
    fn grow(&mut self) -> Result<usize, FsError> {
        let tail = match self.chain.last() {
            Some(&c) => c,
            None => return Err(FsError::new(ErrorKind::CorruptDirectory, "empty directory chain")),
        };
        let first_new_slot = self.capacity();
        let cluster = self.fat.alloc_one()?;
        self.fat.zero_cluster(cluster)?;
        self.fat.set(tail, cluster)?;
        self.chain.push(cluster);
        Ok(first_new_slot)
    }

    /// Marks a slot deleted. The caller frees any associated chain
    /// afterwards; that order never leaves a live entry pointing at freed
    /// clusters.
    pub fn mark_deleted(&mut self, idx: usize) -> Result<(), FsError> {
        let mut raw = self.read_slot(idx)?;
        raw[0] = SLOT_DELETED;
        self.write_slot(idx, &raw)
    }

    /// Rewrites the stored entry at `idx`.
    pub fn update(&mut self, idx: usize, entry: &DirEntry) -> Result<(), FsError> {
        self.write_slot(idx, &entry.serialize())
    }

    /// Renames a live entry in place; the slot does not move.
    pub fn rename(&mut self, old11: [u8; 11], new11: [u8; 11]) -> Result<(), FsError> {
        if self.find(new11)?.is_some() {
            return Err(FsError::new(
                ErrorKind::Exists,
                "an entry with the new name already exists",
            ));
        }
        let (idx, mut entry) = self.find(old11)?.ok_or_else(|| {
            FsError::new(ErrorKind::NotFound, "no entry with the old name")
        })?;
        entry.name.copy_from_slice(&new11[0..8]);
        entry.ext.copy_from_slice(&new11[8..11]);
        self.update(idx, &entry)
    }

    /// True when the directory holds nothing but its `.`/`..` pair. The root
    /// is never considered empty.
    pub fn is_empty_subdir(&self) -> Result<bool, FsError> {
        if self.loc == DirLocation::Root {
            return Ok(false);
        }
        for (_, entry) in self.entries()? {
            if !entry.is_dot() && !entry.is_dotdot() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot_sector::BootSector;
    use crate::dir_entry::Attributes;
    use crate::image::FloppyImage;

    fn layout() -> BootSector {
        BootSector::new_1440(0, [b' '; 11])
    }

    fn entry(name11: &[u8; 11], cluster: u16, size: u32) -> DirEntry {
        DirEntry::new(*name11, Attributes::FILE, cluster, size)
    }

    #[test]
    fn root_insert_find_list() {
        let mut img = FloppyImage::new_blank();
        let bs = layout();
        let mut fat = FatTable::new(&mut img, &bs);
        let mut dir = Directory::open(&mut fat, DirLocation::Root).unwrap();
        dir.insert(&entry(b"FOO     TXT", 2, 12)).unwrap();
        dir.insert(&entry(b"BAR     TXT", 3, 7)).unwrap();
        let list = dir.entries().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].1.start_cluster, 2);
        assert_eq!(list[1].1.file_size, 7);
        let (idx, found) = dir.find(*b"BAR     TXT").unwrap().unwrap();
        assert_eq!(idx, 1);
        assert_eq!(found.file_size, 7);
        assert!(dir.find(*b"MISSING    ").unwrap().is_none());
    }

    #[test]
    fn insert_rejects_duplicates() {
        let mut img = FloppyImage::new_blank();
        let bs = layout();
        let mut fat = FatTable::new(&mut img, &bs);
        let mut dir = Directory::open(&mut fat, DirLocation::Root).unwrap();
        dir.insert(&entry(b"FOO     TXT", 2, 12)).unwrap();
        let err = dir.insert(&entry(b"FOO     TXT", 9, 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Exists);
    }

    #[test]
    fn deleted_slots_are_reused_first() {
        let mut img = FloppyImage::new_blank();
        let bs = layout();
        let mut fat = FatTable::new(&mut img, &bs);
        let mut dir = Directory::open(&mut fat, DirLocation::Root).unwrap();
        dir.insert(&entry(b"A       TXT", 2, 1)).unwrap();
        dir.insert(&entry(b"B       TXT", 3, 1)).unwrap();
        dir.insert(&entry(b"C       TXT", 4, 1)).unwrap();
        dir.mark_deleted(1).unwrap();
        let idx = dir.insert(&entry(b"D       TXT", 5, 1)).unwrap();
        assert_eq!(idx, 1);
    }

    #[test]
    fn root_fills_up_at_224() {
        let mut img = FloppyImage::new_blank();
        let bs = layout();
        let mut fat = FatTable::new(&mut img, &bs);
        let mut dir = Directory::open(&mut fat, DirLocation::Root).unwrap();
        for i in 0..224u32 {
            let mut name11 = *b"F       TXT";
            name11[1] = b'0' + (i / 100) as u8;
            name11[2] = b'0' + (i / 10 % 10) as u8;
            name11[3] = b'0' + (i % 10) as u8;
            dir.insert(&entry(&name11, 0, 0)).unwrap();
        }
        let err = dir.insert(&entry(b"LAST    TXT", 0, 0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DirFull);
    }

    #[test]
    fn rename_rewrites_in_place() {
        let mut img = FloppyImage::new_blank();
        let bs = layout();
        let mut fat = FatTable::new(&mut img, &bs);
        let mut dir = Directory::open(&mut fat, DirLocation::Root).unwrap();
        dir.insert(&entry(b"OLD     TXT", 2, 5)).unwrap();
        dir.insert(&entry(b"OTHER   TXT", 3, 5)).unwrap();
        dir.rename(*b"OLD     TXT", *b"NEW     TXT").unwrap();
        let (idx, e) = dir.find(*b"NEW     TXT").unwrap().unwrap();
        assert_eq!(idx, 0);
        assert_eq!(e.start_cluster, 2);
        let err = dir.rename(*b"NEW     TXT", *b"OTHER   TXT").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Exists);
    }

    #[test]
    fn subdir_without_dot_pair_is_corrupt() {
        let mut img = FloppyImage::new_blank();
        let bs = layout();
        let mut fat = FatTable::new(&mut img, &bs);
        let cluster = fat.alloc_one().unwrap();
        fat.zero_cluster(cluster).unwrap();
        let err = Directory::open(&mut fat, DirLocation::Chain(cluster)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptDirectory);
    }

    #[test]
    fn full_subdir_grows_by_one_cluster() {
        let mut img = FloppyImage::new_blank();
        let bs = layout();
        let mut fat = FatTable::new(&mut img, &bs);
        let cluster = fat.alloc_one().unwrap();
        fat.zero_cluster(cluster).unwrap();
        {
            let mut dir = Directory {
                fat: &mut fat,
                loc: DirLocation::Chain(cluster),
                chain: vec![cluster],
            };
            dir.write_slot(0, &DirEntry::new(DOT_NAME, Attributes::DIRECTORY, cluster, 0).serialize())
                .unwrap();
            dir.write_slot(1, &DirEntry::new(DOTDOT_NAME, Attributes::DIRECTORY, 0, 0).serialize())
                .unwrap();
        }
        let mut dir = Directory::open(&mut fat, DirLocation::Chain(cluster)).unwrap();
        assert_eq!(dir.capacity(), 16);
        for i in 0..14u8 {
            let mut name11 = *b"FILE_A  BIN";
            name11[5] = b'A' + i;
            dir.insert(&entry(&name11, 0, 0)).unwrap();
        }
        // the sixteen slots are full now; one more forces a second cluster
        let idx = dir.insert(&entry(b"OVERFLOWBIN", 0, 0)).unwrap();
        assert_eq!(idx, 16);
        assert_eq!(dir.capacity(), 32);
    }

    #[test]
    fn emptiness_check_ignores_dot_entries() {
        let mut img = FloppyImage::new_blank();
        let bs = layout();
        let mut fat = FatTable::new(&mut img, &bs);
        let cluster = fat.alloc_one().unwrap();
        fat.zero_cluster(cluster).unwrap();
        {
            let mut dir = Directory {
                fat: &mut fat,
                loc: DirLocation::Chain(cluster),
                chain: vec![cluster],
            };
            dir.write_slot(0, &DirEntry::new(DOT_NAME, Attributes::DIRECTORY, cluster, 0).serialize())
                .unwrap();
            dir.write_slot(1, &DirEntry::new(DOTDOT_NAME, Attributes::DIRECTORY, 0, 0).serialize())
                .unwrap();
        }
        let mut dir = Directory::open(&mut fat, DirLocation::Chain(cluster)).unwrap();
        assert!(dir.is_empty_subdir().unwrap());
        dir.insert(&entry(b"A       TXT", 0, 0)).unwrap();
        assert!(!dir.is_empty_subdir().unwrap());
    }
}
