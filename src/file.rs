use crate::block_device::BlockDevice;
use crate::dir_entry::{DirEntry, DirSlot};
use crate::directory::{DirLocation, Directory};
use crate::error::{ErrorKind, FsError};
use crate::fat_constants::*;
use crate::fat_table::FatTable;
use crate::fs::FileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Truncates an existing file on open; creates the file if absent.
    Write,
    /// Creates the file if absent; the cursor starts at end-of-file.
    Append,
}

/// Positioned reader/writer over one directory slot.
///
/// The handle borrows the file system exclusively, so the entry it points at
/// cannot be deleted or renamed underneath it. Clusters are allocated one at
/// a time as writes pass the end of the chain; the directory entry's size
/// and timestamp are written back on `flush`/`close` (and on drop as a last
/// resort).
pub struct FileHandle<'h, 'a, D: BlockDevice> {
    fs: &'h mut FileSystem<'a, D>,
    dir: DirLocation,
    slot: usize,
    mode: OpenMode,
    pos: u64,
    size: u32,
    start_cluster: u16,
    chain: Vec<u16>,
    chain_loaded: bool,
    dirty: bool,
}

impl<'h, 'a, D: BlockDevice> std::fmt::Debug for FileHandle<'h, 'a, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("dir", &self.dir)
            .field("slot", &self.slot)
            .field("mode", &self.mode)
            .field("pos", &self.pos)
            .field("size", &self.size)
            .field("start_cluster", &self.start_cluster)
            .field("chain", &self.chain)
            .field("chain_loaded", &self.chain_loaded)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl<'h, 'a, D: BlockDevice> FileHandle<'h, 'a, D> {
    pub(crate) fn new(
        fs: &'h mut FileSystem<'a, D>,
        dir: DirLocation,
        slot: usize,
        mode: OpenMode,
    ) -> Result<Self, FsError> {
        let entry = {
            let mut fat = FatTable::new(&mut *fs.device, &fs.boot_sector);
            let view = Directory::open(&mut fat, dir)?;
            match DirEntry::parse(&view.read_slot(slot)?) {
                DirSlot::Live(e) => e,
                _ => {
                    return Err(FsError::new(
                        ErrorKind::Invalidated,
                        "directory slot is no longer live",
                    ))
                }
            }
        };
        let pos = match mode {
            OpenMode::Append => entry.file_size as u64,
            _ => 0,
        };
        Ok(FileHandle {
            fs,
            dir,
            slot,
            mode,
            pos,
            size: entry.file_size,
            start_cluster: entry.start_cluster,
            chain: Vec::new(),
            chain_loaded: false,
            dirty: false,
        })
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn len(&self) -> u32 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Moves the cursor. Seeking past end-of-file is refused; FAT12 has no
    /// sparse files.
    pub fn seek(&mut self, pos: u64) -> Result<u64, FsError> {
        if pos > self.size as u64 {
            return Err(FsError::new(
                ErrorKind::OutOfRange,
                format!("seek to {} past end of {} byte file", pos, self.size),
            ));
        }
        self.pos = pos;
        Ok(pos)
    }

    fn ensure_chain(&mut self) -> Result<(), FsError> {
        if !self.chain_loaded {
            self.chain = if self.start_cluster >= FIRST_DATA_CLUSTER {
                FatTable::new(&mut *self.fs.device, &self.fs.boot_sector).walk(self.start_cluster)?
            } else {
                Vec::new()
            };
            self.chain_loaded = true;
        }
        Ok(())
    }

    /// Reads up to `buf.len()` bytes from the cursor, stopping at
    /// end-of-file. Returns the number of bytes read.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        self.ensure_chain()?;
        let end = (self.size as u64).min(self.pos + buf.len() as u64);
        let mut done = 0usize;
        while self.pos < end {
            let idx = (self.pos / BYTES_PER_SECTOR as u64) as usize;
            let within = (self.pos % BYTES_PER_SECTOR as u64) as usize;
            let n = (BYTES_PER_SECTOR - within).min((end - self.pos) as usize);
            let cluster = match self.chain.get(idx) {
                Some(&c) => c,
                None => {
                    return Err(FsError::new(
                        ErrorKind::BadChain,
                        "file data ends before its recorded size",
                    ))
                }
            };
            let fat = FatTable::new(&mut *self.fs.device, &self.fs.boot_sector);
            let sector = fat.read_cluster(cluster)?;
            buf[done..done + n].copy_from_slice(&sector[within..within + n]);
            done += n;
            self.pos += n as u64;
        }
        Ok(done)
    }

    /// Reads from the cursor to end-of-file.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>, FsError> {
        let remaining = (self.size as u64).saturating_sub(self.pos) as usize;
        let mut buf = vec![0u8; remaining];
        let n = self.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Writes all of `data` at the cursor, allocating one cluster at a time
    /// as the write passes the end of the chain.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, FsError> {
        if self.mode == OpenMode::Read {
            return Err(FsError::new(
                ErrorKind::Invalidated,
                "handle is not open for writing",
            ));
        }
        if data.is_empty() {
            return Ok(0);
        }
        if self.pos + data.len() as u64 > MAX_FILE_BYTES {
            return Err(FsError::new(
                ErrorKind::NoSpace,
                format!("write would exceed the {} byte maximum", MAX_FILE_BYTES),
            ));
        }
        self.ensure_chain()?;
        let mut done = 0usize;
        while done < data.len() {
            let idx = (self.pos / BYTES_PER_SECTOR as u64) as usize;
            let within = (self.pos % BYTES_PER_SECTOR as u64) as usize;
            if idx == self.chain.len() {
                let mut fat = FatTable::new(&mut *self.fs.device, &self.fs.boot_sector);
                let cluster = fat.alloc_one()?;
                fat.zero_cluster(cluster)?;
                match self.chain.last() {
                    Some(&tail) => fat.set(tail, cluster)?,
                    None => self.start_cluster = cluster,
                }
                self.chain.push(cluster);
            }
            let cluster = self.chain[idx];
            let n = (BYTES_PER_SECTOR - within).min(data.len() - done);
            let mut fat = FatTable::new(&mut *self.fs.device, &self.fs.boot_sector);
            let mut sector = fat.read_cluster(cluster)?;
            sector[within..within + n].copy_from_slice(&data[done..done + n]);
            fat.write_cluster(cluster, &sector)?;
            done += n;
            self.pos += n as u64;
            if self.pos > self.size as u64 {
                self.size = self.pos as u32;
            }
        }
        self.dirty = true;
        Ok(done)
    }

    /// Writes the directory entry's size, start cluster and timestamp back.
    /// FAT entries are already on disk; this is the only deferred write.
    pub fn flush(&mut self) -> Result<(), FsError> {
        if !self.dirty {
            return Ok(());
        }
        let now = self.fs.now();
        let mut fat = FatTable::new(&mut *self.fs.device, &self.fs.boot_sector);
        let mut dir = Directory::open(&mut fat, self.dir)?;
        match DirEntry::parse(&dir.read_slot(self.slot)?) {
            DirSlot::Live(mut e) => {
                e.start_cluster = self.start_cluster;
                e.file_size = self.size;
                dir.update(self.slot, &e.with_modified(now))?;
                self.dirty = false;
                Ok(())
            }
            _ => Err(FsError::new(
                ErrorKind::Invalidated,
                "directory slot is no longer live",
            )),
        }
    }

    /// Flushes and consumes the handle.
    pub fn close(mut self) -> Result<(), FsError> {
        self.flush()
    }
}

impl<'h, 'a, D: BlockDevice> Drop for FileHandle<'h, 'a, D> {
    fn drop(&mut self) {
        if self.dirty {
            let _ = self.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot_sector::BootSector;
    use crate::clock::FixedClock;
    use crate::image::FloppyImage;
    use chrono::NaiveDate;

    fn clock() -> Box<FixedClock> {
        Box::new(FixedClock(
            NaiveDate::from_ymd_opt(1997, 3, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        ))
    }

    #[test]
    fn write_then_read_through_handles() {
        let mut img = FloppyImage::new_blank();
        let mut fs = FileSystem::format_with(&mut img, "", Some(1), clock()).unwrap();
        {
            let mut f = fs.open("/LOG.TXT", OpenMode::Write).unwrap();
            f.write(b"first line\n").unwrap();
            f.write(b"second line\n").unwrap();
            f.close().unwrap();
        }
        assert_eq!(fs.read_file("/LOG.TXT").unwrap(), b"first line\nsecond line\n");
        let mut f = fs.open("/LOG.TXT", OpenMode::Read).unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(f.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"first");
        f.seek(11).unwrap();
        assert_eq!(f.read_to_end().unwrap(), b"second line\n");
    }

    #[test]
    fn append_positions_at_end() {
        let mut img = FloppyImage::new_blank();
        let mut fs = FileSystem::format_with(&mut img, "", Some(1), clock()).unwrap();
        fs.write_file("/A.TXT", b"abc").unwrap();
        {
            let mut f = fs.open("/A.TXT", OpenMode::Append).unwrap();
            assert_eq!(f.position(), 3);
            f.write(b"def").unwrap();
            f.close().unwrap();
        }
        assert_eq!(fs.read_file("/A.TXT").unwrap(), b"abcdef");
    }

    #[test]
    fn writes_grow_one_cluster_at_a_time() {
        let mut img = FloppyImage::new_blank();
        let mut fs = FileSystem::format_with(&mut img, "", Some(1), clock()).unwrap();
        let mut f = fs.open("/BIG.BIN", OpenMode::Write).unwrap();
        f.write(&[0xAAu8; 512]).unwrap();
        f.write(&[0xBBu8; 1]).unwrap();
        f.close().unwrap();
        let info = fs.stat("/BIG.BIN").unwrap();
        assert_eq!(info.size, 513);
        assert_eq!(info.start_cluster, 2);
        let fat = FatTable::new(&mut img, &BootSector::new_1440(0, [b' '; 11]));
        assert_eq!(fat.walk(2).unwrap().len(), 2);
    }

    #[test]
    fn read_mode_refuses_writes() {
        let mut img = FloppyImage::new_blank();
        let mut fs = FileSystem::format_with(&mut img, "", Some(1), clock()).unwrap();
        fs.write_file("/A.TXT", b"abc").unwrap();
        let mut f = fs.open("/A.TXT", OpenMode::Read).unwrap();
        let err = f.write(b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalidated);
    }

    #[test]
    fn seek_past_end_is_refused() {
        let mut img = FloppyImage::new_blank();
        let mut fs = FileSystem::format_with(&mut img, "", Some(1), clock()).unwrap();
        fs.write_file("/A.TXT", b"abc").unwrap();
        let mut f = fs.open("/A.TXT", OpenMode::Read).unwrap();
        assert_eq!(f.seek(4).unwrap_err().kind(), ErrorKind::OutOfRange);
    }
}
