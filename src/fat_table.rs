use log::debug;

use crate::block_device::BlockDevice;
use crate::boot_sector::BootSector;
use crate::error::{ErrorKind, FsError};
use crate::fat_constants::*;

/// View over the two packed 12-bit allocation tables.
///
/// All reads come from FAT1; every `set` writes both copies, so the tables
/// stay byte-identical without a deferred flush. Callers that also need data
/// or directory sector IO while holding the table go through the
/// `read_data_sector`/`write_data_sector` passthroughs.
pub struct FatTable<'a, D: BlockDevice> {
    device: &'a mut D,
    layout: BootSector,
}

impl<'a, D: BlockDevice> std::fmt::Debug for FatTable<'a, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FatTable")
            .field("layout", &self.layout)
            .finish()
    }
}

impl<'a, D: BlockDevice> FatTable<'a, D> {
    pub fn new(device: &'a mut D, layout: &BootSector) -> Self {
        FatTable {
            device,
            layout: *layout,
        }
    }

    pub fn layout(&self) -> &BootSector {
        &self.layout
    }

    fn check_index(&self, cluster: u16) -> Result<(), FsError> {
        if cluster >= FAT_ENTRIES {
            return Err(FsError::new(
                ErrorKind::BadCluster,
                format!("FAT entry {} out of range 0..{}", cluster, FAT_ENTRIES),
            ));
        }
        Ok(())
    }

    fn read_byte(&self, off: usize) -> Result<u8, FsError> {
        let mut buf = [0u8; BYTES_PER_SECTOR];
        self.device
            .read_sector(self.layout.fat_start_lba + (off / BYTES_PER_SECTOR) as u64, &mut buf)?;
        Ok(buf[off % BYTES_PER_SECTOR])
    }

    fn write_byte(&mut self, off: usize, value: u8) -> Result<(), FsError> {
        let sector = (off / BYTES_PER_SECTOR) as u64;
        let mut buf = [0u8; BYTES_PER_SECTOR];
        self.device
            .read_sector(self.layout.fat_start_lba + sector, &mut buf)?;
        buf[off % BYTES_PER_SECTOR] = value;
        self.device
            .write_sector(self.layout.fat_start_lba + sector, &buf)?;
        self.device
            .write_sector(self.layout.fat2_start_lba + sector, &buf)?;
        Ok(())
    }

    /// Reads the 12-bit entry for `cluster` from FAT1.
    pub fn get(&self, cluster: u16) -> Result<u16, FsError> {
        self.check_index(cluster)?;
        let off = cluster as usize * 3 / 2;
        let word = u16::from_le_bytes([self.read_byte(off)?, self.read_byte(off + 1)?]);
        Ok(if cluster & 1 == 0 {
            word & 0x0FFF
        } else {
            word >> 4
        })
    }

    /// Writes the 12-bit entry for `cluster` into both FAT copies.
    pub fn set(&mut self, cluster: u16, value: u16) -> Result<(), FsError> {
        self.check_index(cluster)?;
        let off = cluster as usize * 3 / 2;
        let word = u16::from_le_bytes([self.read_byte(off)?, self.read_byte(off + 1)?]);
        let word = if cluster & 1 == 0 {
            (word & 0xF000) | (value & 0x0FFF)
        } else {
            (word & 0x000F) | ((value & 0x0FFF) << 4)
        };
        let [b0, b1] = word.to_le_bytes();
        self.write_byte(off, b0)?;
        self.write_byte(off + 1, b1)?;
        Ok(())
    }

    /// Allocates the first free cluster (first-fit from cluster 2) and marks
    /// it end-of-chain.
    pub fn alloc_one(&mut self) -> Result<u16, FsError> {
        for n in FIRST_DATA_CLUSTER..=MAX_DATA_CLUSTER {
            if self.get(n)? == FAT_FREE {
                self.set(n, FAT_EOC)?;
                return Ok(n);
            }
        }
        debug!("cluster allocation failed: no free clusters");
        Err(FsError::new(ErrorKind::NoSpace, "no free clusters"))
    }

    /// Allocates `count` clusters linked into a chain; the last one is
    /// end-of-chain. On failure mid-way every cluster allocated so far is
    /// freed again before the error is returned.
    pub fn alloc_chain(&mut self, count: usize) -> Result<Vec<u16>, FsError> {
        let mut clusters: Vec<u16> = Vec::with_capacity(count);
        for _ in 0..count {
            match self.alloc_one() {
                Ok(c) => {
                    if let Some(&prev) = clusters.last() {
                        self.set(prev, c)?;
                    }
                    clusters.push(c);
                }
                Err(e) => {
                    for &c in &clusters {
                        self.set(c, FAT_FREE)?;
                    }
                    return Err(e);
                }
            }
        }
        Ok(clusters)
    }

    /// Allocates `add` clusters and appends them to the chain at `start`.
    /// Returns the new clusters.
    pub fn extend(&mut self, start: u16, add: usize) -> Result<Vec<u16>, FsError> {
        if add == 0 {
            return Ok(Vec::new());
        }
        let chain = self.walk(start)?;
        let tail = *chain.last().unwrap();
        let new = self.alloc_chain(add)?;
        self.set(tail, new[0])?;
        Ok(new)
    }

    /// Follows the chain from `start` to its end-of-chain marker and returns
    /// every cluster in order.
    pub fn walk(&self, start: u16) -> Result<Vec<u16>, FsError> {
        if !(FIRST_DATA_CLUSTER..=MAX_DATA_CLUSTER).contains(&start) {
            return Err(FsError::new(
                ErrorKind::BadCluster,
                format!("chain starts at cluster {}", start),
            ));
        }
        let mut chain = vec![start];
        let mut cur = start;
        loop {
            let next = self.get(cur)?;
            if next >= FAT_EOC_MIN {
                break;
            }
            if !(FIRST_DATA_CLUSTER..=MAX_DATA_CLUSTER).contains(&next) {
                return Err(FsError::new(
                    ErrorKind::BadChain,
                    format!("cluster {} links to {:#05x}", cur, next),
                ));
            }
            chain.push(next);
            // a chain longer than the data region must revisit a cluster
            if chain.len() > DATA_CLUSTERS as usize {
                return Err(FsError::new(ErrorKind::BadChain, "cluster chain does not terminate"));
            }
            cur = next;
        }
        Ok(chain)
    }

    /// Frees every cluster in the chain at `start`.
    pub fn free_chain(&mut self, start: u16) -> Result<(), FsError> {
        for c in self.walk(start)? {
            self.set(c, FAT_FREE)?;
        }
        Ok(())
    }

    /// Keeps the first `keep` clusters of the chain and frees the rest. With
    /// `keep == 0` the whole chain is freed and the caller must clear the
    /// directory entry's start cluster.
    pub fn truncate(&mut self, start: u16, keep: usize) -> Result<(), FsError> {
        let chain = self.walk(start)?;
        if keep >= chain.len() {
            return Ok(());
        }
        if keep > 0 {
            self.set(chain[keep - 1], FAT_EOC)?;
        }
        for &c in &chain[keep..] {
            self.set(c, FAT_FREE)?;
        }
        Ok(())
    }

    /// Copies FAT1 over FAT2 wholesale.
    pub fn remirror(&mut self) -> Result<(), FsError> {
        for s in 0..self.layout.sectors_per_fat as u64 {
            let mut buf = [0u8; BYTES_PER_SECTOR];
            self.device.read_sector(self.layout.fat_start_lba + s, &mut buf)?;
            self.device.write_sector(self.layout.fat2_start_lba + s, &buf)?;
        }
        Ok(())
    }

    /// Deterministic read-only mirror check: true when FAT1 == FAT2
    /// byte-for-byte.
    pub fn fats_identical(&self) -> Result<bool, FsError> {
        for s in 0..self.layout.sectors_per_fat as u64 {
            let mut a = [0u8; BYTES_PER_SECTOR];
            let mut b = [0u8; BYTES_PER_SECTOR];
            self.device.read_sector(self.layout.fat_start_lba + s, &mut a)?;
            self.device.read_sector(self.layout.fat2_start_lba + s, &mut b)?;
            if a != b {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn check_data_cluster(&self, cluster: u16) -> Result<(), FsError> {
        if !(FIRST_DATA_CLUSTER..=MAX_DATA_CLUSTER).contains(&cluster) {
            return Err(FsError::new(
                ErrorKind::BadCluster,
                format!("cluster {} outside data region", cluster),
            ));
        }
        Ok(())
    }

    /// Reads a raw sector through the device borrowed by the table.
    pub fn read_data_sector(&self, lba: u64, buf: &mut [u8]) -> Result<(), FsError> {
        self.device.read_sector(lba, buf)
    }

    /// Writes a raw sector through the device borrowed by the table.
    pub fn write_data_sector(&mut self, lba: u64, data: &[u8]) -> Result<(), FsError> {
        self.device.write_sector(lba, data)
    }

    /// Reads a data cluster's sector by cluster number.
    pub fn read_cluster(&self, cluster: u16) -> Result<[u8; BYTES_PER_SECTOR], FsError> {
        self.check_data_cluster(cluster)?;
        let mut buf = [0u8; BYTES_PER_SECTOR];
        self.device.read_sector(self.layout.cluster_lba(cluster), &mut buf)?;
        Ok(buf)
    }

    /// Writes a data cluster's sector by cluster number.
    pub fn write_cluster(&mut self, cluster: u16, data: &[u8]) -> Result<(), FsError> {
        self.check_data_cluster(cluster)?;
        self.device.write_sector(self.layout.cluster_lba(cluster), data)
    }

    /// Zero-fills a data cluster.
    pub fn zero_cluster(&mut self, cluster: u16) -> Result<(), FsError> {
        self.write_cluster(cluster, &[0u8; BYTES_PER_SECTOR])
    }
}
