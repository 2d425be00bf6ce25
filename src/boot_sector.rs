use crate::error::{ErrorKind, FsError};
use crate::fat_constants::*;

// Non-bootable bootstrap stub: prints the message below via INT 10h, waits
// for a key, then reboots. Lives at offset 0x3E, right after the EBPB.
const BOOT_CODE_OFFSET: usize = 0x3E;
const BOOT_CODE: [u8; 29] = [
    0x0E, 0x1F, 0xBE, 0x5B, 0x7C, 0xAC, 0x20, 0xC0, 0x74, 0x0B, 0x56, 0xB4, 0x0E, 0xBB, 0x07,
    0x00, 0xCD, 0x10, 0x5E, 0xEB, 0xF0, 0x31, 0xC0, 0xCD, 0x16, 0xCD, 0x19, 0xEB, 0xFC,
];
const BOOT_MESSAGE_OFFSET: usize = 0x5B;
const BOOT_MESSAGE: &[u8] =
    b"\r\nThis is not a bootable floppy.\r\nPlease remove this disk and press any key...\r\n\0";

pub const DEFAULT_OEM_NAME: [u8; 8] = *b"PYFAT12 ";
pub const FS_TYPE_FAT12: [u8; 8] = *b"FAT12   ";
const FS_TYPE_FAT: [u8; 8] = *b"FAT     ";

/// Parsed boot sector: the BPB, the extended BPB, and the derived region
/// offsets for the fixed 1.44 MB geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootSector {
    pub oem_name: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub max_root_dir_entries: u16,
    pub total_sectors: u16,
    pub media_descriptor: u8,
    pub sectors_per_fat: u16,
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
    pub total_sectors_large: u32,
    pub drive_number: u8,
    pub ebpb_flags: u8,
    pub has_ebpb: bool,
    pub volume_serial: u32,
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],
    // derived
    pub fat_start_lba: u64,
    pub fat2_start_lba: u64,
    pub root_dir_start_lba: u64,
    pub data_start_lba: u64,
}

fn geometry_err(field: &str, found: impl core::fmt::Display, expected: impl core::fmt::Display) -> FsError {
    FsError::new(
        ErrorKind::UnsupportedGeometry,
        format!("{} is {}, expected {}", field, found, expected),
    )
}

impl BootSector {
    /// A fresh boot sector for a 1.44 MB floppy with the given serial and
    /// (space-padded) label copy.
    pub fn new_1440(volume_serial: u32, volume_label: [u8; 11]) -> Self {
        BootSector {
            oem_name: DEFAULT_OEM_NAME,
            bytes_per_sector: BYTES_PER_SECTOR as u16,
            sectors_per_cluster: SECTORS_PER_CLUSTER,
            reserved_sectors: RESERVED_SECTORS,
            num_fats: NUM_FATS,
            max_root_dir_entries: MAX_ROOT_DIR_ENTRIES,
            total_sectors: TOTAL_SECTORS,
            media_descriptor: MEDIA_DESCRIPTOR,
            sectors_per_fat: SECTORS_PER_FAT,
            sectors_per_track: SECTORS_PER_TRACK,
            num_heads: NUM_HEADS,
            hidden_sectors: 0,
            total_sectors_large: 0,
            drive_number: 0,
            ebpb_flags: 0,
            has_ebpb: true,
            volume_serial,
            volume_label,
            fs_type: FS_TYPE_FAT12,
            fat_start_lba: FAT1_START_LBA,
            fat2_start_lba: FAT2_START_LBA,
            root_dir_start_lba: ROOT_DIR_START_LBA,
            data_start_lba: DATA_START_LBA,
        }
    }

    /// Parses a boot sector, validating the fixed 1.44 MB geometry.
    pub fn parse(buf: &[u8]) -> Result<Self, FsError> {
        if buf.len() < BYTES_PER_SECTOR {
            return Err(FsError::new(
                ErrorKind::BadImage,
                format!("boot sector is {} bytes", buf.len()),
            ));
        }
        if buf[BOOT_SIG_OFFSET] != BOOT_SIG_LEAD || buf[BOOT_SIG_OFFSET + 1] != BOOT_SIG_TRAIL {
            return Err(FsError::new(
                ErrorKind::BadImage,
                "missing 0x55AA boot signature",
            ));
        }

        let mut oem_name = [0u8; 8];
        oem_name.copy_from_slice(&buf[3..11]);
        let bytes_per_sector = u16::from_le_bytes([buf[11], buf[12]]);
        let sectors_per_cluster = buf[13];
        let reserved_sectors = u16::from_le_bytes([buf[14], buf[15]]);
        let num_fats = buf[16];
        let max_root_dir_entries = u16::from_le_bytes([buf[17], buf[18]]);
        let total_sectors = u16::from_le_bytes([buf[19], buf[20]]);
        let media_descriptor = buf[21];
        let sectors_per_fat = u16::from_le_bytes([buf[22], buf[23]]);
        let sectors_per_track = u16::from_le_bytes([buf[24], buf[25]]);
        let num_heads = u16::from_le_bytes([buf[26], buf[27]]);
        let hidden_sectors = u32::from_le_bytes([buf[28], buf[29], buf[30], buf[31]]);
        let total_sectors_large = u32::from_le_bytes([buf[32], buf[33], buf[34], buf[35]]);
        let drive_number = buf[36];
        let ebpb_flags = buf[37];

        if bytes_per_sector != BYTES_PER_SECTOR as u16 {
            return Err(geometry_err("bytes per sector", bytes_per_sector, BYTES_PER_SECTOR));
        }
        if sectors_per_cluster != SECTORS_PER_CLUSTER {
            return Err(geometry_err("sectors per cluster", sectors_per_cluster, SECTORS_PER_CLUSTER));
        }
        if reserved_sectors != RESERVED_SECTORS {
            return Err(geometry_err("reserved sectors", reserved_sectors, RESERVED_SECTORS));
        }
        if num_fats != NUM_FATS {
            return Err(geometry_err("FAT count", num_fats, NUM_FATS));
        }
        if max_root_dir_entries != MAX_ROOT_DIR_ENTRIES {
            return Err(geometry_err("root entries", max_root_dir_entries, MAX_ROOT_DIR_ENTRIES));
        }
        if total_sectors != TOTAL_SECTORS {
            return Err(geometry_err("total sectors", total_sectors, TOTAL_SECTORS));
        }
        if media_descriptor != MEDIA_DESCRIPTOR {
            return Err(geometry_err("media descriptor", media_descriptor, MEDIA_DESCRIPTOR));
        }
        if sectors_per_fat != SECTORS_PER_FAT {
            return Err(geometry_err("sectors per FAT", sectors_per_fat, SECTORS_PER_FAT));
        }

        let has_ebpb = buf[38] == 0x29;
        let (volume_serial, volume_label, fs_type) = if has_ebpb {
            let serial = u32::from_le_bytes([buf[39], buf[40], buf[41], buf[42]]);
            let mut label = [0u8; 11];
            label.copy_from_slice(&buf[43..54]);
            let mut fs_type = [0u8; 8];
            fs_type.copy_from_slice(&buf[54..62]);
            if fs_type != FS_TYPE_FAT12 && fs_type != FS_TYPE_FAT {
                return Err(FsError::new(
                    ErrorKind::UnsupportedGeometry,
                    format!("file system type {:?}", String::from_utf8_lossy(&fs_type)),
                ));
            }
            (serial, label, fs_type)
        } else {
            (0, [b' '; 11], FS_TYPE_FAT12)
        };

        let fat_start_lba = reserved_sectors as u64;
        let fat2_start_lba = fat_start_lba + sectors_per_fat as u64;
        let root_dir_start_lba = fat_start_lba + num_fats as u64 * sectors_per_fat as u64;
        let root_dir_sectors = (max_root_dir_entries as u64 * DIR_ENTRY_SIZE as u64)
            / BYTES_PER_SECTOR as u64;
        let data_start_lba = root_dir_start_lba + root_dir_sectors;

        Ok(BootSector {
            oem_name,
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            num_fats,
            max_root_dir_entries,
            total_sectors,
            media_descriptor,
            sectors_per_fat,
            sectors_per_track,
            num_heads,
            hidden_sectors,
            total_sectors_large,
            drive_number,
            ebpb_flags,
            has_ebpb,
            volume_serial,
            volume_label,
            fs_type,
            fat_start_lba,
            fat2_start_lba,
            root_dir_start_lba,
            data_start_lba,
        })
    }

    /// Writes the OEM name, BPB, EBPB and boot signature into `buf`.
    ///
    /// Bootstrap code bytes already in `buf` are left alone so re-serialising
    /// an opened image (for a label change, say) does not disturb them.
    pub fn serialize(&self, buf: &mut [u8]) -> Result<(), FsError> {
        if buf.len() < BYTES_PER_SECTOR {
            return Err(FsError::new(
                ErrorKind::BadSize,
                format!("boot sector buffer is {} bytes", buf.len()),
            ));
        }
        buf[3..11].copy_from_slice(&self.oem_name);
        buf[11..13].copy_from_slice(&self.bytes_per_sector.to_le_bytes());
        buf[13] = self.sectors_per_cluster;
        buf[14..16].copy_from_slice(&self.reserved_sectors.to_le_bytes());
        buf[16] = self.num_fats;
        buf[17..19].copy_from_slice(&self.max_root_dir_entries.to_le_bytes());
        buf[19..21].copy_from_slice(&self.total_sectors.to_le_bytes());
        buf[21] = self.media_descriptor;
        buf[22..24].copy_from_slice(&self.sectors_per_fat.to_le_bytes());
        buf[24..26].copy_from_slice(&self.sectors_per_track.to_le_bytes());
        buf[26..28].copy_from_slice(&self.num_heads.to_le_bytes());
        buf[28..32].copy_from_slice(&self.hidden_sectors.to_le_bytes());
        buf[32..36].copy_from_slice(&self.total_sectors_large.to_le_bytes());
        buf[36] = self.drive_number;
        buf[37] = self.ebpb_flags;
        if self.has_ebpb {
            buf[38] = 0x29;
            buf[39..43].copy_from_slice(&self.volume_serial.to_le_bytes());
            buf[43..54].copy_from_slice(&self.volume_label);
            buf[54..62].copy_from_slice(&self.fs_type);
        }
        buf[BOOT_SIG_OFFSET] = BOOT_SIG_LEAD;
        buf[BOOT_SIG_OFFSET + 1] = BOOT_SIG_TRAIL;
        Ok(())
    }

    /// Writes the jump instruction and the non-bootable stub into a fresh
    /// boot sector buffer. Only `format` calls this.
    pub fn write_bootstrap(buf: &mut [u8]) {
        buf[0] = 0xEB;
        buf[1] = 0x3C;
        buf[2] = 0x90;
        buf[BOOT_CODE_OFFSET..BOOT_CODE_OFFSET + BOOT_CODE.len()].copy_from_slice(&BOOT_CODE);
        buf[BOOT_MESSAGE_OFFSET..BOOT_MESSAGE_OFFSET + BOOT_MESSAGE.len()]
            .copy_from_slice(BOOT_MESSAGE);
    }

    /// Maps a data cluster number to its LBA. Cluster 2 is the first data
    /// sector.
    pub fn cluster_lba(&self, cluster: u16) -> u64 {
        self.data_start_lba
            + (cluster as u64 - FIRST_DATA_CLUSTER as u64) * self.sectors_per_cluster as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_parse_round_trip() {
        let bs = BootSector::new_1440(0xDEAD_BEEF, *b"MYDISK     ");
        let mut buf = [0u8; 512];
        BootSector::write_bootstrap(&mut buf);
        bs.serialize(&mut buf).unwrap();
        let parsed = BootSector::parse(&buf).unwrap();
        assert_eq!(parsed, bs);
        assert_eq!(parsed.volume_serial, 0xDEAD_BEEF);
        assert_eq!(&buf[43..54], b"MYDISK     ");
        assert_eq!(&buf[54..62], b"FAT12   ");
    }

    #[test]
    fn derived_offsets_match_1440_layout() {
        let bs = BootSector::new_1440(0, [b' '; 11]);
        assert_eq!(bs.fat_start_lba, 1);
        assert_eq!(bs.fat2_start_lba, 10);
        assert_eq!(bs.root_dir_start_lba, 19);
        assert_eq!(bs.data_start_lba, 33);
        assert_eq!(bs.cluster_lba(2), 33);
        assert_eq!(bs.cluster_lba(2848), 2879);
    }

    #[test]
    fn missing_signature_is_bad_image() {
        let mut buf = [0u8; 512];
        let bs = BootSector::new_1440(0, [b' '; 11]);
        bs.serialize(&mut buf).unwrap();
        buf[510] = 0;
        let err = BootSector::parse(&buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadImage);
    }

    #[test]
    fn wrong_geometry_is_rejected() {
        let mut buf = [0u8; 512];
        let bs = BootSector::new_1440(0, [b' '; 11]);
        bs.serialize(&mut buf).unwrap();
        buf[13] = 2; // two sectors per cluster
        let err = BootSector::parse(&buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedGeometry);
    }

    #[test]
    fn bootstrap_jump_and_message_are_in_place() {
        let mut buf = [0u8; 512];
        BootSector::write_bootstrap(&mut buf);
        assert_eq!(&buf[0..3], &[0xEB, 0x3C, 0x90]);
        let msg = &buf[BOOT_MESSAGE_OFFSET..BOOT_MESSAGE_OFFSET + 32];
        assert!(msg.starts_with(b"\r\nThis is not a bootable floppy."));
    }
}
