use crate::error::FsError;

/// Minimal sector-addressed device trait used by the FAT modules.
///
/// Implementations must reject reads and writes that are not exactly one
/// 512-byte sector, and sector numbers past the end of the device.
pub trait BlockDevice {
    /// Read exactly 512 bytes from LBA into `buf`.
    fn read_sector(&self, lba: u64, buf: &mut [u8]) -> Result<(), FsError>;
    /// Write exactly 512 bytes from `data` into LBA.
    fn write_sector(&mut self, lba: u64, data: &[u8]) -> Result<(), FsError>;
    /// Number of 512-byte sectors on this device.
    fn sector_count(&self) -> u64;
}
