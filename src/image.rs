use std::fs;
use std::io::Write;
use std::path::Path;

use log::debug;

use crate::block_device::BlockDevice;
use crate::error::{ErrorKind, FsError};
use crate::fat_constants::{BYTES_PER_SECTOR, IMAGE_BYTES, TOTAL_SECTORS};

/// An in-memory 1.44 MB floppy image: 2,880 sectors of 512 bytes.
///
/// The image is a plain byte container with no knowledge of the file system
/// inside it; `FileSystem` does all interpretation. On disk the format is the
/// raw 1,474,560-byte dump a physical floppy would produce, with no header or
/// checksum.
#[derive(Debug)]
pub struct FloppyImage {
    data: Vec<u8>,
}

impl FloppyImage {
    /// Creates a blank (all-zero) image with no file system.
    pub fn new_blank() -> Self {
        FloppyImage {
            data: vec![0u8; IMAGE_BYTES],
        }
    }

    /// Wraps an existing byte buffer. Fails `BadImage` unless the buffer is
    /// exactly 1,474,560 bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, FsError> {
        if data.len() != IMAGE_BYTES {
            return Err(FsError::new(
                ErrorKind::BadImage,
                format!("image is {} bytes, expected {}", data.len(), IMAGE_BYTES),
            ));
        }
        Ok(FloppyImage { data })
    }

    /// Opens an image file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FsError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| {
            FsError::new(ErrorKind::BadImage, format!("read {}: {}", path.display(), e))
        })?;
        debug!("loaded image {} ({} bytes)", path.display(), data.len());
        Self::from_bytes(data)
    }

    /// Saves the image to a file in one pass.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), FsError> {
        let path = path.as_ref();
        let mut f = fs::File::create(path).map_err(|e| {
            FsError::new(ErrorKind::BadImage, format!("create {}: {}", path.display(), e))
        })?;
        f.write_all(&self.data).map_err(|e| {
            FsError::new(ErrorKind::BadImage, format!("write {}: {}", path.display(), e))
        })?;
        debug!("saved image {}", path.display());
        Ok(())
    }

    /// Reads a sector and returns it by value.
    pub fn sector(&self, lba: u64) -> Result<[u8; BYTES_PER_SECTOR], FsError> {
        let mut buf = [0u8; BYTES_PER_SECTOR];
        self.read_sector(lba, &mut buf)?;
        Ok(buf)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn check_lba(&self, lba: u64) -> Result<usize, FsError> {
        if lba >= TOTAL_SECTORS as u64 {
            return Err(FsError::new(
                ErrorKind::OutOfRange,
                format!("sector {} out of range 0..{}", lba, TOTAL_SECTORS),
            ));
        }
        Ok(lba as usize * BYTES_PER_SECTOR)
    }
}

impl BlockDevice for FloppyImage {
    fn read_sector(&self, lba: u64, buf: &mut [u8]) -> Result<(), FsError> {
        if buf.len() != BYTES_PER_SECTOR {
            return Err(FsError::new(
                ErrorKind::BadSize,
                format!("sector read buffer is {} bytes", buf.len()),
            ));
        }
        let start = self.check_lba(lba)?;
        buf.copy_from_slice(&self.data[start..start + BYTES_PER_SECTOR]);
        Ok(())
    }

    fn write_sector(&mut self, lba: u64, data: &[u8]) -> Result<(), FsError> {
        if data.len() != BYTES_PER_SECTOR {
            return Err(FsError::new(
                ErrorKind::BadSize,
                format!("sector write buffer is {} bytes", data.len()),
            ));
        }
        let start = self.check_lba(lba)?;
        self.data[start..start + BYTES_PER_SECTOR].copy_from_slice(data);
        Ok(())
    }

    fn sector_count(&self) -> u64 {
        TOTAL_SECTORS as u64
    }
}

impl Default for FloppyImage {
    fn default() -> Self {
        Self::new_blank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn blank_image_has_2880_sectors() {
        let img = FloppyImage::new_blank();
        assert_eq!(img.sector_count(), 2880);
        assert_eq!(img.as_bytes().len(), IMAGE_BYTES);
    }

    #[test]
    fn sector_round_trip() {
        let mut img = FloppyImage::new_blank();
        let mut data = [0u8; BYTES_PER_SECTOR];
        data[0] = 0xAB;
        data[511] = 0xCD;
        img.write_sector(42, &data).unwrap();
        assert_eq!(img.sector(42).unwrap(), data);
    }

    #[test]
    fn out_of_range_sector_is_rejected() {
        let img = FloppyImage::new_blank();
        let mut buf = [0u8; BYTES_PER_SECTOR];
        let err = img.read_sector(2880, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn short_write_is_rejected() {
        let mut img = FloppyImage::new_blank();
        let err = img.write_sector(0, &[0u8; 100]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadSize);
    }

    #[test]
    fn wrong_length_buffer_is_rejected() {
        let err = FloppyImage::from_bytes(vec![0u8; 1000]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadImage);
    }
}
