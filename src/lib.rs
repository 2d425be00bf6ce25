//! FAT12 file systems on 1.44 MB (3.5") floppy disk images.
//!
//! [`FloppyImage`] is the raw 1,474,560-byte sector container;
//! [`FileSystem`] interprets it: format, list, read, write, rename, delete,
//! directories, volume labels. [`FileSystem::open`] hands out positioned
//! [`FileHandle`]s. Anything sector-addressed can stand in for the image by
//! implementing [`BlockDevice`].

pub mod block_device;
pub mod boot_sector;
pub mod clock;
pub mod dir_entry;
pub mod directory;
pub mod error;
pub mod fat_constants;
pub mod fat_table;
pub mod file;
pub mod fs;
pub mod image;
pub mod path;

pub use block_device::BlockDevice;
pub use boot_sector::BootSector;
pub use clock::{Clock, FixedClock, SystemClock};
pub use dir_entry::{Attributes, DirEntry, DirSlot};
pub use error::{ErrorCategory, ErrorKind, FsError};
pub use file::{FileHandle, OpenMode};
pub use fs::{FileInfo, FileSystem};
pub use image::FloppyImage;
