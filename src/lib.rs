//! # fatvol
//!
//! > Reading FAT16/FAT32 volumes on any random-access block device
//!
//! This crate locates FAT partitions on a block device (through a GUID
//! Partition Table, a Master Boot Record, or a table-less single-volume
//! layout), decodes their BIOS Parameter Blocks, and gives POSIX-flavoured
//! `open`/`read`/`lseek`/`close`/`stat` access to the files on them.
//!
//! The device itself is abstracted behind the [`BlockDevice`] trait, which
//! moves 512-byte blocks and nothing else; the library never learns whether
//! it is talking to an SD card, a disk image in a file, or a flash
//! partition.
//!
//! ```rust,ignore
//! let mut volume_mgr: VolumeManager<MyDevice> = VolumeManager::mount(device)?;
//! let fd = volume_mgr.open("/LOGS/BOOT.TXT", OpenFlags::RDONLY)?;
//! let mut buffer = [0u8; 128];
//! let n = volume_mgr.read(fd, &mut buffer)?;
//! volume_mgr.close(fd)?;
//! ```
//!
//! Long file names, FAT12 and the write path are out of scope; `write`
//! currently fails with [`Error::Unsupported`] and `CREAT` is recognised
//! but reserved.
//!
//! All state lives in the [`VolumeManager`] handle returned by `mount`.
//! The library is strictly single-threaded: wrap the handle in a mutex if
//! you need to share it.

#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "defmt-log", feature = "log"))]
compile_error!("Cannot enable both the `log` and `defmt-log` features");

#[cfg(feature = "defmt-log")]
pub(crate) use defmt::{debug, trace, warn};

#[cfg(feature = "log")]
pub(crate) use log::{debug, trace, warn};

#[cfg(not(any(feature = "defmt-log", feature = "log")))]
mod logging {
    //! No logging backend is enabled; these swallow their arguments.
    macro_rules! debug {
        ($($arg:tt)+) => {};
    }
    macro_rules! trace {
        ($($arg:tt)+) => {};
    }
    macro_rules! warn_ {
        ($($arg:tt)+) => {};
    }
    pub(crate) use debug;
    pub(crate) use trace;
    pub(crate) use warn_ as warn;
}

#[cfg(not(any(feature = "defmt-log", feature = "log")))]
pub(crate) use logging::{debug, trace, warn};

#[macro_use]
mod structure;

pub mod blockdevice;
pub mod cache;
pub mod fat;
pub mod filesystem;
pub mod partitions;
pub mod volume_mgr;

pub use blockdevice::{Block, BlockCount, BlockDevice, BlockIdx};
pub use cache::{BlockCache, CacheKind};
pub use fat::volume::{FatVolume, VolumeName};
pub use fat::FatType;
pub use filesystem::attributes::Attributes;
pub use filesystem::cluster::ClusterId;
pub use filesystem::directory::DirEntry;
pub use filesystem::filename::ShortFileName;
pub use filesystem::files::{Fd, FileMode, OpenFlags, Stat, Whence};
pub use filesystem::timestamp::Timestamp;
pub use partitions::{Partition, PartitionKind};
pub use volume_mgr::VolumeManager;

/// All the ways a filesystem operation can fail.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error<E>
where
    E: core::fmt::Debug,
{
    /// The underlying block device reported an error.
    DeviceError(E),
    /// An on-disk structure failed validation. The string names the check.
    FormatError(&'static str),
    /// Mount found no FAT partition on the device.
    NoSuitableVolume,
    /// The requested partition index is out of range.
    NoSuchPartition,
    /// The requested partition exists but is not a FAT partition.
    UnsupportedPartition,
    /// Every file descriptor slot is in use.
    TooManyOpenFiles,
    /// The file descriptor does not refer to an open file.
    BadHandle,
    /// The path does not name an existing file or directory.
    NotFound,
    /// The path names a directory where a file was required.
    OpenedDirAsFile,
    /// A non-final path component names a file, not a directory.
    OpenedFileAsDir,
    /// The open flags are not a valid combination.
    InvalidMode,
    /// The file is not open for the requested access.
    AccessDenied,
    /// The seek target is negative or beyond the end of the file.
    InvalidOffset,
    /// A FAT chain references a free or bad cluster, or runs past its
    /// end-of-chain marker.
    BadCluster,
    /// The operation is recognised but not implemented (the write path).
    Unsupported,
}

/// The block size this library operates on. Devices with other sector
/// sizes are not supported.
pub const BLOCK_LEN: u32 = 512;

/// MBR partition ID for FAT16 partitions smaller than 32 MiB.
pub const PARTITION_ID_FAT16_SMALL: u8 = 0x04;
/// MBR partition ID for FAT16 partitions larger than 32 MiB.
pub const PARTITION_ID_FAT16: u8 = 0x06;
/// MBR partition ID for FAT32 partitions addressed with CHS and LBA.
pub const PARTITION_ID_FAT32_CHS_LBA: u8 = 0x0B;
/// MBR partition ID for FAT32 partitions addressed with LBA.
pub const PARTITION_ID_FAT32_LBA: u8 = 0x0C;
/// MBR partition ID for FAT16 partitions addressed with LBA.
pub const PARTITION_ID_FAT16_LBA: u8 = 0x0E;

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
