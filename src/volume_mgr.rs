//! The Volume Manager implementation.
//!
//! The volume manager handles partitions and open files on a block device.

use heapless::Vec;

use crate::blockdevice::{Block, BlockDevice, BlockIdx};
use crate::cache::{BlockCache, CacheKind};
use crate::fat::cursor::ClusterCursor;
use crate::fat::ondiskdirentry::OnDiskDirEntry;
use crate::fat::volume::parse_volume;
use crate::filesystem::directory::DirEntry;
use crate::filesystem::filename::path_components;
use crate::filesystem::files::{Fd, FileInfo, OpenFile, OpenFlags, Stat, Whence};
use crate::partitions::{self, Partition, PartitionKind};
use crate::{debug, trace, Error, BLOCK_LEN};

/// Wraps a block device and gives access to the files on the FAT-formatted
/// partitions within it.
///
/// All state lives here: the partition table decoded at mount time, the
/// open-file table, and the block cache (which owns the device). The
/// const generics bound the file and partition tables; the defaults
/// match small embedded deployments.
pub struct VolumeManager<
    D,
    const MAX_FDS: usize = 4,
    const MAX_PARTITIONS: usize = 4,
    const CACHE_DEPTH: usize = 2,
> where
    D: BlockDevice,
{
    cache: BlockCache<D, CACHE_DEPTH>,
    partitions: Vec<Partition, MAX_PARTITIONS>,
    active_partition: usize,
    open_files: [Option<OpenFile>; MAX_FDS],
}

impl<D, const MAX_FDS: usize, const MAX_PARTITIONS: usize, const CACHE_DEPTH: usize>
    VolumeManager<D, MAX_FDS, MAX_PARTITIONS, CACHE_DEPTH>
where
    D: BlockDevice,
{
    /// Mount the FAT volumes on a block device.
    ///
    /// Looks for a GUID Partition Table, then a Master Boot Record, then
    /// falls back to treating block 0 as the BPB of a single table-less
    /// volume. Every candidate partition's BPB is then decoded; records
    /// that fail validation are kept as [`PartitionKind::Unknown`].
    ///
    /// The active partition starts as the first bootable FAT partition,
    /// or the first FAT partition if none is bootable. If the device has
    /// no FAT partition at all, mounting fails with
    /// [`Error::NoSuitableVolume`].
    pub fn mount(
        block_device: D,
    ) -> Result<VolumeManager<D, MAX_FDS, MAX_PARTITIONS, CACHE_DEPTH>, Error<D::E>> {
        let mut cache = BlockCache::new(block_device);
        let candidates = partitions::discover::<D, CACHE_DEPTH, MAX_PARTITIONS>(&mut cache);

        let mut parts: Vec<Partition, MAX_PARTITIONS> = Vec::new();
        for candidate in candidates.iter() {
            let kind = if candidate.maybe_fat {
                match parse_volume(&mut cache, candidate.first_block) {
                    Ok(volume) => {
                        debug!(
                            "partition at block {}: FAT volume with {} clusters",
                            candidate.first_block.0,
                            volume.cluster_count
                        );
                        PartitionKind::Fat(volume)
                    }
                    Err(Error::DeviceError(e)) => return Err(Error::DeviceError(e)),
                    Err(_) => {
                        debug!(
                            "partition at block {}: no valid BPB",
                            candidate.first_block.0
                        );
                        PartitionKind::Unknown
                    }
                }
            } else {
                PartitionKind::Unknown
            };
            // Candidates never outnumber the partition table.
            let _ = parts.push(Partition {
                boot: candidate.boot,
                kind,
            });
        }

        // Prefer the first bootable FAT partition; settle for the first
        // FAT partition.
        let mut active = None;
        for (idx, partition) in parts.iter().enumerate() {
            if matches!(partition.kind, PartitionKind::Fat(_)) {
                if partition.boot {
                    active = Some(idx);
                    break;
                }
                if active.is_none() {
                    active = Some(idx);
                }
            }
        }
        let active_partition = active.ok_or(Error::NoSuitableVolume)?;
        debug!("mounted; active partition is {}", active_partition);

        Ok(VolumeManager {
            cache,
            partitions: parts,
            active_partition,
            open_files: [None; MAX_FDS],
        })
    }

    /// Flush pending writes and hand back the block device.
    pub fn unmount(mut self) -> Result<D, Error<D::E>> {
        self.cache.sync()?;
        Ok(self.cache.free())
    }

    /// Which partition `open` and `stat` resolve paths on.
    pub fn active_partition(&self) -> usize {
        self.active_partition
    }

    /// How many records the partition table held.
    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Look at one partition record.
    pub fn partition(&self, partition_no: usize) -> Option<&Partition> {
        self.partitions.get(partition_no)
    }

    /// Switch the active partition.
    ///
    /// Open file descriptors are pinned to the partition they were opened
    /// on and keep working across a switch.
    pub fn select_partition(&mut self, partition_no: usize) -> Result<(), Error<D::E>> {
        let partition = self
            .partitions
            .get(partition_no)
            .ok_or(Error::NoSuchPartition)?;
        if !matches!(partition.kind, PartitionKind::Fat(_)) {
            return Err(Error::UnsupportedPartition);
        }
        self.active_partition = partition_no;
        Ok(())
    }

    /// Write every cached dirty block back to the device.
    pub fn sync(&mut self) -> Result<(), Error<D::E>> {
        self.cache.sync()
    }

    /// Open the file at `path` on the active partition.
    ///
    /// `path` is resolved component by component against 8.3 short names;
    /// `/` and `\` both separate components and the leading separator is
    /// optional. The returned descriptor is the lowest free slot,
    /// starting from zero.
    pub fn open(&mut self, path: &str, flags: OpenFlags) -> Result<Fd, Error<D::E>> {
        if !flags.readable() && !flags.writable() {
            return Err(Error::InvalidMode);
        }
        let slot = self
            .open_files
            .iter()
            .position(|f| f.is_none())
            .ok_or(Error::TooManyOpenFiles)?;

        let partition_no = self.active_partition;
        let entry = match self.resolve_path(partition_no, path) {
            Ok(entry) => entry,
            Err(Error::NotFound) if flags.contains(OpenFlags::CREAT) => {
                // Recognised, but the write path is reserved.
                return Err(Error::Unsupported);
            }
            Err(e) => return Err(e),
        };

        if entry.attributes.is_directory() {
            return Err(Error::OpenedDirAsFile);
        }
        if flags.contains(OpenFlags::DIRECTORY) {
            return Err(Error::InvalidMode);
        }

        debug!(
            "open fd {}: first cluster {}, {} bytes",
            slot, entry.cluster.0, entry.size
        );
        self.open_files[slot] = Some(OpenFile {
            flags,
            offset: 0,
            current_cluster: entry.cluster,
            info: FileInfo {
                partition: partition_no,
                size: entry.size,
                first_cluster: entry.cluster,
                entry_block: entry.entry_block,
                entry_offset: entry.entry_offset,
            },
        });
        Ok(Fd(slot))
    }

    /// Close a file descriptor, making its slot available again.
    ///
    /// Closing a descriptor that was open for writing flushes the caches.
    pub fn close(&mut self, fd: Fd) -> Result<(), Error<D::E>> {
        let file = self.get_file(fd)?;
        if file.flags.writable() {
            self.cache.sync()?;
        }
        self.open_files[fd.0] = None;
        Ok(())
    }

    /// Read from an open file into `buffer`, advancing the seek offset.
    ///
    /// Returns how many bytes were read: the buffer size, clamped to the
    /// bytes left in the file. Zero means end of file.
    pub fn read(&mut self, fd: Fd, buffer: &mut [u8]) -> Result<usize, Error<D::E>> {
        let mut file = self.get_file(fd)?;
        if !file.flags.readable() {
            return Err(Error::AccessDenied);
        }
        let Some(partition) = self.partitions.get(file.info.partition) else {
            return Err(Error::NoSuchPartition);
        };
        let PartitionKind::Fat(volume) = &partition.kind else {
            return Err(Error::UnsupportedPartition);
        };

        let remaining = file.info.size - file.offset;
        let nbyte = (u64::from(remaining)).min(buffer.len() as u64) as usize;
        if nbyte == 0 {
            return Ok(0);
        }

        let mut cursor = ClusterCursor::new(volume, file.current_cluster, file.offset);
        let mut read = 0usize;

        // Head: align to a block boundary through the cache.
        let block_offset = (file.offset % BLOCK_LEN) as usize;
        if block_offset != 0 {
            let tail_bytes_in_block = BLOCK_LEN as usize - block_offset;
            let to_copy = tail_bytes_in_block.min(nbyte);
            let block = self.cache.read(CacheKind::Data, cursor.block())?;
            buffer[..to_copy].copy_from_slice(&block[block_offset..block_offset + to_copy]);
            trace!("read: head of {} bytes", to_copy);
            read += to_copy;
            if to_copy == tail_bytes_in_block {
                cursor.advance(volume, &mut self.cache)?;
            }
        }

        // Body: whole blocks, straight from the device. Going through the
        // cache here would only evict metadata the next operation needs.
        while nbyte - read >= BLOCK_LEN as usize {
            if cursor.cluster().is_end_of_chain() {
                // The directory entry promised more data than the chain has.
                return Err(Error::BadCluster);
            }
            let mut block = Block::new();
            self.cache.read_bypass(cursor.block(), &mut block)?;
            buffer[read..read + BLOCK_LEN as usize].copy_from_slice(&block[..]);
            read += BLOCK_LEN as usize;
            cursor.advance(volume, &mut self.cache)?;
        }

        // Tail: the final partial block, through the cache.
        if read < nbyte {
            if cursor.cluster().is_end_of_chain() {
                return Err(Error::BadCluster);
            }
            let to_copy = nbyte - read;
            let block = self.cache.read(CacheKind::Data, cursor.block())?;
            buffer[read..read + to_copy].copy_from_slice(&block[..to_copy]);
            trace!("read: tail of {} bytes", to_copy);
            read += to_copy;
        }

        file.current_cluster = cursor.cluster();
        file.offset += read as u32;
        self.open_files[fd.0] = Some(file);
        Ok(read)
    }

    /// Write to an open file.
    ///
    /// The write path is reserved: after the access check this always
    /// fails with [`Error::Unsupported`].
    pub fn write(&mut self, fd: Fd, _buffer: &[u8]) -> Result<usize, Error<D::E>> {
        let file = self.get_file(fd)?;
        if !file.flags.writable() {
            return Err(Error::AccessDenied);
        }
        Err(Error::Unsupported)
    }

    /// Move the seek offset of an open file.
    ///
    /// The target must lie within the file; seeking past the end or
    /// before the start fails with [`Error::InvalidOffset`] and leaves
    /// the offset where it was. Returns the new offset.
    ///
    /// `lseek(fd, 0, Whence::Cur)` queries the position without side
    /// effects.
    pub fn lseek(&mut self, fd: Fd, offset: i64, whence: Whence) -> Result<u32, Error<D::E>> {
        let mut file = self.get_file(fd)?;
        let Some(partition) = self.partitions.get(file.info.partition) else {
            return Err(Error::NoSuchPartition);
        };
        let PartitionKind::Fat(volume) = &partition.kind else {
            return Err(Error::UnsupportedPartition);
        };

        // 64-bit arithmetic so overflowing combinations cannot wrap.
        let base = match whence {
            Whence::Set => 0,
            Whence::Cur => i64::from(file.offset),
            Whence::End => i64::from(file.info.size),
        };
        let target = base.checked_add(offset).ok_or(Error::InvalidOffset)?;
        if target < 0 || target > i64::from(file.info.size) {
            return Err(Error::InvalidOffset);
        }
        let target = target as u32;

        let bytes_per_cluster = volume.bytes_per_cluster();
        let mut current_cluster = file.current_cluster;
        let mut cluster_offset = file.offset - (file.offset % bytes_per_cluster);
        if target < cluster_offset {
            // The chain is singly linked; to go backwards, start over.
            current_cluster = file.info.first_cluster;
            cluster_offset = 0;
        }
        while target - cluster_offset >= bytes_per_cluster {
            if current_cluster.is_end_of_chain() {
                return Err(Error::BadCluster);
            }
            current_cluster = volume.next_cluster(&mut self.cache, current_cluster)?;
            cluster_offset += bytes_per_cluster;
        }

        file.offset = target;
        file.current_cluster = current_cluster;
        self.open_files[fd.0] = Some(file);
        Ok(target)
    }

    /// Obtain information about the file at `path` on the active
    /// partition.
    pub fn stat(&mut self, path: &str) -> Result<Stat, Error<D::E>> {
        let partition_no = self.active_partition;
        let entry = self.resolve_path(partition_no, path)?;
        self.stat_from_dir_entry(entry.entry_block, entry.entry_offset)
    }

    /// Obtain information about an open file.
    pub fn fstat(&mut self, fd: Fd) -> Result<Stat, Error<D::E>> {
        let file = self.get_file(fd)?;
        self.stat_from_dir_entry(file.info.entry_block, file.info.entry_offset)
    }

    /// Resolve a path to its directory entry on the given partition.
    ///
    /// Non-final components must be directories; the final component may
    /// be either. Empty components and `.` are skipped, so `a//b` and
    /// `./a/b` both resolve like `a/b`.
    fn resolve_path(&mut self, partition_no: usize, path: &str) -> Result<DirEntry, Error<D::E>> {
        let Some(partition) = self.partitions.get(partition_no) else {
            return Err(Error::NoSuchPartition);
        };
        let PartitionKind::Fat(volume) = &partition.kind else {
            return Err(Error::UnsupportedPartition);
        };

        let mut components = path_components(path).peekable();
        let mut cursor = volume.root_directory_cursor();
        loop {
            let Some(name) = components.next() else {
                // The path had no usable components ("", "/", "./").
                return Err(Error::NotFound);
            };
            let is_final = components.peek().is_none();
            let entry = volume.find_directory_entry(&mut self.cache, cursor, &name)?;
            if is_final {
                return Ok(entry);
            }
            if !entry.attributes.is_directory() {
                return Err(Error::OpenedFileAsDir);
            }
            cursor = volume.directory_cursor(entry.cluster);
        }
    }

    /// Re-read a file's directory entry and produce its `stat` view.
    fn stat_from_dir_entry(
        &mut self,
        entry_block: BlockIdx,
        entry_offset: u32,
    ) -> Result<Stat, Error<D::E>> {
        let block = self.cache.read(CacheKind::Data, entry_block)?;
        let offset = entry_offset as usize;
        let entry = OnDiskDirEntry::new(&block[offset..offset + OnDiskDirEntry::LEN]);
        Ok(entry.to_stat())
    }

    fn get_file(&self, fd: Fd) -> Result<OpenFile, Error<D::E>> {
        self.open_files
            .get(fd.0)
            .and_then(|file| *file)
            .ok_or(Error::BadHandle)
    }
}

// ****************************************************************************
//
// Unit Tests
//
// ****************************************************************************


// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
