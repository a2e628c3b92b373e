//! A small write-back cache of device blocks.
//!
//! The cache is split in two: one set of slots for data blocks (directory
//! tables, file contents read through the cache) and one for File
//! Allocation Table blocks. Chain walks and data reads touch very
//! different blocks, so keeping the two apart stops a long file read from
//! evicting the FAT block it needs on every cluster boundary.
//!
//! Each set holds `DEPTH` slots and a priority list of slot indices,
//! ordered most-recently-used first. Replacement picks the back of the
//! list; every access moves the chosen slot to the front.

use crate::blockdevice::{Block, BlockDevice, BlockIdx};
use crate::{trace, warn, Error};

/// Which of the two cache sets a block belongs to.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CacheKind {
    /// Directory tables, BPBs, partition tables and file contents.
    Data = 0,
    /// File Allocation Table blocks.
    Fat = 1,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum SlotState {
    Invalid,
    Valid,
    Dirty,
}

struct CacheSlot {
    state: SlotState,
    block_idx: BlockIdx,
    buf: Block,
}

impl CacheSlot {
    fn new() -> CacheSlot {
        CacheSlot {
            state: SlotState::Invalid,
            block_idx: BlockIdx(0),
            buf: Block::new(),
        }
    }
}

struct CacheSet<const DEPTH: usize> {
    slots: [CacheSlot; DEPTH],
    /// Slot indices, most recently used first.
    pri: [usize; DEPTH],
}

impl<const DEPTH: usize> CacheSet<DEPTH> {
    fn new() -> CacheSet<DEPTH> {
        CacheSet {
            slots: core::array::from_fn(|_| CacheSlot::new()),
            pri: core::array::from_fn(|i| i),
        }
    }

    /// Pick the slot for the given block: the holder on a hit, the least
    /// recently used slot otherwise.
    fn select(&self, block_idx: BlockIdx) -> usize {
        let mut item = self.pri[DEPTH - 1];
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.state != SlotState::Invalid && slot.block_idx == block_idx {
                item = i;
                break;
            }
        }
        item
    }

    /// Move the given slot index to the front of the priority list,
    /// shifting the entries before its old position back by one.
    fn promote(&mut self, item: usize) {
        let mut prev = item;
        for p in self.pri.iter_mut() {
            let this = *p;
            *p = prev;
            if this == item {
                break;
            }
            prev = this;
        }
    }
}

/// A block device wrapped with two small sets of cached blocks.
///
/// The cache owns the device; everything the library reads or writes goes
/// through here. Mutated blocks are held back until they are evicted or
/// [`BlockCache::sync`] runs.
pub struct BlockCache<D, const DEPTH: usize>
where
    D: BlockDevice,
{
    block_device: D,
    sets: [CacheSet<DEPTH>; 2],
}

impl<D, const DEPTH: usize> BlockCache<D, DEPTH>
where
    D: BlockDevice,
{
    /// Wrap a block device in a fresh (all-invalid) cache.
    pub fn new(block_device: D) -> BlockCache<D, DEPTH> {
        BlockCache {
            block_device,
            sets: [CacheSet::new(), CacheSet::new()],
        }
    }

    /// Read a block through the cache.
    pub fn read(&mut self, kind: CacheKind, block_idx: BlockIdx) -> Result<&Block, Error<D::E>> {
        let slot = Self::fill_slot(
            &mut self.sets[kind as usize],
            &mut self.block_device,
            block_idx,
        )?;
        Ok(&slot.buf)
    }

    /// Read a block through the cache and mark it dirty.
    ///
    /// The returned buffer is the authoritative copy of the block until it
    /// is flushed by eviction or [`BlockCache::sync`].
    pub fn read_mut(
        &mut self,
        kind: CacheKind,
        block_idx: BlockIdx,
    ) -> Result<&mut Block, Error<D::E>> {
        let slot = Self::fill_slot(
            &mut self.sets[kind as usize],
            &mut self.block_device,
            block_idx,
        )?;
        slot.state = SlotState::Dirty;
        Ok(&mut slot.buf)
    }

    /// Read a block straight from the device, without touching any cache
    /// slot. Used for bulk data reads that would only churn the cache.
    pub fn read_bypass(&mut self, block_idx: BlockIdx, block: &mut Block) -> Result<(), Error<D::E>> {
        self.block_device
            .read(core::slice::from_mut(block), block_idx)
            .map_err(Error::DeviceError)
    }

    /// Write every dirty block back to the device.
    pub fn sync(&mut self) -> Result<(), Error<D::E>> {
        let Self { block_device, sets } = self;
        for set in sets.iter_mut() {
            for slot in set.slots.iter_mut() {
                if slot.state == SlotState::Dirty {
                    trace!("cache: flushing block {}", slot.block_idx.0);
                    block_device
                        .write(core::slice::from_ref(&slot.buf), slot.block_idx)
                        .map_err(Error::DeviceError)?;
                    slot.state = SlotState::Valid;
                }
            }
        }
        Ok(())
    }

    /// Temporary access to the underlying block device.
    pub fn block_device(&mut self) -> &mut D {
        &mut self.block_device
    }

    /// Consume the cache and hand back the device. Does not flush.
    pub fn free(self) -> D {
        self.block_device
    }

    fn fill_slot<'a>(
        set: &'a mut CacheSet<DEPTH>,
        device: &mut D,
        block_idx: BlockIdx,
    ) -> Result<&'a mut CacheSlot, Error<D::E>> {
        let item = set.select(block_idx);
        set.promote(item);
        let slot = &mut set.slots[item];

        if slot.block_idx != block_idx {
            if slot.state == SlotState::Dirty {
                trace!(
                    "cache: evicting dirty block {} for block {}",
                    slot.block_idx.0,
                    block_idx.0
                );
                if let Err(e) = device.write(core::slice::from_ref(&slot.buf), slot.block_idx) {
                    // The dirty contents cannot be written out; they are lost.
                    warn!("cache: failed to flush block {}", slot.block_idx.0);
                    slot.state = SlotState::Invalid;
                    return Err(Error::DeviceError(e));
                }
            }
            slot.block_idx = block_idx;
            slot.state = SlotState::Invalid;
        }

        if slot.state == SlotState::Invalid {
            device
                .read(core::slice::from_mut(&mut slot.buf), block_idx)
                .map_err(Error::DeviceError)?;
            slot.state = SlotState::Valid;
        }

        Ok(slot)
    }

    /// The slot priority list for one cache set, front (most recent) first.
    #[cfg(test)]
    fn priorities(&self, kind: CacheKind) -> [usize; DEPTH] {
        self.sets[kind as usize].pri
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
