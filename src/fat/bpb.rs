//! The BIOS Parameter Block.
//!
//! The first block of a FAT partition describes the volume's geometry.
//! Decoding it tells us where the allocation tables, the root directory
//! and the data clusters live, and whether the volume is FAT16 or FAT32.

use byteorder::{ByteOrder, LittleEndian};

use crate::blockdevice::BlockCount;
use crate::fat::FatType;

/// A decoded, validated BIOS Parameter Block.
pub struct Bpb<'a> {
    data: &'a [u8; 512],
    /// Whether the volume turned out to be FAT16 or FAT32.
    pub fat_type: FatType,
    cluster_count: u32,
}

impl<'a> Bpb<'a> {
    /// The value of the signature word at offset 510.
    pub const FOOTER_VALUE: u16 = 0xAA55;

    /// Attempt to parse a BIOS Parameter Block from the given 512-byte
    /// block.
    ///
    /// Validates the signature, the jump instruction and the sector size,
    /// then classifies the volume by its count of clusters, per the FAT
    /// specification. FAT12 volumes (fewer than 4085 clusters) are
    /// rejected.
    pub fn create_from_bytes(data: &'a [u8; 512]) -> Result<Bpb<'a>, &'static str> {
        let mut bpb = Bpb {
            data,
            fat_type: FatType::Fat16,
            cluster_count: 0,
        };

        if bpb.footer() != Self::FOOTER_VALUE {
            return Err("Bad BPB signature");
        }

        // The block must start with a plausible x86 jump instruction.
        if data[0] != 0xE9 && !(data[0] == 0xEB && data[2] == 0x90) {
            return Err("Bad BPB jump instruction");
        }

        match bpb.bytes_per_block() {
            512 => {}
            1024 | 2048 | 4096 => return Err("Unsupported sector size"),
            _ => return Err("Bad BPB sector size"),
        }

        let bpc = bpb.blocks_per_cluster();
        if bpc == 0 || !bpc.is_power_of_two() {
            return Err("Bad blocks-per-cluster");
        }

        // Classify by count of clusters (FAT specification, "FAT Type
        // Determination").
        let non_data_blocks = u32::from(bpb.reserved_block_count())
            + (u32::from(bpb.num_fats()) * bpb.fat_size())
            + bpb.root_dir_blocks();
        let data_blocks = bpb
            .total_blocks()
            .checked_sub(non_data_blocks)
            .ok_or("Bad BPB geometry")?;
        bpb.cluster_count = data_blocks / u32::from(bpc);
        if bpb.cluster_count < 4085 {
            return Err("FAT12 is not supported");
        } else if bpb.cluster_count < 65525 {
            bpb.fat_type = FatType::Fat16;
        } else {
            bpb.fat_type = FatType::Fat32;
        }

        Ok(bpb)
    }

    // BPB fields common to FAT16 and FAT32.
    define_field!(bytes_per_block, u16, 11, "Bytes in each block (sector)");
    define_field!(blocks_per_cluster, u8, 13, "Blocks in each cluster");
    define_field!(
        reserved_block_count,
        u16,
        14,
        "Blocks before the first allocation table"
    );
    define_field!(num_fats, u8, 16, "Number of copies of the allocation table");
    define_field!(
        root_entries_count,
        u16,
        17,
        "Entries in the root directory (zero on FAT32)"
    );
    define_field!(
        total_blocks16,
        u16,
        19,
        "Total blocks, 16-bit field (zero if the volume needs 32 bits)"
    );
    define_field!(
        fat_size16,
        u16,
        22,
        "Blocks per allocation table, 16-bit field (zero on FAT32)"
    );
    define_field!(total_blocks32, u32, 32, "Total blocks, 32-bit field");

    // FAT32-only fields.
    define_field!(
        fat_size32,
        u32,
        36,
        "Blocks per allocation table, 32-bit field"
    );
    define_field!(
        first_root_dir_cluster,
        u32,
        44,
        "First cluster of the root directory (FAT32 only)"
    );

    define_field!(footer, u16, 510, "Signature word");

    /// The OEM name string.
    pub fn oem_name(&self) -> &[u8] {
        &self.data[3..11]
    }

    /// The extended boot signature byte. A value of `0x29` means the
    /// volume label and filesystem-type fields that follow it are present.
    pub fn extended_boot_signature(&self) -> u8 {
        match self.fat_type {
            FatType::Fat16 => self.data[38],
            FatType::Fat32 => self.data[66],
        }
    }

    /// The volume label, valid when the extended boot signature is `0x29`.
    pub fn volume_label(&self) -> [u8; 11] {
        let offset = match self.fat_type {
            FatType::Fat16 => 43,
            FatType::Fat32 => 71,
        };
        let mut label = [0u8; 11];
        label.copy_from_slice(&self.data[offset..offset + 11]);
        label
    }

    /// Blocks in each allocation table, picking whichever of the 16-bit
    /// and 32-bit fields is in use.
    pub fn fat_size(&self) -> u32 {
        let result = u32::from(self.fat_size16());
        if result != 0 {
            result
        } else {
            self.fat_size32()
        }
    }

    /// Total blocks on the volume, picking whichever of the 16-bit and
    /// 32-bit fields is in use.
    pub fn total_blocks(&self) -> u32 {
        let result = u32::from(self.total_blocks16());
        if result != 0 {
            result
        } else {
            self.total_blocks32()
        }
    }

    /// Blocks occupied by the fixed root directory (zero on FAT32).
    pub fn root_dir_blocks(&self) -> u32 {
        BlockCount::from_bytes(u32::from(self.root_entries_count()) * 32).0
    }

    /// The count of data clusters on the volume.
    pub fn cluster_count(&self) -> u32 {
        self.cluster_count
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
