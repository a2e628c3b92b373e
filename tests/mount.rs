//! Mounting devices with different partition layouts.

use fatvol::{Error, FatType, PartitionKind, VolumeManager};

mod common;
use common::{fat16, gpt_fat32, tableless, RamDisk};

type Manager = VolumeManager<RamDisk, 4, 4, 2>;

#[test]
fn mbr_fat16_geometry() {
    let volume_mgr = Manager::mount(common::make_fat16_disk()).expect("mount");

    assert_eq!(volume_mgr.active_partition(), 0);
    assert_eq!(volume_mgr.num_partitions(), 4);

    let partition = volume_mgr.partition(0).unwrap();
    assert!(!partition.is_boot());
    let PartitionKind::Fat(volume) = partition.kind() else {
        panic!("expected a FAT partition, got {:?}", partition.kind());
    };
    assert_eq!(volume.get_fat_type(), FatType::Fat16);
    assert_eq!(volume.bytes_per_cluster(), 512);

    // The remaining table entries are empty.
    for i in 1..4 {
        assert_eq!(volume_mgr.partition(i).unwrap().kind(), &PartitionKind::Unknown);
    }
}

#[test]
fn first_bootable_partition_wins() {
    let volume_mgr = Manager::mount(common::make_two_partition_disk()).expect("mount");
    // Partition 0 is FAT too, but partition 1 carries the boot flag.
    assert_eq!(volume_mgr.active_partition(), 1);
    assert!(volume_mgr.partition(1).unwrap().is_boot());
    assert!(matches!(
        volume_mgr.partition(0).unwrap().kind(),
        PartitionKind::Fat(_)
    ));
}

#[test]
fn gpt_fat32_is_found_and_selected() {
    let volume_mgr = Manager::mount(gpt_fat32::make()).expect("mount");

    assert_eq!(volume_mgr.active_partition(), 0);
    let PartitionKind::Fat(volume) = volume_mgr.partition(0).unwrap().kind() else {
        panic!("expected a FAT partition");
    };
    assert_eq!(volume.get_fat_type(), FatType::Fat32);
}

#[test]
fn tableless_volume_mounts() {
    let volume_mgr = Manager::mount(tableless::make()).expect("mount");
    assert_eq!(volume_mgr.active_partition(), 0);
    assert_eq!(volume_mgr.num_partitions(), 1);
    let PartitionKind::Fat(volume) = volume_mgr.partition(0).unwrap().kind() else {
        panic!("expected a FAT partition");
    };
    assert_eq!(volume.get_fat_type(), FatType::Fat16);
    assert_eq!(volume.bytes_per_cluster(), 2048);
}

#[test]
fn garbage_does_not_mount() {
    assert!(matches!(
        Manager::mount(RamDisk::garbage(64)),
        Err(Error::NoSuitableVolume)
    ));
}

#[test]
fn mbr_with_invalid_bpb_does_not_mount() {
    // A valid MBR pointing at a partition with nothing in it.
    let mut disk = RamDisk::new(256);
    common::mbr_entry(&mut disk, 0, 0x00, 0x06, 128, 64);
    common::mbr_signature(&mut disk);
    assert!(matches!(
        Manager::mount(disk),
        Err(Error::NoSuitableVolume)
    ));
}

#[test]
fn select_partition_checks_its_argument() {
    let mut volume_mgr = Manager::mount(common::make_fat16_disk()).expect("mount");

    assert!(matches!(
        volume_mgr.select_partition(1),
        Err(Error::UnsupportedPartition)
    ));
    assert!(matches!(
        volume_mgr.select_partition(4),
        Err(Error::NoSuchPartition)
    ));
    volume_mgr.select_partition(0).expect("select 0");
}

#[test]
fn geometry_invariant_holds() {
    // first_data_block = reserved + fats * blocks_per_fat + root blocks,
    // for both formats.
    assert_eq!(
        fat16::FIRST_DATA_BLOCK,
        fat16::RESERVED + fat16::NUM_FATS * fat16::BLOCKS_PER_FAT + fat16::ROOT_BLOCKS
    );
    assert_eq!(
        gpt_fat32::FIRST_DATA_BLOCK,
        gpt_fat32::RESERVED + gpt_fat32::NUM_FATS * gpt_fat32::BLOCKS_PER_FAT
    );

    // And the mounted volumes agree with the builders.
    let volume_mgr = Manager::mount(common::make_fat16_disk()).expect("mount");
    let PartitionKind::Fat(volume) = volume_mgr.partition(0).unwrap().kind() else {
        panic!("expected a FAT partition");
    };
    assert_eq!(format!("{:?}", volume.name()), "VolumeName(\"TESTDISK   \")");
}

#[test]
fn unmount_returns_the_device() {
    let volume_mgr = Manager::mount(common::make_fat16_disk()).expect("mount");
    let disk = volume_mgr.unmount().expect("unmount");
    // The image is intact; mounting again works.
    Manager::mount(disk).expect("remount");
}
