//! Seeking within open files.

use fatvol::{Error, OpenFlags, VolumeManager, Whence};

mod common;
use common::{fat16, RamDisk};

type Manager = VolumeManager<RamDisk, 4, 4, 2>;

#[test]
fn seek_set_then_tell() {
    let mut volume_mgr = Manager::mount(common::make_fat16_disk()).expect("mount");
    let fd = volume_mgr.open("/BIG.DAT", OpenFlags::RDONLY).expect("open");

    for pos in [0i64, 1, 511, 512, 513, 2048, 2599, 2600] {
        assert_eq!(volume_mgr.lseek(fd, pos, Whence::Set).expect("seek"), pos as u32);
        assert_eq!(
            volume_mgr.lseek(fd, 0, Whence::Cur).expect("tell"),
            pos as u32
        );
    }
    volume_mgr.close(fd).expect("close");
}

#[test]
fn seek_from_end_and_current() {
    let mut volume_mgr = Manager::mount(common::make_fat16_disk()).expect("mount");
    let fd = volume_mgr.open("/BIG.DAT", OpenFlags::RDONLY).expect("open");
    let size = fat16::BIG_DAT_SIZE;

    assert_eq!(volume_mgr.lseek(fd, 0, Whence::End).expect("seek"), size);
    // At end of file, a read returns zero bytes.
    let mut buffer = [0u8; 8];
    assert_eq!(volume_mgr.read(fd, &mut buffer).expect("read"), 0);

    assert_eq!(
        volume_mgr.lseek(fd, -(size as i64), Whence::End).expect("seek"),
        0
    );
    assert_eq!(volume_mgr.lseek(fd, 100, Whence::Cur).expect("seek"), 100);
    assert_eq!(volume_mgr.lseek(fd, -40, Whence::Cur).expect("seek"), 60);

    volume_mgr.close(fd).expect("close");
}

#[test]
fn out_of_range_seeks_fail_and_leave_the_offset_alone() {
    let mut volume_mgr = Manager::mount(common::make_fat16_disk()).expect("mount");
    let fd = volume_mgr.open("/BIG.DAT", OpenFlags::RDONLY).expect("open");

    volume_mgr.lseek(fd, 10, Whence::Set).expect("seek");

    assert!(matches!(
        volume_mgr.lseek(fd, -11, Whence::Cur),
        Err(Error::InvalidOffset)
    ));
    assert!(matches!(
        volume_mgr.lseek(fd, (fat16::BIG_DAT_SIZE + 1) as i64, Whence::Set),
        Err(Error::InvalidOffset)
    ));
    assert!(matches!(
        volume_mgr.lseek(fd, 1, Whence::End),
        Err(Error::InvalidOffset)
    ));
    assert!(matches!(
        volume_mgr.lseek(fd, i64::MIN, Whence::Cur),
        Err(Error::InvalidOffset)
    ));

    // The failed seeks did not move the offset.
    assert_eq!(volume_mgr.lseek(fd, 0, Whence::Cur).expect("tell"), 10);
    volume_mgr.close(fd).expect("close");
}

#[test]
fn reads_after_seeks_see_the_right_bytes() {
    let mut volume_mgr = Manager::mount(common::make_fat16_disk()).expect("mount");
    let fd = volume_mgr.open("/BIG.DAT", OpenFlags::RDONLY).expect("open");

    // Forward, far past the current cluster.
    volume_mgr.lseek(fd, 2000, Whence::Set).expect("seek");
    let mut buffer = [0u8; 100];
    assert_eq!(volume_mgr.read(fd, &mut buffer).expect("read"), 100);
    for (i, byte) in buffer.iter().enumerate() {
        assert_eq!(*byte, common::big_dat_byte(2000 + i));
    }

    // Backwards, which restarts the chain walk from the first cluster.
    volume_mgr.lseek(fd, 700, Whence::Set).expect("seek");
    assert_eq!(volume_mgr.read(fd, &mut buffer).expect("read"), 100);
    for (i, byte) in buffer.iter().enumerate() {
        assert_eq!(*byte, common::big_dat_byte(700 + i));
    }

    // A short forward hop within the same cluster.
    volume_mgr.lseek(fd, 10, Whence::Cur).expect("seek");
    assert_eq!(volume_mgr.read(fd, &mut buffer).expect("read"), 100);
    for (i, byte) in buffer.iter().enumerate() {
        assert_eq!(*byte, common::big_dat_byte(810 + i));
    }

    volume_mgr.close(fd).expect("close");
}

#[test]
fn seek_works_on_every_descriptor_independently() {
    let mut volume_mgr = Manager::mount(common::make_fat16_disk()).expect("mount");
    let fd_a = volume_mgr.open("/BIG.DAT", OpenFlags::RDONLY).expect("open");
    let fd_b = volume_mgr.open("/BIG.DAT", OpenFlags::RDONLY).expect("open");

    volume_mgr.lseek(fd_a, 1000, Whence::Set).expect("seek");
    volume_mgr.lseek(fd_b, 2000, Whence::Set).expect("seek");

    let mut a = [0u8; 16];
    let mut b = [0u8; 16];
    volume_mgr.read(fd_a, &mut a).expect("read");
    volume_mgr.read(fd_b, &mut b).expect("read");
    for i in 0..16 {
        assert_eq!(a[i], common::big_dat_byte(1000 + i));
        assert_eq!(b[i], common::big_dat_byte(2000 + i));
    }

    volume_mgr.close(fd_a).expect("close");
    volume_mgr.close(fd_b).expect("close");
}
