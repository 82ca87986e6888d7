//! Random-access semantics: splicing, persistence, close, concurrency.

use mmap_file::{MappedFile, MmapFileError};
use std::fs;
use std::io::SeekFrom;

#[test]
fn write_at_splices_payload_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("splice.bin");
    fs::write(&path, b"hello world!\nbye.\n").expect("seed");

    let f = MappedFile::open_rw(&path).expect("open_rw");
    assert_eq!(f.write_at(b"bye!\n", 3).expect("write_at"), 5);
    f.sync().expect("sync");

    // Re-read through the filesystem: the payload is spliced in and every
    // other byte is untouched.
    assert_eq!(fs::read(&path).expect("re-read"), b"helbye!\nrld!\nbye.\n");
}

#[test]
fn cursor_write_is_visible_without_sync() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("visible.bin");
    fs::write(&path, b"hello world!").expect("seed");

    let mut f = MappedFile::open_rw(&path).expect("open_rw");
    assert_eq!(f.write(b"bye!").expect("write"), 4);

    // A shared mapping and the file share the page cache; no sync needed
    // for another reader of the same file to observe the store.
    assert_eq!(fs::read(&path).expect("re-read"), b"bye!o world!");
}

#[test]
fn reopen_read_only_observes_synced_bytes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("persist.bin");
    fs::write(&path, &vec![0u8; 4096]).expect("seed");

    let f = MappedFile::open_rw(&path).expect("open_rw");
    f.write_at(b"ABCDEFGHIJ", 0).expect("write head");
    f.write_at(b"klmnop", 100).expect("write middle");
    f.sync().expect("sync");

    let ro = MappedFile::open_ro(&path).expect("open_ro");
    let mut head = [0u8; 10];
    let mut mid = [0u8; 6];
    ro.read_at(&mut head, 0).expect("read head");
    ro.read_at(&mut mid, 100).expect("read middle");
    assert_eq!(&head, b"ABCDEFGHIJ");
    assert_eq!(&mid, b"klmnop");
}

#[test]
fn write_at_short_write_at_extent_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("short.bin");
    fs::write(&path, b"0123456789").expect("seed");

    let f = MappedFile::open_rw(&path).expect("open_rw");
    match f.write_at(b"abcd", 8) {
        Err(MmapFileError::ShortWrite { written, requested }) => {
            assert_eq!(written, 2);
            assert_eq!(requested, 4);
        }
        other => panic!("expected ShortWrite, got {other:?}"),
    }
    let mut tail = [0u8; 2];
    f.read_at(&mut tail, 8).expect("read tail");
    assert_eq!(&tail, b"ab");

    // Offsets beyond the extent are rejected outright.
    assert!(matches!(
        f.write_at(b"x", 11),
        Err(MmapFileError::InvalidOffset { offset: 11, len: 10 })
    ));
}

#[test]
fn every_operation_reports_closed_after_close() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("closed.bin");
    fs::write(&path, b"0123456789").expect("seed");

    let mut f = MappedFile::open_rw(&path).expect("open_rw");
    f.close().expect("close");

    let mut buf = [0u8; 4];
    assert!(matches!(
        f.read_at(&mut buf, 0),
        Err(MmapFileError::Closed)
    ));
    assert!(matches!(f.write_at(b"x", 0), Err(MmapFileError::Closed)));
    assert!(matches!(f.read(&mut buf), Err(MmapFileError::Closed)));
    assert!(matches!(f.write(b"x"), Err(MmapFileError::Closed)));
    assert!(matches!(f.read_byte(), Err(MmapFileError::Closed)));
    assert!(matches!(f.write_byte(b'x'), Err(MmapFileError::Closed)));
    assert!(matches!(
        f.seek(SeekFrom::Start(0)),
        Err(MmapFileError::Closed)
    ));
    assert!(matches!(f.sync(), Err(MmapFileError::Closed)));

    f.close().expect("second close is a no-op");
}

#[test]
fn concurrent_read_at_from_many_threads() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("concurrent_read.bin");
    let content: Vec<u8> = (0..8192u32).map(|i| (i % 251) as u8).collect();
    fs::write(&path, &content).expect("seed");

    let f = MappedFile::open_ro(&path).expect("open_ro");
    std::thread::scope(|s| {
        for chunk in 0..8 {
            let f = &f;
            let want = &content;
            s.spawn(move || {
                let offset = chunk * 1024;
                let mut buf = [0u8; 1024];
                let n = f.read_at(&mut buf, offset as u64).expect("read_at");
                assert_eq!(n, 1024);
                assert_eq!(&buf[..], &want[offset..offset + 1024]);
            });
        }
    });
}

#[test]
fn concurrent_write_at_on_disjoint_ranges() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("concurrent_write.bin");
    fs::write(&path, &vec![0u8; 4096]).expect("seed");

    let f = MappedFile::open_rw(&path).expect("open_rw");
    std::thread::scope(|s| {
        for chunk in 0u8..4 {
            let f = &f;
            s.spawn(move || {
                let payload = [chunk + 1; 1024];
                let offset = u64::from(chunk) * 1024;
                assert_eq!(f.write_at(&payload, offset).expect("write_at"), 1024);
            });
        }
    });

    let mut buf = vec![0u8; 4096];
    f.read_at(&mut buf, 0).expect("read back");
    for chunk in 0usize..4 {
        assert!(buf[chunk * 1024..(chunk + 1) * 1024]
            .iter()
            .all(|&b| b == chunk as u8 + 1));
    }
}
