use std::fs::File;
use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use ioswmr::io::{AppendError, BackingStore, FileStore};
use ioswmr::{Swmr, SwmrError};

#[test]
fn test_append_visible_to_independent_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stream.bin");
    let store = FileStore::create(&path).unwrap();

    store.append(b"durable").unwrap();

    // Any other handle observes the write as soon as append returns
    assert_eq!(std::fs::read(&path).unwrap(), b"durable");
    let mut buf = [0u8; 4];
    assert_eq!(store.read_at(&mut buf, 3).unwrap(), 4);
    assert_eq!(&buf, b"able");
}

#[test]
fn test_file_stream_readers_started_at_any_time() {
    let dir = tempfile::tempdir().unwrap();
    let stream = Swmr::create_file("file-test", dir.path().join("stream.bin")).unwrap();
    let mut handles = Vec::new();

    for chunk in ["Hello", " ", "World", "!"] {
        let mut reader = stream.new_reader();
        handles.push(thread::spawn(move || {
            let mut got = String::new();
            reader.read_to_string(&mut got).unwrap();
            got
        }));
        thread::sleep(Duration::from_millis(10));
        stream.append(chunk.as_bytes()).unwrap();
    }
    stream.close();

    let mut late = stream.new_reader();
    let mut got = String::new();
    late.read_to_string(&mut got).unwrap();
    assert_eq!(got, "Hello World!");

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "Hello World!");
    }
}

#[test]
fn test_file_stream_from_open_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stream.bin");
    let file = File::create(&path).unwrap();
    let stream = Swmr::from_file("handle-test", file, &path).unwrap();
    assert_eq!(stream.store().path(), path.as_path());

    let data = b"Concurrent Read Data! ".repeat(1024 * 10);
    let handles: Vec<_> = (0..10)
        .map(|_| {
            let mut reader = stream.new_reader();
            let len = data.len();
            thread::spawn(move || {
                let mut buf = vec![0u8; len];
                reader.read_exact(&mut buf).unwrap();
                buf
            })
        })
        .collect();

    stream.append(&data).unwrap();

    for handle in handles {
        assert!(handle.join().unwrap() == data, "reader observed a corrupted copy");
    }
}

#[test]
fn test_open_append_streams_only_new_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stream.bin");
    std::fs::write(&path, b"old").unwrap();

    let stream = Swmr::with_store("append-test", FileStore::open_append(&path).unwrap());
    let mut early = stream.new_reader();
    stream.append(b"new").unwrap();
    stream.close();

    let mut got = String::new();
    early.read_to_string(&mut got).unwrap();
    assert_eq!(got, "new");
    assert_eq!(early.offset(), stream.len());
    assert_eq!(std::fs::read(&path).unwrap(), b"oldnew");
}

#[test]
fn test_from_file_with_positioned_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stream.bin");
    let mut file = File::create(&path).unwrap();
    file.write_all(b"header").unwrap();

    let stream = Swmr::from_file("positioned-test", file, &path).unwrap();
    stream.append(b"body").unwrap();
    stream.close();

    let mut got = String::new();
    stream.new_reader().read_to_string(&mut got).unwrap();
    assert_eq!(got, "body");
    assert_eq!(std::fs::read(&path).unwrap(), b"headerbody");
}

#[test]
fn test_offset_never_passes_length() {
    let dir = tempfile::tempdir().unwrap();
    let stream = Swmr::create_file("bounds-test", dir.path().join("stream.bin")).unwrap();
    let mut reader = stream.new_reader();

    let mut buf = [0u8; 3];
    for chunk in ["Hello", " ", "World", "!"] {
        stream.append(chunk.as_bytes()).unwrap();
        while reader.offset() < stream.len() {
            reader.read(&mut buf).unwrap();
            assert!(reader.offset() <= stream.len());
        }
    }
    assert_eq!(reader.offset(), 12);
}

// File store whose sync fails once after the bytes reached the file
struct FailingSyncStore {
    inner: FileStore,
    fail_next: std::sync::atomic::AtomicBool,
}

impl BackingStore for FailingSyncStore {
    fn append(&self, data: &[u8]) -> Result<usize, AppendError> {
        let written = self.inner.append(data)?;
        if self.fail_next.swap(false, std::sync::atomic::Ordering::AcqRel) {
            return Err(AppendError {
                written,
                source: io::Error::other("fsync EIO"),
            });
        }
        Ok(written)
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.inner.read_at(buf, offset)
    }
}

#[test]
fn test_failed_sync_keeps_length_and_file_in_step() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stream.bin");
    let stream = Swmr::with_store(
        "sync-test",
        FailingSyncStore {
            inner: FileStore::create(&path).unwrap(),
            fail_next: true.into(),
        },
    );

    let err = stream.append(b"lost").unwrap_err();
    assert!(matches!(err, SwmrError::Append(ref e) if e.written == 4));
    assert_eq!(stream.len(), 4);

    stream.append(b"kept").unwrap();
    stream.close();

    let mut reader = stream.new_reader();
    let mut got = Vec::new();
    reader.read_to_end(&mut got).unwrap();
    assert_eq!(got, std::fs::read(&path).unwrap());
    assert_eq!(reader.offset(), stream.len());
}

#[test]
fn test_file_stream_rejects_writes_after_close() {
    let dir = tempfile::tempdir().unwrap();
    let stream = Swmr::create_file("close-test", dir.path().join("stream.bin")).unwrap();
    stream.close();
    stream.close();
    assert!(stream.append(b"late").unwrap_err().is_closed());
}
