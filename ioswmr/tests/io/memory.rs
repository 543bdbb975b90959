use std::sync::Arc;
use std::thread;

use ioswmr::io::{BackingStore, MemoryStore};

#[test]
fn test_append_returns_count() {
    let store = MemoryStore::new();
    assert_eq!(store.append(b"hello").unwrap(), 5);
    assert_eq!(store.append(b" world").unwrap(), 6);
    assert_eq!(store.len(), 11);
    assert_eq!(store.to_vec(), b"hello world");
}

#[test]
fn test_read_at_every_offset() {
    let store = MemoryStore::new();
    for chunk in [&b"ab"[..], b"c", b"defg"] {
        store.append(chunk).unwrap();
    }

    let all = b"abcdefg";
    for offset in 0..all.len() {
        let mut buf = [0u8; 16];
        let n = store.read_at(&mut buf, offset as u64).unwrap();
        assert_eq!(&buf[..n], &all[offset..]);
    }
}

#[test]
fn test_reads_concurrent_with_appends_never_see_torn_data() {
    let store = Arc::new(MemoryStore::new());
    let chunk = [7u8; 1000];

    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let mut buf = vec![0u8; 3000];
            for _ in 0..1000 {
                let len = store.len();
                let n = store.read_at(&mut buf, 0).unwrap();
                // Everything published before the read is visible
                assert!(n as u64 >= len.min(3000));
                assert!(buf[..n].iter().all(|&b| b == 7));
            }
        })
    };

    for _ in 0..200 {
        store.append(&chunk).unwrap();
    }
    reader.join().unwrap();
}

#[test]
fn test_arc_store_is_a_store() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let boxed: Box<dyn BackingStore> = Box::new(Arc::clone(&store));
    boxed.append(b"via box").unwrap();

    let mut buf = [0u8; 7];
    assert_eq!(store.read_at(&mut buf, 0).unwrap(), 7);
    assert_eq!(&buf, b"via box");
}
