//! In-memory backing store
//!
//! Appended bytes are stored as immutable segments. Once a segment is
//! published it is never touched again, so a reader copying from it can
//! never observe a half-written or reallocated region. Only the segment
//! index grows, and that happens under the write lock.

use parking_lot::RwLock;
use std::io;
use std::sync::Arc;

use super::store::{AppendError, BackingStore};

struct Segment {
    start: u64,
    bytes: Box<[u8]>,
}

impl Segment {
    fn end(&self) -> u64 {
        self.start + self.bytes.len() as u64
    }
}

#[derive(Default)]
struct Segments {
    list: Vec<Segment>,
    len: u64,
}

/// Growable in-memory store
///
/// Multiple clones share the same underlying data.
///
/// # Example
///
/// ```
/// use ioswmr::io::{BackingStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.append(b"hello").unwrap();
/// store.append(b" world").unwrap();
///
/// let mut buf = [0u8; 5];
/// assert_eq!(store.read_at(&mut buf, 6).unwrap(), 5);
/// assert_eq!(&buf, b"world");
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore(Arc<RwLock<Segments>>);

impl MemoryStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of bytes stored
    #[must_use]
    pub fn len(&self) -> u64 {
        self.0.read().len
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the whole contents into a contiguous vector
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let segments = self.0.read();
        let mut out = Vec::with_capacity(usize::try_from(segments.len).unwrap_or(0));
        for segment in &segments.list {
            out.extend_from_slice(&segment.bytes);
        }
        out
    }
}

impl BackingStore for MemoryStore {
    fn append(&self, data: &[u8]) -> Result<usize, AppendError> {
        if data.is_empty() {
            return Ok(0);
        }
        let mut segments = self.0.write();
        let start = segments.len;
        segments.list.push(Segment {
            start,
            bytes: data.into(),
        });
        segments.len += data.len() as u64;
        Ok(data.len())
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let segments = self.0.read();
        if offset >= segments.len {
            return Ok(0);
        }

        let first = segments.list.partition_point(|s| s.end() <= offset);
        let mut copied = 0;
        let mut pos = offset;
        for segment in &segments.list[first..] {
            if copied == buf.len() {
                break;
            }
            // pos lies inside this segment, so the skip fits the segment length
            #[allow(clippy::cast_possible_truncation)]
            let skip = (pos - segment.start) as usize;
            let src = &segment.bytes[skip..];
            let n = src.len().min(buf.len() - copied);
            buf[copied..copied + n].copy_from_slice(&src[..n]);
            copied += n;
            pos += n as u64;
        }
        Ok(copied)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let segments = self.0.read();
        f.debug_struct("MemoryStore")
            .field("len", &segments.len)
            .field("segments", &segments.list.len())
            .finish()
    }
}
