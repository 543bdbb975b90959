//! Single-writer, multiple-reader stream
//!
//! Implements a broadcast-style stream where:
//! - One writer appends to a shared backing store
//! - Any number of readers read from the store at their own offsets
//! - Coordination via a wake signal (wait when no data available)

use parking_lot::Mutex;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::SwmrError;
use crate::io::{BackingStore, FileStore, MemoryStore};
use crate::wake::{Wake, WakeSignal};

/// State shared between the writer and all readers
struct Shared<S> {
    store: S,
    len: AtomicU64,
    closed: AtomicBool,
    signal: WakeSignal,
    debug_hint: String,
}

impl<S: BackingStore> Shared<S> {
    fn len(&self) -> u64 {
        self.len.load(Ordering::Acquire)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Writer side of the stream
///
/// Appends go to the backing store first; only then is the length advanced
/// and waiting readers woken. Dropping the writer closes the stream.
///
/// # Thread Safety
///
/// - `append()` and `close()` serialize on an internal `parking_lot::Mutex`,
///   so a close never overtakes an append that already started. The stream
///   is designed for one producer; extra producers are serialized, not
///   interleaved.
/// - `len()` and `is_closed()` are lock-free and safe to call from anywhere.
pub struct Swmr<S: BackingStore = MemoryStore> {
    shared: Arc<Shared<S>>,
    write_gate: Mutex<()>,
}

impl Swmr<MemoryStore> {
    /// Create a stream backed by an in-memory store
    #[must_use]
    pub fn new() -> Self {
        Self::with_store("memory", MemoryStore::new())
    }
}

impl Default for Swmr<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl Swmr<FileStore> {
    /// Create (or truncate) a file at `path` and stream through it
    pub fn create_file(debug_hint: &str, path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::with_store(debug_hint, FileStore::create(path)?))
    }

    /// Stream through an already open file handle
    ///
    /// `path` must name the same file; readers open it independently.
    /// The stream starts at the handle's current position.
    pub fn from_file(debug_hint: &str, file: File, path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::with_store(debug_hint, FileStore::from_file(file, path.as_ref())?))
    }
}

impl<S: BackingStore> Swmr<S> {
    /// Create a stream over the given store
    ///
    /// Readers start at offset 0 and never read past the stream length,
    /// which counts only bytes appended through this writer. Bytes a store
    /// already held are never delivered past that length.
    #[must_use]
    pub fn with_store(debug_hint: &str, store: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                len: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                signal: WakeSignal::new(),
                debug_hint: debug_hint.to_string(),
            }),
            write_gate: Mutex::new(()),
        }
    }

    /// Append data to the stream
    ///
    /// Returns:
    /// - `Ok(n)`: number of bytes the store accepted, now visible to readers
    /// - `Ok(0)`: empty input (no store call, no wake-up)
    /// - `Err(SwmrError::Closed)`: the stream was closed
    /// - `Err(SwmrError::Append)`: the store failed; whatever it kept anyway
    ///   (`AppendError::written`) is published so the length stays in step
    ///   with the store
    pub fn append(&self, data: &[u8]) -> Result<usize, SwmrError> {
        let _gate = self.write_gate.lock();
        let shared = &*self.shared;

        if shared.is_closed() {
            return Err(SwmrError::Closed);
        }
        if data.is_empty() {
            // Empty writes should not wake up waiting readers.
            return Ok(0);
        }

        let n = match shared.store.append(data) {
            Ok(n) => n,
            Err(e) => {
                log::warn!("swmr.append: store failed for '{}': {e}", shared.debug_hint);
                self.publish(e.written);
                return Err(e.into());
            }
        };
        self.publish(n);
        log::debug!(
            "swmr.append: '{}' wrote {n} of {} bytes, len={}",
            shared.debug_hint,
            data.len(),
            shared.len()
        );
        Ok(n)
    }

    fn publish(&self, n: usize) {
        if n > 0 {
            // Publish the length before waking, readers re-check it under the signal lock
            self.shared.len.fetch_add(n as u64, Ordering::AcqRel);
            self.shared.signal.pulse();
        }
    }

    /// Total bytes written so far
    #[must_use]
    pub fn len(&self) -> u64 {
        self.shared.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Close the stream and release all waiting readers
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) {
        let _gate = self.write_gate.lock();
        let shared = &*self.shared;
        if shared.closed.swap(true, Ordering::AcqRel) {
            log::debug!("swmr.close: '{}' already closed", shared.debug_hint);
            return;
        }
        shared.signal.shut();
        log::debug!("swmr.close: '{}' closed at len={}", shared.debug_hint, shared.len());
    }

    /// Get the backing store
    #[must_use]
    pub fn store(&self) -> &S {
        &self.shared.store
    }

    /// Create a blocking reader at offset 0
    #[must_use]
    pub fn new_reader(&self) -> Reader<S> {
        Reader::new(Arc::clone(&self.shared))
    }

    /// Create an async reader at offset 0
    #[must_use]
    pub fn new_async_reader(&self) -> AsyncReader<S> {
        AsyncReader::new(Arc::clone(&self.shared))
    }

    /// Get a reader factory that can be handed to consumer threads
    #[must_use]
    pub fn reader_source(&self) -> ReaderSource<S> {
        ReaderSource {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: BackingStore> io::Write for Swmr<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.append(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: BackingStore> fmt::Debug for Swmr<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Swmr(len={}, closed={}, hint={})",
            self.shared.len(),
            self.shared.is_closed(),
            self.shared.debug_hint
        )
    }
}

impl<S: BackingStore> Drop for Swmr<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Detached factory for readers
///
/// This can be cloned and sent to other threads to create independent
/// readers without access to the writer side.
pub struct ReaderSource<S: BackingStore = MemoryStore> {
    shared: Arc<Shared<S>>,
}

impl<S: BackingStore> ReaderSource<S> {
    #[must_use]
    pub fn new_reader(&self) -> Reader<S> {
        Reader::new(Arc::clone(&self.shared))
    }

    #[must_use]
    pub fn new_async_reader(&self) -> AsyncReader<S> {
        AsyncReader::new(Arc::clone(&self.shared))
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.shared.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl<S: BackingStore> Clone for ReaderSource<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: BackingStore> fmt::Debug for ReaderSource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReaderSource(hint={})", self.shared.debug_hint)
    }
}

/// Offset into a shared stream, common to blocking and async readers
struct Cursor<S> {
    shared: Arc<Shared<S>>,
    offset: u64,
}

impl<S: BackingStore> Cursor<S> {
    fn caught_up(&self) -> bool {
        self.offset >= self.shared.len()
    }

    /// Decide what to do after a wait on an empty tail returned
    ///
    /// `true` means end of stream: closed and nothing left at the offset.
    /// Length is re-checked because it may have advanced together with the close.
    fn ended(&self, wake: Wake) -> bool {
        wake == Wake::Closed && self.caught_up()
    }

    /// Positional read at the current offset, advancing on success
    ///
    /// Never reads past the published length, whatever the store holds.
    fn read_store(&mut self, buf: &mut [u8]) -> Result<usize, SwmrError> {
        let published = self.shared.len().saturating_sub(self.offset);
        let limit = usize::try_from(published).map_or(buf.len(), |p| p.min(buf.len()));
        if limit == 0 {
            return Ok(0);
        }
        let n = self.shared.store.read_at(&mut buf[..limit], self.offset)?;
        self.offset += n as u64;
        Ok(n)
    }
}

impl<S> fmt::Debug for Cursor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offset={}, hint={}", self.offset, self.shared.debug_hint)
    }
}

/// Blocking reader of the stream
///
/// Reads from the shared store at its own offset. Blocks when the offset
/// reaches the end of the written data, until more data arrives or the
/// stream is closed.
///
/// # Thread Safety
///
/// - **Independent**: different readers never affect each other; each only
///   holds an offset.
/// - **Not shareable for reads**: `read()` takes `&mut self`, so one reader
///   is driven by one thread at a time.
pub struct Reader<S: BackingStore = MemoryStore> {
    cursor: Cursor<S>,
}

impl<S: BackingStore> Reader<S> {
    fn new(shared: Arc<Shared<S>>) -> Self {
        Self {
            cursor: Cursor { shared, offset: 0 },
        }
    }

    /// Bytes consumed so far
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.cursor.offset
    }

    /// Read data from the stream
    ///
    /// Returns:
    /// - `Ok(n)` with `n > 0`: number of bytes read
    /// - `Ok(0)`: end of stream (closed and everything read), or empty `buf`
    /// - `Err(_)`: the store failed; the offset is unchanged
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, SwmrError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let cursor = &mut self.cursor;
        let shared = Arc::clone(&cursor.shared);

        if cursor.caught_up() {
            let offset = cursor.offset;
            let wake = shared.signal.wait(|| offset < shared.len());
            if cursor.ended(wake) {
                return Ok(0);
            }
        }

        loop {
            let seen = shared.signal.generation();
            let n = cursor.read_store(buf)?;
            if n > 0 {
                return Ok(n);
            }
            // The store had nothing at an offset below the published length
            log::debug!("swmr.read: no data yet at {cursor:?}, waiting for the next write");
            if shared.signal.wait_past(seen) == Wake::Closed {
                return cursor.read_store(buf);
            }
        }
    }
}

impl<S: BackingStore> io::Read for Reader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_bytes(buf)?)
    }
}

impl<S: BackingStore> fmt::Debug for Reader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Swmr.Reader({:?})", self.cursor)
    }
}

/// Async reader of the stream
///
/// Same semantics as [`Reader`], but waiting suspends the task instead of
/// blocking the thread. Store reads still run inline.
pub struct AsyncReader<S: BackingStore = MemoryStore> {
    cursor: Cursor<S>,
}

impl<S: BackingStore> AsyncReader<S> {
    fn new(shared: Arc<Shared<S>>) -> Self {
        Self {
            cursor: Cursor { shared, offset: 0 },
        }
    }

    /// Bytes consumed so far
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.cursor.offset
    }

    /// Read data from the stream
    ///
    /// Returns the same values as [`Reader::read_bytes`].
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, SwmrError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let cursor = &mut self.cursor;
        let shared = Arc::clone(&cursor.shared);

        if cursor.caught_up() {
            let offset = cursor.offset;
            let wake = shared.signal.wait_async(|| offset < shared.len()).await;
            if cursor.ended(wake) {
                return Ok(0);
            }
        }

        loop {
            let seen = shared.signal.generation();
            let n = cursor.read_store(buf)?;
            if n > 0 {
                return Ok(n);
            }
            log::debug!("swmr.read_async: no data yet at {cursor:?}, waiting for the next write");
            if shared.signal.wait_past_async(seen).await == Wake::Closed {
                return cursor.read_store(buf);
            }
        }
    }

    /// Read until end of stream, appending to `out`
    ///
    /// Returns the number of bytes appended.
    pub async fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize, SwmrError> {
        let mut chunk = [0u8; 8192];
        let mut total = 0;
        loop {
            let n = self.read(&mut chunk).await?;
            if n == 0 {
                return Ok(total);
            }
            out.extend_from_slice(&chunk[..n]);
            total += n;
        }
    }
}

impl<S: BackingStore> fmt::Debug for AsyncReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Swmr.AsyncReader({:?})", self.cursor)
    }
}
