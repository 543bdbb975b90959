//! Backing store trait

use std::io;
use std::sync::Arc;

/// Failed append
///
/// `written` is the number of bytes of this call the store kept anyway.
/// Stores that undo a failed write report 0.
#[derive(Debug, thiserror::Error)]
#[error("append failed after {written} bytes: {source}")]
pub struct AppendError {
    pub written: usize,
    #[source]
    pub source: io::Error,
}

impl From<io::Error> for AppendError {
    fn from(source: io::Error) -> Self {
        Self { written: 0, source }
    }
}

/// Append-only byte container with positional reads
///
/// The store is shared by the single writer and every reader, so both
/// operations take `&self` and the implementation provides its own
/// synchronization. Bytes that `append` reported as written, on success
/// or in [`AppendError::written`], must be visible to any later `read_at`
/// from any thread. Offsets count from the first byte appended through
/// the store.
pub trait BackingStore: Send + Sync {
    /// Append bytes to the end of the store.
    ///
    /// Returns the number of bytes written. A store may write fewer bytes
    /// than requested; the coordinator only publishes what was reported.
    fn append(&self, data: &[u8]) -> Result<usize, AppendError>;

    /// Read bytes starting at absolute `offset` into `buf`.
    ///
    /// Returns the number of bytes copied. Short reads are normal.
    /// `Ok(0)` for a non-empty `buf` means there is no data at `offset` (yet).
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

impl<S: BackingStore + ?Sized> BackingStore for Box<S> {
    fn append(&self, data: &[u8]) -> Result<usize, AppendError> {
        (**self).append(data)
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

impl<S: BackingStore + ?Sized> BackingStore for Arc<S> {
    fn append(&self, data: &[u8]) -> Result<usize, AppendError> {
        (**self).append(data)
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}
