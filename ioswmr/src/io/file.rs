//! Durable file-backed store
//!
//! The writer keeps one handle open for appending and syncs it to stable
//! storage after every write. Each read opens its own short-lived handle on
//! the same path, so readers never share the writer's file position.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::store::{AppendError, BackingStore};

/// How appended bytes are forced to stable storage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// Sync data and metadata (`File::sync_all`)
    #[default]
    All,
    /// Sync data only (`File::sync_data`)
    Data,
}

/// Writer handle and the file position where the next append lands
struct WriteEnd {
    file: File,
    end: u64,
}

/// File-backed store
///
/// Store offset 0 is the file position the stream started at, so a file
/// with existing content only exposes what was appended through the store.
///
/// # Thread Safety
///
/// - `append()` serializes on the writer handle's `parking_lot::Mutex`
///   and returns only after the sync completed, so a `read_at()` issued
///   afterwards from any thread observes the bytes.
/// - `read_at()` takes no lock at all: it opens an independent handle.
pub struct FileStore {
    writer: Mutex<WriteEnd>,
    base: u64,
    path: PathBuf,
    sync: SyncMode,
}

impl FileStore {
    /// Create (or truncate) the file at `path`
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        Ok(Self::starting_at(file, path, 0))
    }

    /// Open the file at `path` for appending, creating it if needed
    ///
    /// Existing content is kept on disk but is not part of the stream.
    pub fn open_append(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let base = file.metadata()?.len();
        Ok(Self::starting_at(file, path, base))
    }

    /// Wrap an already open, writable file handle
    ///
    /// `path` must name the same file: readers open it independently.
    /// The stream starts at the handle's current position. Append-mode
    /// handles always write at the end of the file, so seek them there first.
    pub fn from_file(mut file: File, path: impl Into<PathBuf>) -> io::Result<Self> {
        let base = file.stream_position()?;
        Ok(Self::starting_at(file, path, base))
    }

    fn starting_at(file: File, path: impl Into<PathBuf>, base: u64) -> Self {
        Self {
            writer: Mutex::new(WriteEnd { file, end: base }),
            base,
            path: path.into(),
            sync: SyncMode::default(),
        }
    }

    #[must_use]
    pub fn with_sync_mode(mut self, sync: SyncMode) -> Self {
        self.sync = sync;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn sync_mode(&self) -> SyncMode {
        self.sync
    }

    /// File position of store offset 0
    #[must_use]
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Undo a partly done append by cutting the file back to `writer.end`
    ///
    /// Returns the error to report: `written` is 0 if the cut succeeded.
    fn roll_back(writer: &mut WriteEnd, written: usize, source: io::Error) -> AppendError {
        if written == 0 {
            return source.into();
        }
        let end = writer.end;
        let undo = writer
            .file
            .set_len(end)
            .and_then(|()| writer.file.seek(SeekFrom::Start(end)).map(|_| ()));
        match undo {
            Ok(()) => source.into(),
            Err(e) => {
                log::warn!("file_store.append: rollback to {end} failed: {e}");
                writer.end += written as u64;
                AppendError { written, source }
            }
        }
    }
}

impl BackingStore for FileStore {
    fn append(&self, data: &[u8]) -> Result<usize, AppendError> {
        let mut writer = self.writer.lock();

        let mut written = 0;
        while written < data.len() {
            match writer.file.write(&data[written..]) {
                Ok(0) => {
                    let e = io::Error::new(io::ErrorKind::WriteZero, "failed to write whole buffer");
                    return Err(Self::roll_back(&mut writer, written, e));
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Self::roll_back(&mut writer, written, e)),
            }
        }
        let synced = match self.sync {
            SyncMode::All => writer.file.sync_all(),
            SyncMode::Data => writer.file.sync_data(),
        };
        if let Err(e) = synced {
            return Err(Self::roll_back(&mut writer, written, e));
        }

        writer.end += written as u64;
        Ok(written)
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.base + offset))?;

        // Fill as much of `buf` as the file holds; hitting the end after
        // some bytes is a plain short read.
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("base", &self.base)
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}
