//! Error types for the SWMR stream

use std::io;

use crate::io::AppendError;

/// Error type for stream operations
///
/// End of stream is not an error: readers report it as `Ok(0)`.
#[derive(Debug, thiserror::Error)]
pub enum SwmrError {
    /// Write attempted after `close()`
    #[error("write to a closed stream")]
    Closed,

    /// Backing store append failure
    #[error(transparent)]
    Append(#[from] AppendError),

    /// Backing store failure, passed through verbatim
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl SwmrError {
    /// Check if this is the closed-stream error
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl From<SwmrError> for io::Error {
    fn from(e: SwmrError) -> Self {
        match e {
            SwmrError::Io(e) | SwmrError::Append(AppendError { source: e, .. }) => e,
            SwmrError::Closed => io::Error::new(io::ErrorKind::BrokenPipe, e.to_string()),
        }
    }
}
