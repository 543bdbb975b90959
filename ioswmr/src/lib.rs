//! Single-writer, multiple-reader byte streams
//!
//! One producer appends bytes to a growing, append-only store; any number
//! of readers consume it concurrently, each at its own offset. Readers that
//! catch up with the writer block until more data arrives or the stream is
//! closed.
//!
//! ```
//! use std::io::Read;
//! use ioswmr::Swmr;
//!
//! let stream = Swmr::new();
//! let mut early = stream.new_reader();
//!
//! stream.append(b"Hello ").unwrap();
//! stream.append(b"World!").unwrap();
//! stream.close();
//!
//! let mut late = stream.new_reader();
//! let (mut a, mut b) = (String::new(), String::new());
//! early.read_to_string(&mut a).unwrap();
//! late.read_to_string(&mut b).unwrap();
//! assert_eq!(a, "Hello World!");
//! assert_eq!(b, "Hello World!");
//! ```

pub mod error;
pub mod io;
pub mod swmr;
pub mod wake;

pub use error::SwmrError;
pub use io::{AppendError, BackingStore, FileStore, MemoryStore, SyncMode};
pub use swmr::{AsyncReader, Reader, ReaderSource, Swmr};
pub use wake::{Wake, WakeSignal};
