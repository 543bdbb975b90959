//! Backing stores for SWMR streams
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Swmr (coordination layer)          │
//! │  - length + closed flag             │
//! │  - wake signal for blocked readers  │
//! └─────────────────────────────────────┘
//!          ▲
//!          │ uses BackingStore for storage
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  BackingStore (shared storage)      │
//! │  - append() by the single writer    │
//! │  - read_at() by any reader          │
//! └─────────────────────────────────────┘
//!      ▲                  ▲
//!      │                  │
//!   MemoryStore       FileStore
//! ```

pub mod file;
pub mod memory;
pub mod store;

pub use file::{FileStore, SyncMode};
pub use memory::MemoryStore;
pub use store::{AppendError, BackingStore};
