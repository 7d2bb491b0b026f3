//! Storage - Paste Store Trait and Backends
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      PasteStore Trait                        │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                              ↑
//!          │                              │
//! ┌────────┴────────┐           ┌────────┴────────┐
//! │  MemoryBackend  │           │ PostgresBackend │
//! │   (key-value)   │           │   (row store)   │
//! └─────────────────┘           └─────────────────┘
//! ```
//!
//! Both backends honor the identical contract; the concurrency-sensitive
//! part is [`PasteStore::increment_views_and_check`], which must execute the
//! availability check and the counter bump as one atomic unit per key.

mod backend;
mod error;
mod memory;

#[cfg(feature = "postgres")]
mod postgres;

pub use backend::{PasteStore, ViewOutcome};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;

#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;
