//! Pastebin - Ephemeral Paste Lifecycle Engine
//!
//! A client submits text and gets back a unique shareable id; the text stays
//! retrievable until one of two independent expiry conditions fires: a time
//! deadline or a view-count quota. Once a paste is unavailable it never
//! comes back.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     HTTP transport (axum)                    │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────┐
//! │        PasteEngine (create / read, validation, errors)       │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
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
//! # Invariants
//!
//! - One availability predicate: [`Paste::is_available`] is the only
//!   definition of "still readable"; the postgres backend transliterates it
//!   into the conditional UPDATE, nothing else re-implements it.
//! - The view counter is mutated exclusively through
//!   [`storage::PasteStore::increment_views_and_check`], an atomic per-key
//!   read-modify-write. Two concurrent readers of a `max_views = 1` paste
//!   can never both be granted the view.
//! - Storage is an injected capability ([`engine::PasteEngine::new`] takes an
//!   `Arc<dyn PasteStore>`), never a process global.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod constants;
pub mod engine;
pub mod paste;
pub mod server;
pub mod storage;

// Re-export common types
pub use engine::{EngineError, PasteEngine, ViewReceipt};
pub use paste::Paste;
pub use storage::{MemoryBackend, PasteStore, StorageError, StorageResult, ViewOutcome};

#[cfg(feature = "postgres")]
pub use storage::PostgresBackend;
