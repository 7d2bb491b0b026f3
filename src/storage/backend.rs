//! PasteStore - Storage Backend Trait

use async_trait::async_trait;

use super::error::StorageResult;
use crate::paste::Paste;

/// Outcome of the atomic increment-and-check operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome {
    /// The view was granted. Carries the record *as it was before the
    /// increment*, so callers can compute remaining views from
    /// `paste.views + 1`.
    Granted(Paste),
    /// The record exists but fails the availability predicate (expired or
    /// quota exhausted).
    Unavailable,
    /// No record under this id.
    NotFound,
}

/// Durable, keyed persistence for paste records.
///
/// # Atomicity contract
///
/// `increment_views_and_check` is the one concurrency-sensitive operation: a
/// naive read-decide-write lets two concurrent readers of a `max_views = 1`
/// paste both pass the check before either writes back. Implementations must
/// execute the availability check and the counter bump as a single atomic
/// unit against the medium, with linearizable read-modify-write semantics
/// per key. Operations on different ids must not serialize against each
/// other, and no implementation may hold a process-wide lock across an I/O
/// suspension.
#[async_trait]
pub trait PasteStore: Send + Sync {
    /// Insert or overwrite the record at `paste.id`.
    ///
    /// No uniqueness check: id collisions are made negligible by the
    /// generator's entropy, not by the store.
    async fn put(&self, paste: &Paste) -> StorageResult<()>;

    /// Fetch the current record for `id`. Absence is `Ok(None)`, distinct
    /// from an I/O failure.
    async fn get(&self, id: &str) -> StorageResult<Option<Paste>>;

    /// Atomically evaluate availability at `now_ms` and, if available,
    /// increment the view counter and persist it.
    async fn increment_views_and_check(
        &self,
        id: &str,
        now_ms: i64,
    ) -> StorageResult<ViewOutcome>;

    /// Trivial store round trip for readiness probes.
    async fn healthcheck(&self) -> StorageResult<()>;
}
