//! MemoryBackend - Flat Key-Value Storage
//!
//! In-process variant of the store: one entry per paste keyed
//! `"paste:" + id`. The medium (a sharded concurrent map) has no
//! compare-and-swap over whole values, so atomicity comes from the
//! per-key mutual-exclusion scope instead: the increment path takes the
//! map's exclusive entry guard and holds it across the availability check
//! and the counter bump. Readers of one paste serialize on that entry;
//! other keys are untouched, and the guard is never held across an await.

use async_trait::async_trait;
use dashmap::DashMap;

use super::backend::{PasteStore, ViewOutcome};
use super::error::StorageResult;
use crate::constants::{HEALTHCHECK_KEY, KV_KEY_PREFIX};
use crate::paste::Paste;

/// In-memory key-value backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, Paste>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    fn key(id: &str) -> String {
        format!("{KV_KEY_PREFIX}{id}")
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the backend holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl PasteStore for MemoryBackend {
    async fn put(&self, paste: &Paste) -> StorageResult<()> {
        // Precondition
        assert!(!paste.id.is_empty(), "paste must have id");

        self.entries.insert(Self::key(&paste.id), paste.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<Option<Paste>> {
        // Precondition
        assert!(!id.is_empty(), "id cannot be empty");

        Ok(self.entries.get(&Self::key(id)).map(|e| e.value().clone()))
    }

    async fn increment_views_and_check(
        &self,
        id: &str,
        now_ms: i64,
    ) -> StorageResult<ViewOutcome> {
        // Precondition
        assert!(!id.is_empty(), "id cannot be empty");

        // get_mut holds the exclusive entry lock for the whole check-and-bump.
        let Some(mut entry) = self.entries.get_mut(&Self::key(id)) else {
            return Ok(ViewOutcome::NotFound);
        };

        if !entry.value().is_available(now_ms) {
            return Ok(ViewOutcome::Unavailable);
        }

        let before = entry.value().clone();
        entry.value_mut().views += 1;

        // Postcondition
        assert_eq!(entry.value().views, before.views + 1);

        Ok(ViewOutcome::Granted(before))
    }

    async fn healthcheck(&self) -> StorageResult<()> {
        // Read round trip through the map; the sentinel key never exists.
        let _ = self.entries.get(HEALTHCHECK_KEY);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn sample_paste(max_views: Option<i64>) -> Paste {
        Paste::new("hello".to_string(), 1000, Some(11_000), max_views)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryBackend::new();
        let paste = sample_paste(None);

        store.put(&paste).await.unwrap();

        let loaded = store.get(&paste.id).await.unwrap();
        assert_eq!(loaded, Some(paste));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryBackend::new();

        let loaded = store.get("does-not-exist").await.unwrap();

        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryBackend::new();
        let mut paste = sample_paste(None);
        store.put(&paste).await.unwrap();

        paste.views = 5;
        store.put(&paste).await.unwrap();

        let loaded = store.get(&paste.id).await.unwrap().unwrap();
        assert_eq!(loaded.views, 5);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_increment_returns_pre_increment_state() {
        let store = MemoryBackend::new();
        let paste = sample_paste(Some(2));
        store.put(&paste).await.unwrap();

        let outcome = store.increment_views_and_check(&paste.id, 1005).await.unwrap();

        match outcome {
            ViewOutcome::Granted(before) => assert_eq!(before.views, 0),
            other => panic!("expected grant, got {other:?}"),
        }
        let stored = store.get(&paste.id).await.unwrap().unwrap();
        assert_eq!(stored.views, 1);
    }

    #[tokio::test]
    async fn test_increment_missing_is_not_found() {
        let store = MemoryBackend::new();

        let outcome = store
            .increment_views_and_check("does-not-exist", 1005)
            .await
            .unwrap();

        assert_eq!(outcome, ViewOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_increment_stops_at_quota() {
        let store = MemoryBackend::new();
        let paste = sample_paste(Some(1));
        store.put(&paste).await.unwrap();

        let first = store.increment_views_and_check(&paste.id, 1005).await.unwrap();
        let second = store.increment_views_and_check(&paste.id, 1006).await.unwrap();

        assert!(matches!(first, ViewOutcome::Granted(_)));
        assert_eq!(second, ViewOutcome::Unavailable);
        let stored = store.get(&paste.id).await.unwrap().unwrap();
        assert_eq!(stored.views, 1);
    }

    #[tokio::test]
    async fn test_increment_respects_deadline() {
        let store = MemoryBackend::new();
        let paste = sample_paste(None);
        store.put(&paste).await.unwrap();

        let outcome = store
            .increment_views_and_check(&paste.id, 11_000)
            .await
            .unwrap();

        assert_eq!(outcome, ViewOutcome::Unavailable);
        let stored = store.get(&paste.id).await.unwrap().unwrap();
        assert_eq!(stored.views, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_increments_grant_exactly_quota() {
        let store = Arc::new(MemoryBackend::new());
        let paste = sample_paste(Some(1));
        store.put(&paste).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = Arc::clone(&store);
            let id = paste.id.clone();
            handles.push(tokio::spawn(async move {
                store.increment_views_and_check(&id, 1005).await.unwrap()
            }));
        }

        let mut granted = 0;
        let mut unavailable = 0;
        for handle in handles {
            match handle.await.unwrap() {
                ViewOutcome::Granted(_) => granted += 1,
                ViewOutcome::Unavailable => unavailable += 1,
                ViewOutcome::NotFound => panic!("paste vanished"),
            }
        }

        assert_eq!(granted, 1);
        assert_eq!(unavailable, 31);
        let stored = store.get(&paste.id).await.unwrap().unwrap();
        assert_eq!(stored.views, 1);
    }

    #[tokio::test]
    async fn test_distinct_ids_are_independent() {
        let store = MemoryBackend::new();
        let a = sample_paste(Some(1));
        let b = sample_paste(Some(1));
        store.put(&a).await.unwrap();
        store.put(&b).await.unwrap();

        let first = store.increment_views_and_check(&a.id, 1005).await.unwrap();
        let second = store.increment_views_and_check(&b.id, 1005).await.unwrap();

        assert!(matches!(first, ViewOutcome::Granted(_)));
        assert!(matches!(second, ViewOutcome::Granted(_)));
    }

    #[tokio::test]
    async fn test_healthcheck_on_empty_store() {
        let store = MemoryBackend::new();

        assert!(store.healthcheck().await.is_ok());
    }
}
