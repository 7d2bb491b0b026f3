//! PostgresBackend - Row-Store Backend
//!
//! One row per paste; the availability predicate runs inside a conditional
//! UPDATE so the check and the counter bump are a single statement against
//! the database.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS pastes (
//!     id TEXT PRIMARY KEY,
//!     content TEXT NOT NULL,
//!     created_at BIGINT NOT NULL,
//!     expires_at BIGINT,
//!     max_views BIGINT,
//!     views BIGINT NOT NULL DEFAULT 0
//! );
//! ```

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use super::backend::{PasteStore, ViewOutcome};
use super::error::{StorageError, StorageResult};
use crate::paste::Paste;

/// PostgreSQL storage backend for production use.
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Create a new backend from a connection string and initialize the
    /// schema.
    ///
    /// # Errors
    /// Returns [`StorageError::Connection`] if the pool cannot be created.
    ///
    /// # Panics
    /// Panics if the connection string is empty or not a postgres URL.
    pub async fn new(connection_string: &str) -> StorageResult<Self> {
        // Preconditions
        assert!(
            !connection_string.is_empty(),
            "connection string cannot be empty"
        );
        assert!(
            connection_string.starts_with("postgres://")
                || connection_string.starts_with("postgresql://"),
            "connection string must be a postgres URL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(connection_string)
            .await
            .map_err(|e| StorageError::connection(format!("failed to connect: {e}")))?;

        let backend = Self { pool };
        backend.init_schema().await?;

        Ok(backend)
    }

    /// Create from an existing pool, e.g. one shared with other components.
    ///
    /// # Errors
    /// Returns an error if schema initialization fails.
    pub async fn from_pool(pool: PgPool) -> StorageResult<Self> {
        let backend = Self { pool };
        backend.init_schema().await?;
        Ok(backend)
    }

    async fn init_schema(&self) -> StorageResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS pastes (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                created_at BIGINT NOT NULL,
                expires_at BIGINT,
                max_views BIGINT,
                views BIGINT NOT NULL DEFAULT 0
            );
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::internal(format!("failed to create schema: {e}")))?;

        Ok(())
    }

    /// Get the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Parse a database row into a Paste.
fn row_to_paste(row: &PgRow) -> StorageResult<Paste> {
    let id: String = row
        .try_get("id")
        .map_err(|e| StorageError::internal(e.to_string()))?;
    let content: String = row
        .try_get("content")
        .map_err(|e| StorageError::internal(e.to_string()))?;
    let created_at: i64 = row
        .try_get("created_at")
        .map_err(|e| StorageError::internal(e.to_string()))?;
    let expires_at: Option<i64> = row
        .try_get("expires_at")
        .map_err(|e| StorageError::internal(e.to_string()))?;
    let max_views: Option<i64> = row
        .try_get("max_views")
        .map_err(|e| StorageError::internal(e.to_string()))?;
    let views: i64 = row
        .try_get("views")
        .map_err(|e| StorageError::internal(e.to_string()))?;

    Ok(Paste {
        id,
        content,
        created_at,
        expires_at,
        max_views,
        views,
    })
}

#[async_trait]
impl PasteStore for PostgresBackend {
    async fn put(&self, paste: &Paste) -> StorageResult<()> {
        // Precondition
        assert!(!paste.id.is_empty(), "paste must have id");

        sqlx::query(
            r"
            INSERT INTO pastes (id, content, created_at, expires_at, max_views, views)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                content = EXCLUDED.content,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at,
                max_views = EXCLUDED.max_views,
                views = EXCLUDED.views
            ",
        )
        .bind(&paste.id)
        .bind(&paste.content)
        .bind(paste.created_at)
        .bind(paste.expires_at)
        .bind(paste.max_views)
        .bind(paste.views)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::write(format!("failed to store paste: {e}")))?;

        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<Option<Paste>> {
        // Precondition
        assert!(!id.is_empty(), "id cannot be empty");

        let row = sqlx::query("SELECT * FROM pastes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::read(format!("failed to get paste: {e}")))?;

        match row {
            Some(row) => {
                let paste = row_to_paste(&row)?;
                // Postcondition
                assert_eq!(paste.id, id, "returned paste must match requested id");
                Ok(Some(paste))
            }
            None => Ok(None),
        }
    }

    async fn increment_views_and_check(
        &self,
        id: &str,
        now_ms: i64,
    ) -> StorageResult<ViewOutcome> {
        // Precondition
        assert!(!id.is_empty(), "id cannot be empty");

        // The WHERE clause is Paste::is_available transliterated to SQL, so
        // the check and the bump are one statement; RETURNING reports the
        // pre-increment counter.
        let row = sqlx::query(
            r"
            UPDATE pastes
            SET views = views + 1
            WHERE id = $1
              AND (expires_at IS NULL OR $2 < expires_at)
              AND (max_views IS NULL OR views < max_views)
            RETURNING id, content, created_at, expires_at, max_views,
                      views - 1 AS views
            ",
        )
        .bind(id)
        .bind(now_ms)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::write(format!("failed to increment views: {e}")))?;

        if let Some(row) = row {
            let before = row_to_paste(&row)?;
            // Postcondition
            assert!(
                before.is_available(now_ms),
                "granted paste must have been available"
            );
            return Ok(ViewOutcome::Granted(before));
        }

        // Zero rows matched: distinguish absent from expired or exhausted.
        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM pastes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::read(format!("failed to check paste: {e}")))?;

        Ok(if exists.is_some() {
            ViewOutcome::Unavailable
        } else {
            ViewOutcome::NotFound
        })
    }

    async fn healthcheck(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::connection(format!("healthcheck failed: {e}")))?;
        Ok(())
    }
}

// =============================================================================
// Tests (require running Postgres)
// =============================================================================

#[cfg(test)]
mod tests {
    use std::env;
    use std::sync::Arc;

    use super::*;

    /// Get test database URL from environment.
    fn test_db_url() -> Option<String> {
        env::var("TEST_POSTGRES_URL").ok()
    }

    /// Skip test if no database available.
    macro_rules! require_db {
        () => {
            match test_db_url() {
                Some(url) => url,
                None => {
                    eprintln!("Skipping test: TEST_POSTGRES_URL not set");
                    return;
                }
            }
        };
    }

    async fn clear(backend: &PostgresBackend) {
        sqlx::query("DELETE FROM pastes")
            .execute(backend.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_postgres_connection() {
        let url = require_db!();

        let backend = PostgresBackend::new(&url).await;
        assert!(backend.is_ok(), "should connect to database");

        let backend = backend.unwrap();
        assert!(backend.healthcheck().await.is_ok());
        backend.close().await;
    }

    #[tokio::test]
    async fn test_postgres_put_and_get() {
        let url = require_db!();
        let backend = PostgresBackend::new(&url).await.unwrap();
        clear(&backend).await;

        let paste = Paste::new("hello".to_string(), 1000, Some(11_000), Some(2));
        backend.put(&paste).await.unwrap();

        let loaded = backend.get(&paste.id).await.unwrap();
        assert_eq!(loaded, Some(paste));

        let missing = backend.get("does-not-exist").await.unwrap();
        assert!(missing.is_none());

        backend.close().await;
    }

    #[tokio::test]
    async fn test_postgres_increment_quota_flow() {
        let url = require_db!();
        let backend = PostgresBackend::new(&url).await.unwrap();
        clear(&backend).await;

        let paste = Paste::new("hello".to_string(), 1000, None, Some(1));
        backend.put(&paste).await.unwrap();

        let first = backend
            .increment_views_and_check(&paste.id, 1005)
            .await
            .unwrap();
        match first {
            ViewOutcome::Granted(before) => assert_eq!(before.views, 0),
            other => panic!("expected grant, got {other:?}"),
        }

        let second = backend
            .increment_views_and_check(&paste.id, 1006)
            .await
            .unwrap();
        assert_eq!(second, ViewOutcome::Unavailable);

        let stored = backend.get(&paste.id).await.unwrap().unwrap();
        assert_eq!(stored.views, 1);

        let missing = backend
            .increment_views_and_check("does-not-exist", 1005)
            .await
            .unwrap();
        assert_eq!(missing, ViewOutcome::NotFound);

        backend.close().await;
    }

    #[tokio::test]
    async fn test_postgres_increment_respects_deadline() {
        let url = require_db!();
        let backend = PostgresBackend::new(&url).await.unwrap();
        clear(&backend).await;

        let paste = Paste::new("hello".to_string(), 1000, Some(11_000), None);
        backend.put(&paste).await.unwrap();

        let before_deadline = backend
            .increment_views_and_check(&paste.id, 10_999)
            .await
            .unwrap();
        assert!(matches!(before_deadline, ViewOutcome::Granted(_)));

        let at_deadline = backend
            .increment_views_and_check(&paste.id, 11_000)
            .await
            .unwrap();
        assert_eq!(at_deadline, ViewOutcome::Unavailable);

        backend.close().await;
    }

    /// The SQL predicate must agree with Paste::is_available.
    #[tokio::test]
    async fn test_postgres_predicate_matches_rust_predicate() {
        let url = require_db!();
        let backend = PostgresBackend::new(&url).await.unwrap();
        clear(&backend).await;

        let cases = [
            (Some(11_000), Some(2), 10_999),
            (Some(11_000), Some(2), 11_000),
            (None, Some(1), 1005),
            (Some(11_000), None, 1005),
            (None, None, i64::MAX - 1),
        ];

        for (expires_at, max_views, now_ms) in cases {
            let paste = Paste::new("hello".to_string(), 1000, expires_at, max_views);
            backend.put(&paste).await.unwrap();

            let outcome = backend
                .increment_views_and_check(&paste.id, now_ms)
                .await
                .unwrap();

            let granted = matches!(outcome, ViewOutcome::Granted(_));
            assert_eq!(
                granted,
                paste.is_available(now_ms),
                "predicates diverge for expires_at={expires_at:?} max_views={max_views:?} now={now_ms}"
            );
        }

        backend.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_postgres_concurrent_increments() {
        let url = require_db!();
        let backend = Arc::new(PostgresBackend::new(&url).await.unwrap());
        clear(&backend).await;

        let paste = Paste::new("hello".to_string(), 1000, None, Some(1));
        backend.put(&paste).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let backend = Arc::clone(&backend);
            let id = paste.id.clone();
            handles.push(tokio::spawn(async move {
                backend.increment_views_and_check(&id, 1005).await.unwrap()
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), ViewOutcome::Granted(_)) {
                granted += 1;
            }
        }

        assert_eq!(granted, 1);
        let stored = backend.get(&paste.id).await.unwrap().unwrap();
        assert_eq!(stored.views, 1);

        backend.close().await;
    }
}
