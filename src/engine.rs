//! PasteEngine - Lifecycle Logic
//!
//! The pure logic layer: constructs records from user input and reads them
//! back through the store's atomic increment. No I/O of its own, no global
//! state; the store is an injected capability.

use std::sync::Arc;

use thiserror::Error;

use crate::constants::{TIME_MS_PER_SEC, TTL_SECONDS_MAX};
use crate::paste::Paste;
use crate::storage::{PasteStore, StorageError, ViewOutcome};

/// Failure taxonomy of the lifecycle engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed create input; a client fault, never retried.
    #[error("validation error: {0}")]
    Validation(&'static str),

    /// No paste under this id.
    #[error("paste not found")]
    NotFound,

    /// The paste exists but is expired or has exhausted its view quota.
    /// Transports must render this exactly like [`EngineError::NotFound`] so
    /// a probing client cannot learn whether an id ever existed.
    #[error("paste unavailable")]
    Unavailable,

    /// Backend I/O failure; a server fault.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What a granted read hands to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewReceipt {
    /// The paste text.
    pub content: String,
    /// Views left after this one; `None` when the paste has no quota.
    pub remaining_views: Option<i64>,
    /// Time deadline in milliseconds since epoch, if any.
    pub expires_at: Option<i64>,
}

/// The paste lifecycle engine.
pub struct PasteEngine {
    store: Arc<dyn PasteStore>,
}

impl PasteEngine {
    /// Create an engine over an injected store.
    #[must_use]
    pub fn new(store: Arc<dyn PasteStore>) -> Self {
        Self { store }
    }

    /// Validate user input, construct the record, and persist it.
    ///
    /// `expires_at` is `now_ms + ttl_seconds * 1000` when a TTL is given,
    /// else `None`.
    ///
    /// # Errors
    /// - `Validation("empty content")` when `content` is blank after trim
    /// - `Validation("invalid ttl")` when a TTL is given and is not in
    ///   `1..=TTL_SECONDS_MAX`
    /// - `Validation("invalid max_views")` when a quota is given and is `< 1`
    /// - `Storage` when the put fails
    pub async fn create(
        &self,
        content: &str,
        ttl_seconds: Option<i64>,
        max_views: Option<i64>,
        now_ms: i64,
    ) -> Result<Paste, EngineError> {
        if content.trim().is_empty() {
            return Err(EngineError::Validation("empty content"));
        }

        let expires_at = match ttl_seconds {
            None => None,
            Some(ttl) => {
                if !(1..=TTL_SECONDS_MAX).contains(&ttl) {
                    return Err(EngineError::Validation("invalid ttl"));
                }
                let deadline = ttl
                    .checked_mul(TIME_MS_PER_SEC)
                    .and_then(|ms| now_ms.checked_add(ms))
                    .ok_or(EngineError::Validation("invalid ttl"))?;
                Some(deadline)
            }
        };

        if let Some(max_views) = max_views {
            if max_views < 1 {
                return Err(EngineError::Validation("invalid max_views"));
            }
        }

        let paste = Paste::new(content.to_string(), now_ms, expires_at, max_views);
        self.store.put(&paste).await?;

        tracing::debug!(id = %paste.id, expires_at = ?paste.expires_at, max_views = ?paste.max_views, "paste created");

        // Postconditions
        assert_eq!(paste.views, 0, "new paste starts unviewed");
        assert!(paste.is_available(now_ms), "new paste must be available");

        Ok(paste)
    }

    /// Read a paste, consuming one view.
    ///
    /// Delegates the check-and-increment to the store's atomic operation.
    /// `remaining_views` is computed after the increment:
    /// `max_views - views_after`.
    ///
    /// # Errors
    /// `NotFound`, `Unavailable`, or `Storage`.
    pub async fn read(&self, id: &str, now_ms: i64) -> Result<ViewReceipt, EngineError> {
        match self.store.increment_views_and_check(id, now_ms).await? {
            ViewOutcome::Granted(before) => {
                let views_after = before.views + 1;
                let remaining_views = before.remaining_views_after(views_after);

                // Postcondition: a granted view never exceeds the quota.
                if let Some(remaining) = remaining_views {
                    assert!(remaining >= 0, "view granted past quota");
                }

                Ok(ViewReceipt {
                    remaining_views,
                    expires_at: before.expires_at,
                    content: before.content,
                })
            }
            ViewOutcome::Unavailable => Err(EngineError::Unavailable),
            ViewOutcome::NotFound => Err(EngineError::NotFound),
        }
    }
}
