//! Paste - The Ephemeral Record
//!
//! TigerStyle: one record type, one availability predicate.
//!
//! The predicate lives here and nowhere else. Both storage backends and any
//! diagnostic tooling answer "can this still be read?" through
//! [`Paste::is_available`]; the postgres backend transliterates it into SQL
//! and its tests hold the two in agreement.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::constants::PASTE_ID_ENTROPY_BYTES;

/// An ephemeral paste record.
///
/// `content` and the creation metadata never change after creation. `views`
/// is the only mutable field, and it is only ever incremented through the
/// store's atomic increment-and-check operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paste {
    /// Opaque unique token, generated at creation.
    pub id: String,
    /// The text blob. Non-empty at creation, immutable after.
    pub content: String,
    /// Creation timestamp, milliseconds since epoch.
    pub created_at: i64,
    /// Time deadline; `None` means no time-based expiry.
    pub expires_at: Option<i64>,
    /// View quota; `None` means unlimited views.
    pub max_views: Option<i64>,
    /// Views granted so far. Starts at 0, monotonically non-decreasing.
    pub views: i64,
}

impl Paste {
    /// Create a new record with a freshly generated id and zero views.
    ///
    /// Callers validate user input before getting here; these are internal
    /// invariants, not input checks.
    ///
    /// # Panics
    /// Panics if `content` is blank, `expires_at` is not after `created_at`,
    /// or `max_views` is not at least 1.
    #[must_use]
    pub fn new(
        content: String,
        created_at: i64,
        expires_at: Option<i64>,
        max_views: Option<i64>,
    ) -> Self {
        // Preconditions
        assert!(!content.trim().is_empty(), "content cannot be blank");
        if let Some(expires_at) = expires_at {
            assert!(
                expires_at > created_at,
                "expires_at {expires_at} must be after created_at {created_at}"
            );
        }
        if let Some(max_views) = max_views {
            assert!(max_views >= 1, "max_views must be >= 1, got {max_views}");
        }

        Self {
            id: generate_id(),
            content,
            created_at,
            expires_at,
            max_views,
            views: 0,
        }
    }

    /// The availability predicate.
    ///
    /// A paste is available at `now_ms` iff its time deadline has not been
    /// reached and its view quota is not exhausted. The transition to
    /// unavailable is one-way: time moves forward and views never decrease,
    /// so once this returns `false` for some timestamp it returns `false`
    /// for every later one.
    #[must_use]
    pub fn is_available(&self, now_ms: i64) -> bool {
        if let Some(expires_at) = self.expires_at {
            if now_ms >= expires_at {
                return false;
            }
        }
        if let Some(max_views) = self.max_views {
            if self.views >= max_views {
                return false;
            }
        }
        true
    }

    /// Views left once `views_after` have been granted, `None` when the
    /// paste has no quota.
    #[must_use]
    pub fn remaining_views_after(&self, views_after: i64) -> Option<i64> {
        self.max_views.map(|max_views| max_views - views_after)
    }
}

/// Generate an opaque paste id: 128 bits of OS entropy, hex-encoded.
///
/// The store performs no uniqueness check; collisions are negligible at this
/// entropy, which is why creation is a plain `put`.
#[must_use]
pub fn generate_id() -> String {
    let mut bytes = [0u8; PASTE_ID_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
