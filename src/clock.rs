//! Clock - Millisecond Time
//!
//! The crate deals exclusively in milliseconds since the unix epoch; every
//! engine and store operation takes its reference timestamp as an argument.
//! Wall-clock reads happen in exactly one place ([`system_now_ms`]), and
//! [`SimClock`] gives tests a time source they fully control.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::TIME_MS_PER_SEC;

/// Current wall-clock time in milliseconds since the unix epoch.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn system_now_ms() -> i64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    elapsed.as_millis() as i64
}

/// A simulated clock for deterministic tests.
///
/// TigerStyle:
/// - Time only moves forward
/// - All time movement is explicit
/// - No reliance on system time
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    /// Current time in milliseconds since epoch
    current_ms: i64,
}

impl SimClock {
    /// Create a new clock starting at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self { current_ms: 0 }
    }

    /// Create a clock starting at the given time.
    ///
    /// # Panics
    /// Panics if `start_ms` is negative.
    #[must_use]
    pub fn at_ms(start_ms: i64) -> Self {
        // Precondition
        assert!(start_ms >= 0, "start_ms must be non-negative, got {start_ms}");

        Self { current_ms: start_ms }
    }

    /// Get current time in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> i64 {
        self.current_ms
    }

    /// Advance time by the given milliseconds.
    ///
    /// # Panics
    /// Panics if `ms` is negative.
    ///
    /// # Returns
    /// The new current time.
    pub fn advance_ms(&mut self, ms: i64) -> i64 {
        // Precondition
        assert!(ms >= 0, "advance_ms({ms}) must be non-negative");

        let old_time = self.current_ms;
        self.current_ms = self.current_ms.saturating_add(ms);

        // Postcondition
        assert!(self.current_ms >= old_time, "time must not go backwards");

        self.current_ms
    }

    /// Advance time by the given seconds.
    ///
    /// # Panics
    /// Panics if `secs` is negative.
    pub fn advance_secs(&mut self, secs: i64) -> i64 {
        // Precondition
        assert!(secs >= 0, "secs must be non-negative, got {secs}");

        self.advance_ms(secs.saturating_mul(TIME_MS_PER_SEC))
    }

    /// Set time to an absolute value.
    ///
    /// # Panics
    /// Panics if the new time is less than the current time.
    pub fn set_ms(&mut self, ms: i64) {
        // Precondition
        assert!(
            ms >= self.current_ms,
            "cannot set time backwards: {} < {}",
            ms,
            self.current_ms
        );

        self.current_ms = ms;
    }
}
