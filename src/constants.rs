//! Constants - Named Units and Limits
//!
//! TigerStyle: magic numbers get a name and a single home.

/// Milliseconds per second, for TTL seconds → expiry timestamp arithmetic.
pub const TIME_MS_PER_SEC: i64 = 1000;

/// Bytes of CSPRNG entropy in a paste id (128 bits).
pub const PASTE_ID_ENTROPY_BYTES: usize = 16;

/// Key prefix used by the flat key-value backend.
pub const KV_KEY_PREFIX: &str = "paste:";

/// Sentinel key the memory backend reads for its healthcheck round trip.
/// Never written, so it can never shadow a real paste.
pub const HEALTHCHECK_KEY: &str = "healthz";

/// Cap on accepted TTLs, ~100 years. Anything above is rejected as invalid
/// rather than allowed to overflow the expiry arithmetic.
pub const TTL_SECONDS_MAX: i64 = 100 * 365 * 24 * 60 * 60;
