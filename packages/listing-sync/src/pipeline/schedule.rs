//! Refresh scheduling.

use chrono::{DateTime, Duration, Utc};

/// Whether a snapshot retrieved at `retrieved_at` must be refreshed at `now`.
///
/// Stale once its age reaches `ttl` (equality counts as stale). A zero TTL is
/// therefore always stale. A snapshot stamped in the future is fresh until
/// the clock catches up.
pub fn is_stale(retrieved_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(retrieved_at) >= ttl
}
