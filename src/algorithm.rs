//! The rate-algorithm capability and the freshness-key encoding.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::RateLimitError;

/// A rate-limit algorithm: the unit of state persisted per key.
///
/// Implementations are plain values. They are not internally synchronized; a
/// caller owns an instance for the duration of a reserve and hands it back to a
/// store, which provides per-key serialization through the monotone merge rule.
///
/// # Contract
///
/// - `reserve` consumes capacity, mutating in place on success. On failure it
///   returns [`RateLimitError::OutOfBounds`] (the request can never succeed) or
///   [`RateLimitError::TooManyRequests`] with a non-negative wait estimate.
/// - `sort_value` is a totally ordered freshness token: lexicographic comparison
///   of two sort values must order the states by how far they have progressed.
///   For any legal sequence of `reserve` calls on one instance it is
///   non-decreasing, and of two instances for the same key at the same instant,
///   the one that consumed more produces the strictly greater value. Stores use
///   it for conditional updates, so persisted state never regresses.
/// - `expire_at` is the wall-clock instant at which the state becomes
///   indistinguishable from a freshly constructed one; stores use it for TTL
///   expiry.
pub trait Algorithm: Clone + Send + Sync + std::fmt::Debug + 'static {
    /// Attempt to consume `tokens` of capacity.
    fn reserve(&mut self, tokens: f64) -> Result<(), RateLimitError>;

    /// Totally ordered freshness token for conditional updates.
    fn sort_value(&self) -> String;

    /// Instant at which this state is semantically fresh again.
    fn expire_at(&self) -> SystemTime;
}

/// Encode an instant as a fixed-width decimal string whose lexicographic order
/// is chronological order.
///
/// Time-anchored algorithms derive their `sort_value` from this: nanoseconds
/// since the UNIX epoch, zero-padded so `"0…9" < "0…10"` cannot happen. Instants
/// before the epoch all encode as zero.
pub fn sort_key(instant: SystemTime) -> String {
    let nanos = instant
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{nanos:032}")
}
