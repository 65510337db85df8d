//! Error types for rate limiting and state stores
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Unified error type for the rate-limiting pipeline.
///
/// Admission-denied conditions (`TooManyRequests`, `OutOfBounds`) are returned
/// structurally so callers can distinguish a transient denial with a wait hint
/// from a request that can never succeed. Backend failures are wrapped in
/// `StoreUnavailable` with a contextual prefix.
#[derive(Debug, Clone)]
pub enum RateLimitError {
    /// Capacity is currently exhausted; retry after the given duration.
    TooManyRequests {
        /// Estimated wait until the reservation would succeed. Never negative.
        retry_after: Duration,
    },
    /// The request exceeds the maximum capacity and can never succeed.
    OutOfBounds {
        /// Tokens the caller asked for.
        requested: f64,
        /// The algorithm's maximum capacity.
        max_tokens: f64,
    },
    /// A bounded in-memory store cannot admit another key.
    MaxSizeReached {
        /// The store's configured capacity.
        max_size: usize,
    },
    /// A backend store operation failed.
    StoreUnavailable {
        /// What the caller was doing when the backend failed.
        context: &'static str,
        /// The underlying backend error.
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyRequests { retry_after } => {
                write!(f, "too many requests, retry after {:?}", retry_after)
            }
            Self::OutOfBounds { requested, max_tokens } => {
                write!(
                    f,
                    "can't reserve {} tokens: capacity requested is greater than the maximum allowed ({})",
                    requested, max_tokens
                )
            }
            Self::MaxSizeReached { max_size } => {
                write!(f, "in-memory store max size reached ({} keys)", max_size)
            }
            Self::StoreUnavailable { context, source } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for RateLimitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StoreUnavailable { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl RateLimitError {
    /// Wrap a backend error with a contextual prefix.
    pub fn store_unavailable<E>(context: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RateLimitError::StoreUnavailable { context, source: Arc::new(source) }
    }

    /// Check if this is a transient denial.
    pub fn is_too_many_requests(&self) -> bool {
        matches!(self, Self::TooManyRequests { .. })
    }

    /// Check if the request exceeded the maximum capacity.
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }

    /// Check if a bounded store refused a new key.
    pub fn is_max_size_reached(&self) -> bool {
        matches!(self, Self::MaxSizeReached { .. })
    }

    /// Check if a backend store failed.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }

    /// The wait hint carried by `TooManyRequests`, if present.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::TooManyRequests { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
