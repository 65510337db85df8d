//! Convenient re-exports for common Floodgate types.
pub use crate::{
    algorithm::Algorithm,
    clock::{Clock, ManualClock, SystemClock},
    error::RateLimitError,
    limiter::RateLimiter,
    store::{cached::CachedStore, memory::InMemoryStore, AlgorithmStore},
    token_bucket::TokenBucket,
};
