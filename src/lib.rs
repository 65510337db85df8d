#![forbid(unsafe_code)]

//! # Floodgate
//!
//! Distributed-safe rate limiting: pluggable admission algorithms, stores with
//! monotone merge semantics, and a bounded write-back cache that coalesces hot
//! keys into a fraction of the backend traffic.
//!
//! ## How it fits together
//!
//! - An [`Algorithm`] (reference implementation: [`TokenBucket`]) decides
//!   admissions and exposes a totally ordered *freshness* token plus an expiry
//!   instant.
//! - An [`AlgorithmStore`] persists one algorithm state per key under the
//!   *monotone merge* rule: a write only lands if it is fresher than what is
//!   already there, and the store always answers with the state that ended up
//!   persisted. Concurrent writers across processes converge without locks or
//!   consensus — the most-advanced state wins.
//! - [`CachedStore`] fronts any store with a bounded in-process cache: repeated
//!   writes to a hot key are absorbed locally and reconciled by a periodic
//!   background flush.
//! - [`RateLimiter`] ties it together: load state, reserve, write back.
//!
//! ## Quick start
//!
//! ```rust
//! use floodgate::{InMemoryStore, RateLimiter, TokenBucket};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), floodgate::RateLimitError> {
//!     let store: InMemoryStore<TokenBucket> = InMemoryStore::new(1024);
//!     // 10-token bursts, refilled at 2 tokens per second.
//!     let limiter = RateLimiter::new(|| TokenBucket::new(10.0, 2.0), store);
//!
//!     match limiter.reserve("client-42", 1.0).await {
//!         Ok(()) => { /* admitted */ }
//!         Err(e) if e.is_too_many_requests() => {
//!             println!("denied, retry in {:?}", e.retry_after());
//!         }
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Remote backends
//!
//! Any store that implements the per-key conditional update documented on
//! [`AlgorithmStore`] (for example a document store with an atomic
//! "overwrite iff incoming sort is greater" expression and TTL on `expire_at`)
//! can back the limiter across processes. [`TokenBucket`] state round-trips
//! through serde for exactly this purpose.

pub mod algorithm;
pub mod clock;
pub mod error;
pub mod limiter;
pub mod prelude;
pub mod store;
pub mod testing;
pub mod token_bucket;

// Re-exports
pub use algorithm::Algorithm;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::RateLimitError;
pub use limiter::RateLimiter;
pub use store::cached::CachedStore;
pub use store::memory::InMemoryStore;
pub use store::AlgorithmStore;
pub use token_bucket::TokenBucket;
