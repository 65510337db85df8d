//! State stores: where per-key algorithm state lives between reservations.
//!
//! A [`AlgorithmStore`] persists one [`Algorithm`] value per key under the
//! *monotone merge* rule, which is what makes the pipeline distributed-safe:
//! concurrent writers from different processes each write back their locally
//! advanced copy, and the store keeps whichever state has progressed furthest.
//! No locks or consensus across processes, just a totally ordered freshness
//! token.

use async_trait::async_trait;
use std::sync::Arc;

use crate::algorithm::Algorithm;
use crate::error::RateLimitError;

pub mod cached;
pub mod memory;

/// Abstract persistence for per-key algorithm state.
///
/// # Monotone merge
///
/// `store` must apply, atomically per key with respect to concurrent callers:
///
/// - no value for `key` → persist `candidate`, return it;
/// - existing value `v` → overwrite and return `candidate` iff
///   `candidate.sort_value() > v.sort_value()`, otherwise keep and return `v`.
///
/// The returned value is authoritative; callers must treat it as superseding
/// their own copy.
///
/// # Remote backends
///
/// A conforming remote store implements a per-key atomic conditional update over
/// the logical record `{rate_key, alg, sort, expire_at}`: "if no record exists
/// OR existing sort < incoming sort, overwrite and return the new record, else
/// return the existing record unchanged". Backends with server-side TTL should
/// expire records at `expire_at`. Serialization of the algorithm payload is
/// backend-specific but must round-trip the observable contract.
///
/// # Cancellation
///
/// Both operations are futures; dropping one cancels the operation at its next
/// await point. Implementations must not hold resources past that.
#[async_trait]
pub trait AlgorithmStore<A: Algorithm>: Send + Sync {
    /// Fetch the current persisted state for `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<A>, RateLimitError>;

    /// Write back `candidate` under the monotone merge rule and return the state
    /// that ended up persisted.
    async fn store(&self, key: &str, candidate: A) -> Result<A, RateLimitError>;
}

#[async_trait]
impl<A: Algorithm, S: AlgorithmStore<A>> AlgorithmStore<A> for Arc<S> {
    async fn load(&self, key: &str) -> Result<Option<A>, RateLimitError> {
        self.as_ref().load(key).await
    }

    async fn store(&self, key: &str, candidate: A) -> Result<A, RateLimitError> {
        self.as_ref().store(key, candidate).await
    }
}
