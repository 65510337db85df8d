//! Load-mutate-store orchestration: the public admission entry point.

use std::marker::PhantomData;

use crate::algorithm::Algorithm;
use crate::error::RateLimitError;
use crate::store::AlgorithmStore;

/// Per-key rate limiter over a pluggable algorithm and store.
///
/// `reserve` loads the key's current state (building a fresh one through the
/// factory on first sight), asks the algorithm to reserve, and writes the
/// mutated state back. Admission failures come back structurally:
/// [`RateLimitError::TooManyRequests`] with a wait hint for transient denials,
/// [`RateLimitError::OutOfBounds`] for requests that can never fit.
///
/// There is no compare-and-swap retry around the write-back. The store's
/// monotone merge rule already guarantees persisted state never regresses, and
/// if another process advanced the key further while we worked, its persisted
/// state reflects a reservation that genuinely happened; this caller's
/// decision stands within its local view. Cross-process aggregate throughput
/// stays bounded by the shared backend's merge rule.
pub struct RateLimiter<A, S, F>
where
    A: Algorithm,
    S: AlgorithmStore<A>,
    F: Fn() -> A + Send + Sync,
{
    store: S,
    new_algorithm: F,
    _alg: PhantomData<fn() -> A>,
}

impl<A, S, F> RateLimiter<A, S, F>
where
    A: Algorithm,
    S: AlgorithmStore<A>,
    F: Fn() -> A + Send + Sync,
{
    /// Create a limiter from an algorithm factory and a store.
    ///
    /// The factory runs once per key the store has never seen (or whose state
    /// has expired out of it).
    pub fn new(new_algorithm: F, store: S) -> Self {
        Self { store, new_algorithm, _alg: PhantomData }
    }

    async fn load_algorithm(&self, key: &str) -> Result<A, RateLimitError> {
        match self.store.load(key).await? {
            Some(algorithm) => Ok(algorithm),
            None => Ok((self.new_algorithm)()),
        }
    }

    /// Attempt to reserve `tokens` of capacity for `key`.
    pub async fn reserve(&self, key: &str, tokens: f64) -> Result<(), RateLimitError> {
        let mut algorithm = self.load_algorithm(key).await?;

        algorithm.reserve(tokens)?;

        // The store may answer with a fresher persisted state; it is
        // deliberately discarded. See the type-level docs.
        self.store.store(key, algorithm).await?;

        Ok(())
    }
}
