//! Instrumented store wrappers for tests and benchmarks.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::algorithm::Algorithm;
use crate::error::RateLimitError;
use crate::store::AlgorithmStore;

/// Counting passthrough store.
///
/// Wraps any [`AlgorithmStore`] and counts how many loads and stores reach it,
/// so tests can pin the traffic a caching layer is supposed to absorb.
#[derive(Debug, Default)]
pub struct MonitoredStore<S> {
    inner: S,
    load_count: AtomicUsize,
    store_count: AtomicUsize,
}

impl<S> MonitoredStore<S> {
    /// Wrap `inner`, starting both counters at zero.
    pub fn new(inner: S) -> Self {
        Self { inner, load_count: AtomicUsize::new(0), store_count: AtomicUsize::new(0) }
    }

    /// Loads that reached the wrapped store so far.
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Stores that reached the wrapped store so far.
    pub fn store_count(&self) -> usize {
        self.store_count.load(Ordering::SeqCst)
    }

    /// Zero both counters and return their previous values as
    /// `(store_count, load_count)`.
    pub fn fetch_and_reset(&self) -> (usize, usize) {
        (self.store_count.swap(0, Ordering::SeqCst), self.load_count.swap(0, Ordering::SeqCst))
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<A, S> AlgorithmStore<A> for MonitoredStore<S>
where
    A: Algorithm,
    S: AlgorithmStore<A>,
{
    async fn load(&self, key: &str) -> Result<Option<A>, RateLimitError> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        self.inner.load(key).await
    }

    async fn store(&self, key: &str, candidate: A) -> Result<A, RateLimitError> {
        self.store_count.fetch_add(1, Ordering::SeqCst);
        self.inner.store(key, candidate).await
    }
}
