//! Write-back, read-through cache over any [`AlgorithmStore`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::algorithm::Algorithm;
use crate::clock::{Clock, SystemClock};
use crate::error::RateLimitError;
use crate::store::AlgorithmStore;

#[derive(Debug, Clone)]
struct CachedItem<A> {
    alg: A,
    sort: String,
    /// Last time the application wrote or inserted this entry. The periodic
    /// flush does not count as use.
    last_used_at: SystemTime,
}

impl<A: Algorithm> CachedItem<A> {
    fn new(alg: A, last_used_at: SystemTime) -> Self {
        let sort = alg.sort_value();
        Self { alg, sort, last_used_at }
    }
}

/// State shared between the cache handle and its flush worker.
struct Shared<A, S> {
    inner: S,
    cache: Mutex<HashMap<String, CachedItem<A>>>,
    cache_size: usize,
    cache_duration: Duration,
    clock: Arc<dyn Clock>,
}

impl<A: Algorithm, S: AlgorithmStore<A>> Shared<A, S> {
    /// An entry is expired once the algorithm's own TTL has passed, or once it
    /// has sat unwritten for longer than `cache_duration` (idle TTL).
    fn is_expired(&self, item: &CachedItem<A>, now: SystemTime) -> bool {
        if now > item.alg.expire_at() {
            return true;
        }
        match now.duration_since(item.last_used_at) {
            Ok(idle) => idle > self.cache_duration,
            // last_used_at in the future means the clock regressed; not idle.
            Err(_) => false,
        }
    }

    fn remove_expired(&self, cache: &mut HashMap<String, CachedItem<A>>) -> bool {
        let now = self.clock.now();
        let before = cache.len();
        cache.retain(|_, item| !self.is_expired(item, now));
        cache.len() != before
    }

    fn remove_least_recently_written(&self, cache: &mut HashMap<String, CachedItem<A>>) {
        let oldest = cache
            .iter()
            .min_by_key(|(_, item)| item.last_used_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            cache.remove(&key);
        }
    }

    /// Eviction procedure: sweep expired entries, and only if that freed
    /// nothing, drop the single entry written longest ago.
    fn make_room(&self, cache: &mut HashMap<String, CachedItem<A>>) {
        if !self.remove_expired(cache) {
            self.remove_least_recently_written(cache);
        }
    }

    /// Write every live cached entry back to the inner store and adopt the
    /// authoritative state the store returns. Holding the lock for the whole
    /// pass gives the flush snapshot semantics; application calls queue behind
    /// it, which is acceptable at one flush per `cache_duration`.
    async fn flush(&self) {
        let mut cache = self.cache.lock().await;

        let mut errors: Vec<RateLimitError> = Vec::new();

        self.remove_expired(&mut cache);

        let keys: Vec<String> = cache.keys().cloned().collect();
        for key in keys {
            let alg = match cache.get(&key) {
                Some(item) if !item.sort.is_empty() => item.alg.clone(),
                _ => continue,
            };

            match self.inner.store(&key, alg).await {
                Ok(updated) => {
                    // Another process may have advanced this key further; the
                    // returned state supersedes ours. The entry keeps its
                    // last_used_at: a flush is not an application use.
                    if let Some(entry) = cache.get_mut(&key) {
                        let last_used_at = entry.last_used_at;
                        *entry = CachedItem::new(updated, last_used_at);
                    }
                }
                Err(err) => errors.push(err),
            }
        }

        if !errors.is_empty() {
            tracing::warn!(errors = ?errors, "can't persist and refresh cached data");
        }
    }
}

async fn flush_loop<A, S>(shared: Arc<Shared<A, S>>, mut shutdown: watch::Receiver<bool>)
where
    A: Algorithm,
    S: AlgorithmStore<A>,
{
    let period = shared.cache_duration;
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = ticker.tick() => shared.flush().await,
        }
    }
}

/// Bounded write-back cache that fronts an [`AlgorithmStore`].
///
/// Hot keys are served from an in-process map: a `store` on an already-cached
/// key overwrites the entry and returns without touching the backend, so
/// repeated reservation traffic collapses into one backend write per flush
/// interval. A background worker flushes the cache every `cache_duration`,
/// pulling back any fresher state another process persisted in the meantime.
///
/// Entries expire when their algorithm's `expire_at` passes or when they go
/// unwritten for longer than `cache_duration`; reads deliberately do not
/// refresh the idle clock. When the map is full, expired entries are swept
/// first and only then is the least-recently-written entry evicted.
///
/// Call [`stop`](CachedStore::stop) to flush once more and retire the worker.
/// Dropping the cache without stopping aborts the worker without a final
/// flush. After `stop` the cache keeps serving reads and writes from the
/// frozen map and the backend; the worker is never restarted.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use floodgate::{AlgorithmStore, CachedStore, InMemoryStore, TokenBucket};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), floodgate::RateLimitError> {
///     let backend: InMemoryStore<TokenBucket> = InMemoryStore::new(1024);
///     let cache = CachedStore::new(backend, 256, Duration::from_secs(5));
///
///     let bucket = cache.store("tenant-7", TokenBucket::new(100.0, 10.0)).await?;
///     assert_eq!(bucket.max_tokens(), 100.0);
///
///     cache.stop().await;
///     Ok(())
/// }
/// ```
pub struct CachedStore<A, S>
where
    A: Algorithm,
    S: AlgorithmStore<A> + 'static,
{
    shared: Arc<Shared<A, S>>,
    shutdown: watch::Sender<bool>,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl<A, S> CachedStore<A, S>
where
    A: Algorithm,
    S: AlgorithmStore<A> + 'static,
{
    /// Create a cache over `inner` holding at most `cache_size` entries, with
    /// `cache_duration` as both the idle TTL and the flush period. Spawns the
    /// flush worker, so a tokio runtime must be current.
    ///
    /// # Panics
    ///
    /// Panics if `cache_duration` is zero.
    pub fn new(inner: S, cache_size: usize, cache_duration: Duration) -> Self {
        Self::with_clock(inner, cache_size, cache_duration, Arc::new(SystemClock))
    }

    /// Like [`new`](CachedStore::new) with an injected clock.
    ///
    /// # Panics
    ///
    /// Panics if `cache_duration` is zero.
    pub fn with_clock(
        inner: S,
        cache_size: usize,
        cache_duration: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        assert!(cache_duration > Duration::ZERO, "cache_duration must be > 0");

        let shared = Arc::new(Shared {
            inner,
            cache: Mutex::new(HashMap::new()),
            cache_size,
            cache_duration,
            clock,
        });

        let (shutdown, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(flush_loop(Arc::clone(&shared), shutdown_rx));

        Self {
            shared,
            shutdown,
            worker: std::sync::Mutex::new(Some(worker)),
            stopped: AtomicBool::new(false),
        }
    }

    /// Flush once more, then cancel the worker and wait for it to finish.
    /// Repeated calls are no-ops. Never fails: final-flush errors are logged
    /// the same way periodic-flush errors are.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        self.shared.flush().await;

        let _ = self.shutdown.send(true);
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl<A, S> Drop for CachedStore<A, S>
where
    A: Algorithm,
    S: AlgorithmStore<A> + 'static,
{
    fn drop(&mut self) {
        if let Some(handle) = self.worker.lock().unwrap().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl<A, S> AlgorithmStore<A> for CachedStore<A, S>
where
    A: Algorithm,
    S: AlgorithmStore<A> + 'static,
{
    async fn load(&self, key: &str) -> Result<Option<A>, RateLimitError> {
        let shared = &self.shared;
        // Exclusive even for reads: a miss inserts into the cache.
        let mut cache = shared.cache.lock().await;

        if let Some(item) = cache.get(key) {
            if !shared.is_expired(item, shared.clock.now()) {
                return Ok(Some(item.alg.clone()));
            }
        }

        let Some(loaded) = shared.inner.load(key).await? else {
            return Ok(None);
        };

        if shared.cache_size > 0 {
            if cache.len() >= shared.cache_size && !cache.contains_key(key) {
                shared.make_room(&mut cache);
            }
            cache.insert(key.to_owned(), CachedItem::new(loaded.clone(), shared.clock.now()));
        }

        Ok(Some(loaded))
    }

    async fn store(&self, key: &str, candidate: A) -> Result<A, RateLimitError> {
        let shared = &self.shared;
        let mut cache = shared.cache.lock().await;

        // Already cached: absorb the write. The periodic flush reconciles with
        // the backend later.
        if cache.contains_key(key) {
            cache.insert(key.to_owned(), CachedItem::new(candidate.clone(), shared.clock.now()));
            return Ok(candidate);
        }

        if cache.len() >= shared.cache_size {
            shared.make_room(&mut cache);
        }

        let persisted = shared.inner.store(key, candidate).await?;

        if shared.cache_size > 0 {
            cache.insert(key.to_owned(), CachedItem::new(persisted.clone(), shared.clock.now()));
        }

        Ok(persisted)
    }
}
