//! Bounded in-memory store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::algorithm::Algorithm;
use crate::error::RateLimitError;
use crate::store::AlgorithmStore;

/// In-process [`AlgorithmStore`] over a bounded map.
///
/// A single readers-writer lock protects the whole map: `load` takes shared
/// mode, `store` exclusive mode. When the map is full and a new key arrives,
/// `store` fails with [`RateLimitError::MaxSizeReached`] rather than evicting;
/// eviction is the cached layer's job.
#[derive(Debug)]
pub struct InMemoryStore<A> {
    data: RwLock<HashMap<String, A>>,
    max_size: usize,
}

impl<A> InMemoryStore<A> {
    /// Create a store admitting at most `max_size` keys.
    pub fn new(max_size: usize) -> Self {
        Self { data: RwLock::new(HashMap::new()), max_size }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.read().unwrap().len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.data.read().unwrap().is_empty()
    }
}

#[async_trait]
impl<A: Algorithm> AlgorithmStore<A> for InMemoryStore<A> {
    async fn load(&self, key: &str) -> Result<Option<A>, RateLimitError> {
        let data = self.data.read().unwrap();
        Ok(data.get(key).cloned())
    }

    async fn store(&self, key: &str, candidate: A) -> Result<A, RateLimitError> {
        let mut data = self.data.write().unwrap();

        match data.get(key) {
            None => {
                if data.len() >= self.max_size {
                    return Err(RateLimitError::MaxSizeReached { max_size: self.max_size });
                }
            }
            Some(existing) => {
                // The incumbent is at least as fresh; it stays authoritative.
                if existing.sort_value() >= candidate.sort_value() {
                    return Ok(existing.clone());
                }
            }
        }

        data.insert(key.to_owned(), candidate.clone());

        Ok(candidate)
    }
}
