//! Keyed cache for loaded models
//!
//! Each key owns a once-cell, so concurrent requests for the same asset share
//! a single in-flight load. Failed loads leave the cell empty and the next
//! request tries again.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::debug;

/// Cache performance statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Loader invocations
    pub loads: u64,
    pub failures: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Calculate cache hit ratio as percentage
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

pub struct ModelCache<K, V> {
    slots: RwLock<HashMap<K, Arc<OnceCell<V>>>>,
    stats: RwLock<CacheStats>,
}

impl<K, V> std::fmt::Debug for ModelCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache").finish_non_exhaustive()
    }
}

impl<K, V> Default for ModelCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Display,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ModelCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Display,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    async fn slot(&self, key: &K) -> Arc<OnceCell<V>> {
        if let Some(slot) = self.slots.read().await.get(key) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(key.clone()).or_insert_with(|| Arc::new(OnceCell::new())))
    }

    /// Return the cached value or run `load` to produce it
    pub async fn get_or_try_load<F, Fut, E>(&self, key: &K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key).await;

        if let Some(value) = slot.get() {
            self.stats.write().await.hits += 1;
            debug!("📋 Cache HIT for {}", key);
            return Ok(value.clone());
        }

        self.stats.write().await.misses += 1;
        debug!("📋 Cache MISS for {}", key);

        let result = slot
            .get_or_try_init(|| async {
                self.stats.write().await.loads += 1;
                load().await
            })
            .await
            .map(|value| value.clone());

        if result.is_err() {
            self.stats.write().await.failures += 1;
        }
        result
    }

    /// Cached value without loading
    pub async fn get(&self, key: &K) -> Option<V> {
        let slots = self.slots.read().await;
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    pub async fn contains(&self, key: &K) -> bool {
        self.get(key).await.is_some()
    }

    pub async fn remove(&self, key: &K) -> bool {
        self.slots.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.slots.write().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        let mut stats = self.stats.read().await.clone();
        stats.entries = self
            .slots
            .read()
            .await
            .values()
            .filter(|slot| slot.initialized())
            .count();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_loads_once() {
        let cache: ModelCache<String, u32> = ModelCache::new();
        let calls = AtomicUsize::new(0);
        let key = "robot".to_string();

        for _ in 0..3 {
            let value = cache
                .get_or_try_load(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let cache: ModelCache<String, u32> = ModelCache::new();
        let key = "broken".to_string();

        let first = cache.get_or_try_load(&key, || async { Err::<u32, _>("boom") }).await;
        assert!(first.is_err());
        assert!(!cache.contains(&key).await);

        let second = cache.get_or_try_load(&key, || async { Ok::<_, &str>(3) }).await;
        assert_eq!(second, Ok(3));

        let stats = cache.stats().await;
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.loads, 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_load() {
        let cache: Arc<ModelCache<String, u32>> = Arc::new(ModelCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_try_load(&"shared".to_string(), || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        Ok::<_, String>(42)
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
