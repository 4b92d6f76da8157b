//! Memory Cache Module
//!
//! Thread-safe facade over a shard pool with an optional expiry sweeper.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheStats, CompositeKey, EvictCallback, ShardPool, StatsRecorder};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::tasks::{spawn_sweeper, Sweeper};

// == Memory Cache ==
/// In-process cache spread across independently locked shards.
///
/// Per-key operations lock only the shard that owns the main key, so callers
/// working on different main keys rarely contend. When built with
/// `max_cache_seconds > 0` a sweeper task removes entries left idle longer
/// than that; it runs until [`MemoryCache::close`] is awaited or the cache is
/// dropped.
pub struct MemoryCache<V: Clone> {
    pool: Arc<ShardPool<V>>,
    stats: Arc<StatsRecorder>,
    sweeper: Mutex<Option<Sweeper>>,
    max_cache_seconds: u64,
}

impl<V: Clone> fmt::Debug for MemoryCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("shards", &self.pool.shard_count())
            .field("len", &self.pool.len())
            .field("max_cache_seconds", &self.max_cache_seconds)
            .finish()
    }
}

impl<V> MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a memory cache from configuration.
    ///
    /// Starting the sweeper requires a tokio runtime; outside one, a config
    /// with `max_cache_seconds > 0` is rejected.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Creates a memory cache that reports every entry leaving it.
    ///
    /// The callback runs on the calling thread after the shard lock has been
    /// released; a panic inside it propagates to the caller.
    pub fn with_evict(config: &CacheConfig, on_evict: EvictCallback<V>) -> Result<Self> {
        Self::build(config, Some(on_evict))
    }

    fn build(config: &CacheConfig, on_evict: Option<EvictCallback<V>>) -> Result<Self> {
        config.validate()?;
        let pool = Arc::new(ShardPool::new(
            config.shard_count,
            config.shard_options(),
            on_evict,
        )?);
        let stats = Arc::new(StatsRecorder::new());

        let sweeper = if config.max_cache_seconds > 0 {
            Some(spawn_sweeper(
                pool.clone(),
                stats.clone(),
                config.max_cache_seconds,
            )?)
        } else {
            None
        };

        debug!(
            shards = config.shard_count,
            shard_capacity = config.shard_capacity,
            max_cache_seconds = config.max_cache_seconds,
            "memory cache created"
        );

        Ok(Self {
            pool,
            stats,
            sweeper: Mutex::new(sweeper),
            max_cache_seconds: config.max_cache_seconds,
        })
    }

    // == Writes ==
    /// Stores a value, returning true if an eviction occurred.
    pub fn set(&self, main_key: &str, sub_key: &str, value: V) -> bool {
        let evicted = self.pool.shard(main_key).set(main_key, sub_key, value);
        if evicted {
            self.stats.record_evictions(1);
        }
        evicted
    }

    /// Stores a value only if the composite key is absent.
    ///
    /// Returns (found, evicted); does not update recency.
    pub fn contains_or_add(&self, main_key: &str, sub_key: &str, value: V) -> (bool, bool) {
        let (found, evicted) = self
            .pool
            .shard(main_key)
            .contains_or_add(main_key, sub_key, value);
        if evicted {
            self.stats.record_evictions(1);
        }
        (found, evicted)
    }

    // == Reads ==
    /// Returns every sub entry stored under a main key.
    pub fn get(&self, main_key: &str) -> Option<HashMap<String, V>> {
        let values = self.pool.shard(main_key).get(main_key);
        self.stats.record_lookup(values.is_some());
        values
    }

    /// Returns one entry, refreshing its recency bookkeeping.
    pub fn get_sub(&self, main_key: &str, sub_key: &str) -> Option<V> {
        let value = self.pool.shard(main_key).get_sub(main_key, sub_key);
        self.stats.record_lookup(value.is_some());
        value
    }

    /// Returns the cached value, computing and storing it when absent.
    ///
    /// Concurrent callers missing on the same key may each run `compute`;
    /// the last one to store wins.
    pub fn get_sub_or_set<F>(&self, main_key: &str, sub_key: &str, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get_sub(main_key, sub_key) {
            return value;
        }
        let value = compute();
        self.set(main_key, sub_key, value.clone());
        value
    }

    /// Returns a value without updating recency.
    pub fn peek(&self, main_key: &str, sub_key: &str) -> Option<V> {
        self.pool.shard(main_key).peek(main_key, sub_key)
    }

    pub fn contains(&self, main_key: &str) -> bool {
        self.pool.shard(main_key).contains(main_key)
    }

    pub fn contains_sub(&self, main_key: &str, sub_key: &str) -> bool {
        self.pool.shard(main_key).contains_sub(main_key, sub_key)
    }

    // == Removal ==
    /// Removes every sub entry under a main key.
    pub fn remove(&self, main_key: &str) -> bool {
        self.pool.shard(main_key).remove(main_key)
    }

    pub fn remove_sub(&self, main_key: &str, sub_key: &str) -> bool {
        self.pool.shard(main_key).remove_sub(main_key, sub_key)
    }

    /// Removes entries idle longer than `max_age_secs`, returning the count.
    pub fn remove_expired(&self, max_age_secs: u64) -> usize {
        let removed = self.pool.remove_expired(max_age_secs);
        self.stats.record_expired(removed);
        removed
    }

    pub fn purge(&self) {
        self.pool.purge();
    }

    // == Administration ==
    /// Sets every shard's capacity, returning the number of entries evicted.
    pub fn resize(&self, shard_capacity: usize) -> Result<usize> {
        let evicted = self.pool.resize(shard_capacity)?;
        self.stats.record_evictions(evicted);
        Ok(evicted)
    }

    /// All keys; within each shard ordered oldest to newest.
    pub fn keys(&self) -> Vec<CompositeKey> {
        self.pool.keys()
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn shard_count(&self) -> usize {
        self.pool.shard_count()
    }

    pub fn max_cache_seconds(&self) -> u64 {
        self.max_cache_seconds
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.pool.len())
    }

    // == Close ==
    /// Stops the expiry sweeper and waits for it to exit.
    ///
    /// Calling it again, or on a cache without a sweeper, does nothing.
    pub async fn close(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }
    }

    /// True while a sweeper task is attached and still running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .map_or(false, |sweeper| !sweeper.is_finished())
    }
}
