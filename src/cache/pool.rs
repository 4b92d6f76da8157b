//! Shard Pool Module
//!
//! Routes main keys to a fixed set of shards and fans administrative
//! operations out across all of them.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::cache::{CompositeKey, EvictCallback, Shard, ShardOptions};
use crate::error::{CacheError, Result};

// == Shard Pool ==
/// Fixed array of independently locked shards.
///
/// Routing depends only on the main key, so every sub entry of a main key
/// lives in the same shard. The shard count never changes after construction.
#[derive(Debug)]
pub struct ShardPool<V: Clone> {
    shards: Vec<Shard<V>>,
}

impl<V: Clone> ShardPool<V> {
    // == Constructor ==
    /// Creates `shard_count` shards sharing the same options and callback.
    pub fn new(
        shard_count: usize,
        options: ShardOptions,
        on_evict: Option<EvictCallback<V>>,
    ) -> Result<Self> {
        if shard_count == 0 {
            return Err(CacheError::InvalidConfig(
                "shard count must be positive".to_string(),
            ));
        }
        let shards = (0..shard_count)
            .map(|_| Shard::with_options(options, on_evict.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { shards })
    }

    // == Routing ==
    /// Index of the shard owning a main key.
    ///
    /// `DefaultHasher::new()` uses fixed keys, so routing is stable for the
    /// lifetime of the process.
    pub fn route(&self, main_key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        main_key.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    /// Shard responsible for a main key.
    pub fn shard(&self, main_key: &str) -> &Shard<V> {
        &self.shards[self.route(main_key)]
    }

    pub fn shards(&self) -> &[Shard<V>] {
        &self.shards
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    // == Fan-out Operations ==
    /// Clears every shard.
    pub fn purge(&self) {
        for shard in &self.shards {
            shard.purge();
        }
    }

    /// Sets every shard's capacity, returning the total evicted.
    pub fn resize(&self, capacity: usize) -> Result<usize> {
        let mut evicted = 0;
        for shard in &self.shards {
            evicted += shard.resize(capacity)?;
        }
        Ok(evicted)
    }

    /// Keys of all shards, each shard's keys ordered oldest to newest.
    pub fn keys(&self) -> Vec<CompositeKey> {
        self.shards.iter().flat_map(Shard::keys).collect()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(Shard::is_empty)
    }

    /// Sweeps idle entries from every shard, returning the total removed.
    pub fn remove_expired(&self, max_age_secs: u64) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.remove_expired(max_age_secs))
            .sum()
    }
}
