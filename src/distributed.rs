//! Distributed Cache Module
//!
//! Two-tier cache: a sharded memory cache in front of a byte-oriented
//! backing store, with write-through writes, negative caching and
//! coalesced store reads.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::{CacheStats, MemoryCache};
use crate::codec::Codec;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::store::BackingStore;
use crate::sync::Group;

/// Separator between main and sub key in the backing store's key space.
pub const KEY_SEPARATOR: char = '.';

// == Store Keys ==
/// Builds the backing-store key `main_key.sub_key` for a composite key.
pub fn to_store_key(main_key: &str, sub_key: &str) -> String {
    format!("{}{}{}", main_key, KEY_SEPARATOR, sub_key)
}

/// Splits a backing-store key back into (main key, sub key) at the first
/// separator.
///
/// The split is only exact for main keys without a separator: `a.b.c` comes
/// back as (`a`, `b.c`) whether it was built from (`a`, `b.c`) or
/// (`a.b`, `c`).
pub fn from_store_key(key: &str) -> Result<(String, String)> {
    key.split_once(KEY_SEPARATOR)
        .map(|(main, sub)| (main.to_string(), sub.to_string()))
        .ok_or_else(|| {
            CacheError::InvalidKey(format!("{:?} has no '{}' separator", key, KEY_SEPARATOR))
        })
}

// == Pending Fills ==
/// Store reads whose result has not reached memory yet, keyed by store key.
///
/// The flag is raised when a write or remove lands on the key while the read
/// is outstanding; the read's result is then older than memory and must not
/// be stored.
#[derive(Default)]
struct PendingFills {
    reads: Mutex<HashMap<String, bool>>,
}

impl PendingFills {
    fn begin<'a>(&'a self, key: &'a str) -> FillTicket<'a> {
        self.reads.lock().insert(key.to_string(), false);
        FillTicket {
            fills: self,
            key,
            settled: false,
        }
    }

    /// Applies a memory update for `key` and marks any outstanding read of it
    /// as superseded, atomically with respect to [`FillTicket::commit`].
    fn supersede<F: FnOnce()>(&self, key: &str, apply: F) {
        let mut reads = self.reads.lock();
        apply();
        if let Some(superseded) = reads.get_mut(key) {
            *superseded = true;
        }
    }

    fn len(&self) -> usize {
        self.reads.lock().len()
    }
}

/// One outstanding store read. Dropping it without committing forgets the
/// read.
struct FillTicket<'a> {
    fills: &'a PendingFills,
    key: &'a str,
    settled: bool,
}

impl FillTicket<'_> {
    /// Runs `fill` unless a write superseded the read; returns whether it ran.
    fn commit<F: FnOnce()>(mut self, fill: F) -> bool {
        self.settled = true;
        let mut reads = self.fills.reads.lock();
        let superseded = reads.remove(self.key).unwrap_or(true);
        if !superseded {
            fill();
        }
        !superseded
    }
}

impl Drop for FillTicket<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.fills.reads.lock().remove(self.key);
        }
    }
}

// == Distributed Cache ==
/// Memory cache backed by a [`BackingStore`].
///
/// The memory tier holds `Option<V>`: `Some` is a cached value, `None`
/// records that the store had nothing under the key. Both age out through
/// the memory tier's eviction and expiry like any other entry. A store read
/// never overwrites a write or remove that completed while it was in flight.
pub struct DistributedCache<V, S, C>
where
    V: Clone + Send + Sync + 'static,
{
    memory: MemoryCache<Option<V>>,
    store: S,
    codec: C,
    group: Group<Result<Option<V>>>,
    fills: PendingFills,
    store_ttl_seconds: u64,
}

impl<V, S, C> fmt::Debug for DistributedCache<V, S, C>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedCache")
            .field("memory", &self.memory)
            .field("in_flight", &self.group.in_flight())
            .field("pending_fills", &self.fills.len())
            .field("store_ttl_seconds", &self.store_ttl_seconds)
            .finish()
    }
}

impl<V, S, C> DistributedCache<V, S, C>
where
    V: Clone + Send + Sync + 'static,
    S: BackingStore,
    C: Codec<V>,
{
    // == Constructor ==
    /// Creates the cache; the memory tier is built from `config`, and
    /// `config.store_ttl_seconds` becomes the TTL used by [`Self::set`].
    pub fn new(config: &CacheConfig, store: S, codec: C) -> Result<Self> {
        Ok(Self {
            memory: MemoryCache::new(config)?,
            store,
            codec,
            group: Group::new(),
            fills: PendingFills::default(),
            store_ttl_seconds: config.store_ttl_seconds,
        })
    }

    // == Writes ==
    /// Writes through to the store with the default TTL, then to memory.
    ///
    /// If the store write fails the memory tier is left untouched.
    pub async fn set(&self, main_key: &str, sub_key: &str, value: V) -> Result<()> {
        self.write(main_key, sub_key, value, Some(self.store_ttl_seconds))
            .await
    }

    /// Like [`Self::set`] but the store entry never expires.
    pub async fn set_no_expire(&self, main_key: &str, sub_key: &str, value: V) -> Result<()> {
        self.write(main_key, sub_key, value, None).await
    }

    async fn write(
        &self,
        main_key: &str,
        sub_key: &str,
        value: V,
        ttl_seconds: Option<u64>,
    ) -> Result<()> {
        let key = to_store_key(main_key, sub_key);
        let bytes = self.codec.marshal(&value)?;

        let written = match ttl_seconds {
            Some(ttl) => self.store.set(&key, bytes, ttl).await,
            None => self.store.set_no_expire(&key, bytes).await,
        };
        if let Err(err) = written {
            warn!(key = %key, error = %err, "backing store write failed");
            return Err(err);
        }

        self.fills.supersede(&key, || {
            self.memory.set(main_key, sub_key, Some(value));
        });
        Ok(())
    }

    // == Reads ==
    /// Returns the value for a composite key, consulting memory first.
    ///
    /// `Ok(None)` means the key is absent. A remembered absence is answered
    /// from memory without asking the store again. On a memory miss the store
    /// read is shared with any concurrent caller for the same key; a found
    /// value is decoded into a container built by `new_value`.
    pub async fn get<F>(&self, main_key: &str, sub_key: &str, new_value: F) -> Result<Option<V>>
    where
        F: FnOnce() -> V,
    {
        if let Some(cached) = self.memory.get_sub(main_key, sub_key) {
            return Ok(cached);
        }
        self.get_from_store(main_key, sub_key, new_value).await
    }

    /// Reads from the backing store, bypassing the memory check, and
    /// refreshes the memory tier with what it finds.
    ///
    /// Concurrent calls for the same key share one store round trip and all
    /// receive its result, errors included.
    pub async fn get_from_store<F>(
        &self,
        main_key: &str,
        sub_key: &str,
        new_value: F,
    ) -> Result<Option<V>>
    where
        F: FnOnce() -> V,
    {
        let key = to_store_key(main_key, sub_key);
        self.group
            .run(&key, || self.fetch(main_key, sub_key, &key, new_value))
            .await
    }

    async fn fetch<F>(
        &self,
        main_key: &str,
        sub_key: &str,
        key: &str,
        new_value: F,
    ) -> Result<Option<V>>
    where
        F: FnOnce() -> V,
    {
        let ticket = self.fills.begin(key);
        let bytes = match self.store.get(key).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(key, error = %err, "backing store read failed");
                return Err(err);
            }
        };

        let Some(bytes) = bytes else {
            let filled = ticket.commit(|| {
                self.memory.set(main_key, sub_key, None);
            });
            if filled {
                debug!(key, "caching store miss");
            }
            return Ok(None);
        };

        let mut value = new_value();
        if let Err(err) = self.codec.unmarshal(&bytes, &mut value) {
            warn!(key, error = %err, "discarding undecodable store value");
            return Err(err);
        }
        let filled = ticket.commit(|| {
            self.memory.set(main_key, sub_key, Some(value.clone()));
        });
        if !filled {
            debug!(key, "store read superseded by a newer write");
        }
        Ok(Some(value))
    }

    // == Membership ==
    /// True if memory holds a value for the key, otherwise asks the store.
    pub async fn contains(&self, main_key: &str, sub_key: &str) -> Result<bool> {
        if self.contains_in_memory(main_key, sub_key) {
            return Ok(true);
        }
        self.contains_in_store(main_key, sub_key).await
    }

    /// True if memory holds a value (not a remembered absence) for the key.
    pub fn contains_in_memory(&self, main_key: &str, sub_key: &str) -> bool {
        matches!(self.memory.peek(main_key, sub_key), Some(Some(_)))
    }

    pub async fn contains_in_store(&self, main_key: &str, sub_key: &str) -> Result<bool> {
        let key = to_store_key(main_key, sub_key);
        self.store.exists(&key).await.map_err(|err| {
            warn!(key = %key, error = %err, "backing store exists failed");
            err
        })
    }

    // == Removal ==
    /// Deletes from the store, then from memory.
    ///
    /// A failed store delete leaves memory untouched.
    pub async fn remove(&self, main_key: &str, sub_key: &str) -> Result<()> {
        let key = to_store_key(main_key, sub_key);
        if let Err(err) = self.store.delete(&key).await {
            warn!(key = %key, error = %err, "backing store delete failed");
            return Err(err);
        }
        self.fills.supersede(&key, || {
            self.memory.remove_sub(main_key, sub_key);
        });
        Ok(())
    }

    /// Drops every memory entry under `main_key`; the store is not touched.
    pub fn remove_from_memory(&self, main_key: &str) -> bool {
        self.memory.remove(main_key)
    }

    /// Drops one memory entry so the next [`Self::get`] reloads it.
    pub fn remove_sub_from_memory(&self, main_key: &str, sub_key: &str) -> bool {
        self.memory.remove_sub(main_key, sub_key)
    }

    // == Accessors ==
    pub fn memory(&self) -> &MemoryCache<Option<V>> {
        &self.memory
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_ttl_seconds(&self) -> u64 {
        self.store_ttl_seconds
    }

    pub fn stats(&self) -> CacheStats {
        self.memory.stats()
    }

    /// Stops the memory tier's sweeper.
    pub async fn close(&self) {
        self.memory.close().await;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TextCodec;
    use crate::store::InMemoryStore;

    fn cache() -> DistributedCache<u64, InMemoryStore, TextCodec> {
        let config = CacheConfig {
            shard_count: 2,
            shard_capacity: 16,
            max_cache_seconds: 0,
            ..CacheConfig::default()
        };
        DistributedCache::new(&config, InMemoryStore::new(), TextCodec).unwrap()
    }

    #[test]
    fn test_to_store_key() {
        assert_eq!(to_store_key("user", "42"), "user.42");
        assert_eq!(to_store_key("user", ""), "user.");
        assert_eq!(to_store_key("user", "a.b"), "user.a.b");
        assert_eq!(to_store_key("config.v2", "limit"), "config.v2.limit");
    }

    #[test]
    fn test_from_store_key_splits_on_first_separator() {
        assert_eq!(
            from_store_key("user.a.b").unwrap(),
            ("user".to_string(), "a.b".to_string())
        );
        assert_eq!(
            from_store_key("user.").unwrap(),
            ("user".to_string(), String::new())
        );
        // Dotted main keys do not survive the reverse split
        assert_eq!(
            from_store_key(&to_store_key("config.v2", "limit")).unwrap(),
            ("config".to_string(), "v2.limit".to_string())
        );
        assert!(matches!(
            from_store_key("nosep"),
            Err(CacheError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_fill_runs_when_not_superseded() {
        let fills = PendingFills::default();
        let ticket = fills.begin("user.a");

        assert!(ticket.commit(|| {}));
        assert_eq!(fills.len(), 0);
    }

    #[test]
    fn test_fill_skipped_after_write() {
        let fills = PendingFills::default();
        let ticket = fills.begin("user.a");
        let mut writes = 0;

        fills.supersede("user.a", || writes += 1);
        fills.supersede("user.b", || writes += 1);

        assert_eq!(writes, 2);
        assert!(!ticket.commit(|| panic!("superseded fill must not run")));
        assert_eq!(fills.len(), 0);
    }

    #[test]
    fn test_dropped_ticket_forgets_read() {
        let fills = PendingFills::default();
        drop(fills.begin("user.a"));
        assert_eq!(fills.len(), 0);
    }

    #[tokio::test]
    async fn test_set_writes_both_tiers() {
        let cache = cache();

        cache.set("user", "visits", 3).await.unwrap();

        assert!(cache.contains_in_memory("user", "visits"));
        assert_eq!(
            cache.store().get("user.visits").await.unwrap(),
            Some(b"3".to_vec())
        );
        assert_eq!(cache.get("user", "visits", || 0).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_get_miss_remembers_absence() {
        let cache = cache();

        assert_eq!(cache.get("user", "none", || 0).await.unwrap(), None);

        assert_eq!(cache.memory().peek("user", "none"), Some(None));
        assert!(!cache.contains_in_memory("user", "none"));
        assert!(!cache.contains("user", "none").await.unwrap());
    }

    #[tokio::test]
    async fn test_dotted_main_key_round_trip() {
        let cache = cache();

        cache.set("config.v2", "limit", 5).await.unwrap();
        cache.remove_sub_from_memory("config.v2", "limit");

        assert_eq!(
            cache.get("config.v2", "limit", || 0).await.unwrap(),
            Some(5)
        );
        assert!(cache.contains_in_store("config.v2", "limit").await.unwrap());
        cache.remove("config.v2", "limit").await.unwrap();
        assert!(!cache.contains("config.v2", "limit").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_clears_both_tiers() {
        let cache = cache();
        cache.set_no_expire("user", "visits", 9).await.unwrap();

        cache.remove("user", "visits").await.unwrap();

        assert!(!cache.contains_in_memory("user", "visits"));
        assert!(!cache.contains_in_store("user", "visits").await.unwrap());
    }
}
