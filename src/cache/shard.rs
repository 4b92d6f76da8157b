//! Shard Module
//!
//! A single LRU store keyed by (main key, sub key) with probationary
//! insertion and reference-count-gated promotion.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::cache::{
    current_timestamp_ms, CacheEntry, CompositeKey, EvictionList, DEFAULT_INSERT_PERCENT,
    DEFAULT_PROMOTE_THRESHOLD,
};
use crate::error::{CacheError, Result};

/// Callback invoked with (main key, sub key, value) for every entry leaving
/// a shard through eviction, removal, expiry or purge.
pub type EvictCallback<V> = Arc<dyn Fn(&str, &str, &V) + Send + Sync>;

// == Shard Options ==
/// Tuning parameters for a single shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardOptions {
    /// Maximum number of entries
    pub capacity: usize,
    /// New entries are inserted this far from the back, as a percentage of length
    pub insert_percent: usize,
    /// Reads needed before an entry is moved to the front
    pub promote_threshold: u32,
}

impl ShardOptions {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "shard capacity must be positive".to_string(),
            ));
        }
        if self.insert_percent > 100 {
            return Err(CacheError::InvalidConfig(format!(
                "insert percent must be within 0..=100, got {}",
                self.insert_percent
            )));
        }
        if self.promote_threshold == 0 {
            return Err(CacheError::InvalidConfig(
                "promote threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ShardOptions {
    fn default() -> Self {
        Self {
            capacity: 1024,
            insert_percent: DEFAULT_INSERT_PERCENT,
            promote_threshold: DEFAULT_PROMOTE_THRESHOLD,
        }
    }
}

/// State guarded by the shard lock.
struct ShardState<V> {
    list: EvictionList<V>,
    index: HashMap<String, HashMap<String, usize>>,
    capacity: usize,
}

impl<V> ShardState<V> {
    fn lookup(&self, main_key: &str, sub_key: &str) -> Option<usize> {
        self.index.get(main_key)?.get(sub_key).copied()
    }

    fn unindex(&mut self, main_key: &str, sub_key: &str) {
        if let Some(subs) = self.index.get_mut(main_key) {
            subs.remove(sub_key);
            if subs.is_empty() {
                self.index.remove(main_key);
            }
        }
    }

    fn remove_handle(&mut self, handle: usize) -> Option<CacheEntry<V>> {
        let entry = self.list.remove(handle)?;
        self.unindex(&entry.main_key, &entry.sub_key);
        Some(entry)
    }

    fn pop_back(&mut self) -> Option<CacheEntry<V>> {
        let entry = self.list.pop_back()?;
        self.unindex(&entry.main_key, &entry.sub_key);
        Some(entry)
    }
}

// == Shard ==
/// One independent LRU store covering a subset of the key space.
///
/// Mutations take the exclusive lock. Reads take the shared lock and only
/// escalate to the exclusive lock when an entry has been referenced often
/// enough to be promoted, so hot keys pay for reordering once per
/// `promote_threshold` reads.
pub struct Shard<V> {
    state: RwLock<ShardState<V>>,
    insert_percent: usize,
    promote_threshold: u32,
    on_evict: Option<EvictCallback<V>>,
}

impl<V: Clone> fmt::Debug for Shard<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shard")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("insert_percent", &self.insert_percent)
            .field("promote_threshold", &self.promote_threshold)
            .finish()
    }
}

impl<V: Clone> Shard<V> {
    // == Constructor ==
    /// Creates a shard with default options and the given capacity.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_options(ShardOptions::with_capacity(capacity), None)
    }

    /// Creates a shard with explicit options and an optional eviction callback.
    pub fn with_options(options: ShardOptions, on_evict: Option<EvictCallback<V>>) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            state: RwLock::new(ShardState {
                list: EvictionList::new(),
                index: HashMap::new(),
                capacity: options.capacity,
            }),
            insert_percent: options.insert_percent,
            promote_threshold: options.promote_threshold,
            on_evict,
        })
    }

    // == Set ==
    /// Stores a value, returning true if another entry was evicted to make room.
    ///
    /// An existing entry is updated in place and counts as a reference. A new
    /// entry is placed `len * insert_percent / 100` positions from the back
    /// so a burst of one-off keys cannot flush entries nearer the front.
    pub fn set(&self, main_key: &str, sub_key: &str, value: V) -> bool {
        let evicted = {
            let mut state = self.state.write();

            if let Some(handle) = state.lookup(main_key, sub_key) {
                if let Some(entry) = state.list.get_mut(handle) {
                    entry.value = value;
                    entry.touch();
                    if entry.reference() >= self.promote_threshold {
                        entry.reset_references();
                        state.list.move_to_front(handle);
                    }
                }
                return false;
            }

            self.insert_new(&mut state, main_key, sub_key, value)
        };

        match evicted {
            Some(entry) => {
                debug!(
                    main_key = %entry.main_key,
                    sub_key = %entry.sub_key,
                    "evicted entry at capacity"
                );
                self.notify_evicted(&entry);
                true
            }
            None => false,
        }
    }

    /// Stores a value only if the composite key is absent.
    ///
    /// Returns (found, evicted). The membership check does not count as a
    /// reference.
    pub fn contains_or_add(&self, main_key: &str, sub_key: &str, value: V) -> (bool, bool) {
        let evicted = {
            let mut state = self.state.write();
            if state.lookup(main_key, sub_key).is_some() {
                return (true, false);
            }
            self.insert_new(&mut state, main_key, sub_key, value)
        };

        match evicted {
            Some(entry) => {
                self.notify_evicted(&entry);
                (false, true)
            }
            None => (false, false),
        }
    }

    /// Inserts a new entry at its probationary position, evicting the back
    /// entry first when the shard is full.
    fn insert_new(
        &self,
        state: &mut ShardState<V>,
        main_key: &str,
        sub_key: &str,
        value: V,
    ) -> Option<CacheEntry<V>> {
        let evicted = if state.list.len() >= state.capacity {
            state.pop_back()
        } else {
            None
        };

        let offset = state.list.len() * self.insert_percent / 100;
        let entry = CacheEntry::new(main_key.to_string(), sub_key.to_string(), value);
        let handle = state.list.insert_from_back(entry, offset);
        state
            .index
            .entry(main_key.to_string())
            .or_default()
            .insert(sub_key.to_string(), handle);
        evicted
    }

    // == Get Sub ==
    /// Looks up one entry, refreshing its access time and reference count.
    pub fn get_sub(&self, main_key: &str, sub_key: &str) -> Option<V> {
        let (value, promote) = {
            let state = self.state.read();
            let entry = state
                .lookup(main_key, sub_key)
                .and_then(|handle| state.list.get(handle))?;
            entry.touch();
            let references = entry.reference();
            (entry.value.clone(), references >= self.promote_threshold)
        };

        if promote {
            self.promote(main_key, sub_key);
        }
        Some(value)
    }

    // == Get ==
    /// Returns every sub entry under a main key, refreshing each as `get_sub` does.
    pub fn get(&self, main_key: &str) -> Option<HashMap<String, V>> {
        let mut to_promote = Vec::new();
        let values = {
            let state = self.state.read();
            let subs = state.index.get(main_key)?;
            let mut values = HashMap::with_capacity(subs.len());
            for (sub_key, handle) in subs {
                if let Some(entry) = state.list.get(*handle) {
                    entry.touch();
                    if entry.reference() >= self.promote_threshold {
                        to_promote.push(sub_key.clone());
                    }
                    values.insert(sub_key.clone(), entry.value.clone());
                }
            }
            values
        };

        for sub_key in &to_promote {
            self.promote(main_key, sub_key);
        }
        Some(values)
    }

    /// Moves an entry to the front once its reference count reaches the threshold.
    ///
    /// The count is checked again under the exclusive lock because another
    /// reader may have promoted the entry in between.
    fn promote(&self, main_key: &str, sub_key: &str) {
        let mut state = self.state.write();
        let Some(handle) = state.lookup(main_key, sub_key) else {
            return;
        };
        let ready = state
            .list
            .get(handle)
            .map_or(false, |entry| entry.references() >= self.promote_threshold);
        if ready {
            state.list.move_to_front(handle);
            if let Some(entry) = state.list.get(handle) {
                entry.reset_references();
            }
        }
    }

    // == Peek ==
    /// Returns a value without touching recency state.
    pub fn peek(&self, main_key: &str, sub_key: &str) -> Option<V> {
        let state = self.state.read();
        state
            .lookup(main_key, sub_key)
            .and_then(|handle| state.list.get(handle))
            .map(|entry| entry.value.clone())
    }

    // == Contains ==
    /// Checks whether any entry exists under a main key.
    pub fn contains(&self, main_key: &str) -> bool {
        self.state.read().index.contains_key(main_key)
    }

    /// Checks whether a composite key exists.
    pub fn contains_sub(&self, main_key: &str, sub_key: &str) -> bool {
        self.state.read().lookup(main_key, sub_key).is_some()
    }

    // == Remove ==
    /// Removes every entry under a main key, returning whether any existed.
    pub fn remove(&self, main_key: &str) -> bool {
        let removed: Vec<CacheEntry<V>> = {
            let mut state = self.state.write();
            let handles: Vec<usize> = match state.index.get(main_key) {
                Some(subs) => subs.values().copied().collect(),
                None => return false,
            };
            handles
                .into_iter()
                .filter_map(|handle| state.remove_handle(handle))
                .collect()
        };

        for entry in &removed {
            self.notify_evicted(entry);
        }
        !removed.is_empty()
    }

    /// Removes one composite entry, returning whether it existed.
    pub fn remove_sub(&self, main_key: &str, sub_key: &str) -> bool {
        let removed = {
            let mut state = self.state.write();
            state
                .lookup(main_key, sub_key)
                .and_then(|handle| state.remove_handle(handle))
        };

        match removed {
            Some(entry) => {
                self.notify_evicted(&entry);
                true
            }
            None => false,
        }
    }

    // == Oldest ==
    /// Removes and returns the entry at the back.
    pub fn remove_oldest(&self) -> Option<(String, String, V)> {
        let entry = self.state.write().pop_back()?;
        self.notify_evicted(&entry);
        Some((entry.main_key, entry.sub_key, entry.value))
    }

    /// Returns the entry at the back without removing it.
    pub fn get_oldest(&self) -> Option<(String, String, V)> {
        let state = self.state.read();
        let entry = state.list.back().and_then(|handle| state.list.get(handle))?;
        Some((
            entry.main_key.clone(),
            entry.sub_key.clone(),
            entry.value.clone(),
        ))
    }

    // == Keys ==
    /// Returns all keys from the back (oldest) to the front (newest).
    pub fn keys(&self) -> Vec<CompositeKey> {
        self.state
            .read()
            .list
            .iter_from_back()
            .map(CacheEntry::key)
            .collect()
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.state.read().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.state.read().capacity
    }

    // == Resize ==
    /// Changes the capacity, evicting from the back when shrinking.
    ///
    /// Returns the number of entries evicted.
    pub fn resize(&self, capacity: usize) -> Result<usize> {
        if capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "shard capacity must be positive".to_string(),
            ));
        }

        let evicted = {
            let mut state = self.state.write();
            let overflow = state.list.len().saturating_sub(capacity);
            let evicted: Vec<CacheEntry<V>> =
                (0..overflow).filter_map(|_| state.pop_back()).collect();
            state.capacity = capacity;
            evicted
        };

        if !evicted.is_empty() {
            debug!(capacity, evicted = evicted.len(), "shard resized");
        }
        for entry in &evicted {
            self.notify_evicted(entry);
        }
        Ok(evicted.len())
    }

    // == Purge ==
    /// Removes all entries, invoking the eviction callback for each.
    pub fn purge(&self) {
        let drained = {
            let mut state = self.state.write();
            state.index.clear();
            state.list.drain()
        };

        for entry in &drained {
            self.notify_evicted(entry);
        }
    }

    // == Remove Expired ==
    /// Removes entries from the back while they have been idle longer than
    /// `max_age_secs`, stopping at the first entry that is still fresh.
    ///
    /// Promotion can move entries out of strict access-time order, so this
    /// is an approximation: an idle entry in front of a fresh one survives
    /// until the entries behind it expire too.
    ///
    /// Returns the number of entries removed.
    pub fn remove_expired(&self, max_age_secs: u64) -> usize {
        let cutoff = current_timestamp_ms().saturating_sub(max_age_secs.saturating_mul(1000));

        let expired = {
            let mut state = self.state.write();
            let mut expired = Vec::new();
            while let Some(back) = state.list.back() {
                let idle = state
                    .list
                    .get(back)
                    .map_or(false, |entry| entry.is_idle_since(cutoff));
                if !idle {
                    break;
                }
                if let Some(entry) = state.pop_back() {
                    expired.push(entry);
                }
            }
            expired
        };

        for entry in &expired {
            self.notify_evicted(entry);
        }
        expired.len()
    }

    fn notify_evicted(&self, entry: &CacheEntry<V>) {
        if let Some(callback) = &self.on_evict {
            callback(&entry.main_key, &entry.sub_key, &entry.value);
        }
    }

    #[cfg(test)]
    fn references(&self, main_key: &str, sub_key: &str) -> Option<u32> {
        let state = self.state.read();
        state
            .lookup(main_key, sub_key)
            .and_then(|handle| state.list.get(handle))
            .map(CacheEntry::references)
    }

    #[cfg(test)]
    fn backdate(&self, main_key: &str, sub_key: &str, last_access_ms: u64) {
        let state = self.state.read();
        if let Some(entry) = state
            .lookup(main_key, sub_key)
            .and_then(|handle| state.list.get(handle))
        {
            entry.set_last_access_ms(last_access_ms);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::thread;

    type Evicted = Arc<Mutex<Vec<(String, String, i32)>>>;

    fn recording_shard(capacity: usize) -> (Shard<i32>, Evicted) {
        let evicted: Evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = evicted.clone();
        let callback: EvictCallback<i32> = Arc::new(move |main: &str, sub: &str, value: &i32| {
            sink.lock().push((main.to_string(), sub.to_string(), *value));
        });
        let shard = Shard::with_options(ShardOptions::with_capacity(capacity), Some(callback))
            .unwrap();
        (shard, evicted)
    }

    fn main_keys(shard: &Shard<i32>) -> Vec<String> {
        shard.keys().into_iter().map(|k| k.main_key).collect()
    }

    #[test]
    fn test_new_rejects_zero_capacity() {
        assert!(matches!(
            Shard::<i32>::new(0),
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_set_and_get_sub() {
        let shard = Shard::new(10).unwrap();

        assert!(!shard.set("main", "sub", 1));
        assert_eq!(shard.get_sub("main", "sub"), Some(1));
        assert_eq!(shard.get_sub("main", "other"), None);
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_set_overwrites_in_place() {
        let shard = Shard::new(10).unwrap();

        shard.set("main", "sub", 1);
        assert!(!shard.set("main", "sub", 2));

        assert_eq!(shard.peek("main", "sub"), Some(2));
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_set_evicts_at_capacity() {
        let (shard, evicted) = recording_shard(1);

        assert!(!shard.set("1", "", 1));
        assert!(shard.set("2", "", 2));

        assert_eq!(evicted.lock().len(), 1);
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_eviction_callback_reports_actual_victim() {
        let (shard, evicted) = recording_shard(3);
        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            shard.set(key, "s", i as i32);
        }

        assert!(shard.set("d", "s", 3));

        let evicted = evicted.lock();
        assert_eq!(evicted.len(), 1);
        let (main, sub, value) = &evicted[0];
        assert!(!shard.contains_sub(main, sub));
        assert_eq!(sub, "s");
        assert_eq!(shard.len(), 3);
        assert!(shard.contains("d"));
        assert_eq!(*value, ["a", "b", "c"].iter().position(|k| k == main).unwrap() as i32);
    }

    #[test]
    fn test_small_shard_appends_new_entries_at_back() {
        let shard = Shard::new(10).unwrap();
        for i in 0..3 {
            shard.set(&i.to_string(), "", i);
        }

        // Fewer than ten entries leaves no probationary offset
        assert_eq!(main_keys(&shard), vec!["2", "1", "0"]);
    }

    #[test]
    fn test_probationary_insert_offset() {
        let shard = Shard::new(100).unwrap();
        for i in 0..20 {
            shard.set(&format!("k{}", i), "", i);
        }
        let before = main_keys(&shard);

        shard.set("new", "", 99);

        // 20 entries at 10% puts two entries behind the new one
        let keys = main_keys(&shard);
        assert_eq!(keys[2], "new");
        assert_eq!(&keys[..2], &before[..2]);
    }

    #[test]
    fn test_contains_or_add() {
        let shard = Shard::new(10).unwrap();

        assert_eq!(shard.contains_or_add("a", "", 1), (false, false));
        assert_eq!(shard.contains_or_add("a", "", 2), (true, false));

        assert_eq!(shard.peek("a", ""), Some(1));
        assert_eq!(shard.references("a", ""), Some(0));
    }

    #[test]
    fn test_get_returns_all_sub_entries() {
        let shard = Shard::new(10).unwrap();
        shard.set("user", "name", 1);
        shard.set("user", "age", 2);
        shard.set("other", "x", 3);

        let values = shard.get("user").unwrap();

        assert_eq!(values.len(), 2);
        assert_eq!(values.get("name"), Some(&1));
        assert_eq!(values.get("age"), Some(&2));
        assert!(shard.get("missing").is_none());
    }

    #[test]
    fn test_promotion_after_threshold_reads() {
        let shard = Shard::new(10).unwrap();
        for i in 0..5 {
            shard.set(&i.to_string(), "", i);
        }
        // Back to front: 4 3 2 1 0
        for _ in 0..4 {
            shard.get_sub("4", "");
        }
        assert_eq!(shard.references("4", ""), Some(4));
        assert_eq!(main_keys(&shard)[0], "4");

        shard.get_sub("4", "");

        assert_eq!(shard.references("4", ""), Some(0));
        assert_eq!(main_keys(&shard), vec!["3", "2", "1", "0", "4"]);

        shard.get_sub("4", "");
        assert_eq!(shard.references("4", ""), Some(1));
    }

    #[test]
    fn test_get_counts_towards_promotion() {
        let shard = Shard::new(10).unwrap();
        shard.set("a", "x", 1);
        shard.set("b", "x", 2);

        for _ in 0..5 {
            shard.get("b");
        }

        assert_eq!(main_keys(&shard).last().map(String::as_str), Some("b"));
        assert_eq!(shard.references("b", "x"), Some(0));
    }

    #[test]
    fn test_peek_and_contains_do_not_touch_recency() {
        let shard = Shard::new(10).unwrap();
        shard.set("a", "", 1);
        shard.set("b", "", 2);

        for _ in 0..10 {
            assert_eq!(shard.peek("b", ""), Some(2));
            assert!(shard.contains("b"));
            assert!(shard.contains_sub("b", ""));
        }

        assert_eq!(shard.references("b", ""), Some(0));
        assert_eq!(main_keys(&shard), vec!["b", "a"]);
    }

    #[test]
    fn test_remove_main_key() {
        let (shard, evicted) = recording_shard(10);
        shard.set("user", "a", 1);
        shard.set("user", "b", 2);
        shard.set("other", "a", 3);

        assert!(shard.remove("user"));
        assert!(!shard.remove("user"));

        assert!(!shard.contains("user"));
        assert!(shard.contains("other"));
        assert_eq!(evicted.lock().len(), 2);
    }

    #[test]
    fn test_remove_sub() {
        let shard = Shard::new(10).unwrap();
        shard.set("user", "a", 1);
        shard.set("user", "b", 2);

        assert!(shard.remove_sub("user", "a"));
        assert!(!shard.remove_sub("user", "a"));

        assert!(shard.contains("user"));
        assert!(!shard.contains_sub("user", "a"));
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_oldest() {
        let shard = Shard::new(10).unwrap();
        shard.set("1", "", 1);
        shard.set("2", "", 2);

        assert_eq!(
            shard.get_oldest(),
            Some(("2".to_string(), String::new(), 2))
        );
        assert_eq!(
            shard.remove_oldest(),
            Some(("2".to_string(), String::new(), 2))
        );
        assert_eq!(shard.get_oldest().map(|(m, _, _)| m), Some("1".to_string()));
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_oldest_empty() {
        let shard: Shard<i32> = Shard::new(10).unwrap();
        assert!(shard.get_oldest().is_none());
        assert!(shard.remove_oldest().is_none());
    }

    #[test]
    fn test_resize_shrink_evicts_from_back() {
        let (shard, evicted) = recording_shard(10);
        for i in 0..10 {
            shard.set(&i.to_string(), "", i);
        }
        let tail: Vec<String> = main_keys(&shard)[..6].to_vec();

        assert_eq!(shard.resize(4).unwrap(), 6);

        assert_eq!(shard.len(), 4);
        assert_eq!(shard.capacity(), 4);
        let evicted: Vec<String> = evicted.lock().iter().map(|(m, _, _)| m.clone()).collect();
        assert_eq!(evicted, tail);
    }

    #[test]
    fn test_resize_grow_evicts_nothing() {
        let shard = Shard::new(2).unwrap();
        shard.set("1", "", 1);
        shard.set("2", "", 2);

        assert_eq!(shard.resize(1).unwrap(), 1);
        assert_eq!(shard.resize(2).unwrap(), 0);

        shard.set("3", "", 3);
        assert_eq!(shard.len(), 2);
        assert!(shard.resize(0).is_err());
    }

    #[test]
    fn test_purge_notifies_every_entry() {
        let (shard, evicted) = recording_shard(10);
        shard.set("a", "1", 1);
        shard.set("a", "2", 2);
        shard.set("b", "1", 3);

        shard.purge();

        assert!(shard.is_empty());
        assert!(!shard.contains("a"));
        assert_eq!(evicted.lock().len(), 3);
    }

    #[test]
    fn test_remove_expired_stops_at_first_fresh_entry() {
        let shard = Shard::new(10).unwrap();
        shard.set("a", "", 1);
        shard.set("b", "", 2);
        shard.set("c", "", 3);
        // Back to front: c b a
        let old = current_timestamp_ms() - 120_000;
        shard.backdate("c", "", old);
        shard.backdate("a", "", old);

        assert_eq!(shard.remove_expired(60), 1);

        // 'a' is idle but sits in front of the fresh 'b'
        assert_eq!(main_keys(&shard), vec!["b", "a"]);
    }

    #[test]
    fn test_remove_expired_keeps_fresh_entries() {
        let shard = Shard::new(10).unwrap();
        shard.set("a", "", 1);

        assert_eq!(shard.remove_expired(60), 0);
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_concurrent_reads_and_writes() {
        let shard = Arc::new(Shard::new(64).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let shard = shard.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        let key = format!("{}", i % 100);
                        if (i + t) % 3 == 0 {
                            shard.set(&key, "", i);
                        } else {
                            shard.get_sub(&key, "");
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(shard.len() <= 64);
        assert_eq!(shard.keys().len(), shard.len());
    }
}
