//! Cache Entry Module
//!
//! Defines a single memory-tier entry and its access bookkeeping.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// == Composite Key ==
/// The (main key, sub key) pair identifying one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    pub main_key: String,
    pub sub_key: String,
}

impl CompositeKey {
    pub fn new(main_key: impl Into<String>, sub_key: impl Into<String>) -> Self {
        Self {
            main_key: main_key.into(),
            sub_key: sub_key.into(),
        }
    }
}

// == Cache Entry ==
/// A stored value plus the bookkeeping used for promotion and expiry.
///
/// `last_access` and `references` are atomics so readers holding only the
/// shard's shared lock can update them.
#[derive(Debug)]
pub struct CacheEntry<V> {
    pub main_key: String,
    pub sub_key: String,
    pub value: V,
    /// Last read or write (Unix milliseconds)
    last_access: AtomicU64,
    /// Reads since the last promotion
    references: AtomicU32,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(main_key: String, sub_key: String, value: V) -> Self {
        Self {
            main_key,
            sub_key,
            value,
            last_access: AtomicU64::new(current_timestamp_ms()),
            references: AtomicU32::new(0),
        }
    }

    /// Refreshes the last access time.
    pub fn touch(&self) {
        self.last_access
            .store(current_timestamp_ms(), Ordering::Relaxed);
    }

    /// Last access time in Unix milliseconds.
    pub fn last_access_ms(&self) -> u64 {
        self.last_access.load(Ordering::Relaxed)
    }

    /// Counts one reference and returns the new total.
    pub fn reference(&self) -> u32 {
        self.references.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn references(&self) -> u32 {
        self.references.load(Ordering::Acquire)
    }

    pub fn reset_references(&self) {
        self.references.store(0, Ordering::Release);
    }

    // == Is Expired ==
    /// True when the entry has not been accessed since before `cutoff_ms`.
    pub fn is_idle_since(&self, cutoff_ms: u64) -> bool {
        self.last_access_ms() < cutoff_ms
    }

    pub fn key(&self) -> CompositeKey {
        CompositeKey::new(self.main_key.clone(), self.sub_key.clone())
    }

    #[cfg(test)]
    pub(crate) fn set_last_access_ms(&self, ms: u64) {
        self.last_access.store(ms, Ordering::Relaxed);
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
