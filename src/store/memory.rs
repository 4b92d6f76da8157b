//! In-Memory Store Module
//!
//! HashMap-backed store with per-key TTL, usable wherever a backing store
//! is needed without an external server.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::current_timestamp_ms;
use crate::error::Result;
use crate::store::BackingStore;

// == Stored Value ==
/// Bytes plus an optional expiry deadline.
#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    expires_at: Option<u64>,
}

impl StoredValue {
    fn new(bytes: Vec<u8>, ttl_seconds: Option<u64>) -> Self {
        let expires_at = ttl_seconds
            .map(|ttl| current_timestamp_ms().saturating_add(ttl.saturating_mul(1000)));
        Self { bytes, expires_at }
    }

    /// Expired once the current time reaches the deadline.
    fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at.map_or(false, |expires| now_ms >= expires)
    }
}

// == In-Memory Store ==
/// Backing store kept in process memory.
///
/// Expired keys read as absent and are dropped lazily on access or in bulk by
/// [`InMemoryStore::cleanup_expired`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl InMemoryStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, value| !value.is_expired(now));
        before - entries.len()
    }

    /// Number of stored keys, including expired ones not yet cleaned up.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remaining TTL in seconds, or None for a missing or non-expiring key.
    pub async fn ttl_remaining(&self, key: &str) -> Option<u64> {
        let now = current_timestamp_ms();
        let entries = self.entries.read().await;
        let expires = entries.get(key)?.expires_at?;
        Some(expires.saturating_sub(now) / 1000)
    }

    async fn insert(&self, key: &str, value: StoredValue) {
        self.entries.write().await.insert(key.to_string(), value);
    }
}

#[async_trait]
impl BackingStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = current_timestamp_ms();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(value) if !value.is_expired(now) => return Ok(Some(value.bytes.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it unless it was rewritten in the meantime
        let mut entries = self.entries.write().await;
        if entries.get(key).map_or(false, |value| value.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> Result<()> {
        let ttl = (ttl_seconds > 0).then_some(ttl_seconds);
        self.insert(key, StoredValue::new(value, ttl)).await;
        Ok(())
    }

    async fn set_no_expire(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.insert(key, StoredValue::new(value, None)).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let now = current_timestamp_ms();
        let entries = self.entries.read().await;
        Ok(entries.get(key).map_or(false, |value| !value.is_expired(now)))
    }
}
