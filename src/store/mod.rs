//! Backing Store Module
//!
//! The contract the distributed cache expects from its slower key/value
//! tier, plus an in-process implementation.

mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

pub use memory::InMemoryStore;

// == Backing Store ==
/// Byte-oriented key/value store sitting behind the memory tier.
///
/// Implementations own their retry and timeout policy; errors are returned
/// to cache callers unchanged. A missing key is `Ok(None)` / `Ok(false)`,
/// never an error.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Fetches the bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores bytes that expire after `ttl_seconds`; zero means no expiry.
    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> Result<()>;

    /// Stores bytes without expiry.
    async fn set_no_expire(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Deletes `key`; deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;
}

#[async_trait]
impl<S: BackingStore + ?Sized> BackingStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> Result<()> {
        (**self).set(key, value, ttl_seconds).await
    }

    async fn set_no_expire(&self, key: &str, value: Vec<u8>) -> Result<()> {
        (**self).set_no_expire(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key).await
    }
}
