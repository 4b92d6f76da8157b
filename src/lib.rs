//! Tiercache - A two-tier key/value cache
//!
//! Sharded in-process LRU memory tier with probationary insertion and
//! idle-time expiry, in front of a write-through backing store with
//! negative caching and coalesced reads.

pub mod cache;
pub mod codec;
pub mod config;
pub mod distributed;
pub mod error;
pub mod store;
pub mod sync;
pub mod tasks;

pub use cache::{CacheStats, CompositeKey, EvictCallback, MemoryCache};
pub use codec::{Codec, JsonCodec, TextCodec};
pub use config::CacheConfig;
pub use distributed::{from_store_key, to_store_key, DistributedCache};
pub use error::{CacheError, Result};
pub use store::{BackingStore, InMemoryStore};
