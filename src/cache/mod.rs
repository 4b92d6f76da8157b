//! Cache Module
//!
//! Provides the in-process memory tier: sharded LRU stores with probationary
//! insertion, batched promotion and idle-time expiry.

mod entry;
mod lru;
mod memory;
mod pool;
mod shard;
mod stats;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry, CompositeKey};
pub use lru::EvictionList;
pub use memory::MemoryCache;
pub use pool::ShardPool;
pub use shard::{EvictCallback, Shard, ShardOptions};
pub use stats::{CacheStats, StatsRecorder};

// == Public Constants ==
/// Default probationary insert offset, as a percentage of shard length
pub const DEFAULT_INSERT_PERCENT: usize = 10;

/// Default number of reads before an entry is moved to the front
pub const DEFAULT_PROMOTE_THRESHOLD: u32 = 5;
