//! Configuration Module
//!
//! Handles loading and validating cache configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::cache::{ShardOptions, DEFAULT_INSERT_PERCENT, DEFAULT_PROMOTE_THRESHOLD};
use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Number of independent shards in the memory tier
    pub shard_count: usize,
    /// Maximum number of entries each shard can hold
    pub shard_capacity: usize,
    /// Idle seconds after which memory entries are swept, 0 disables the sweeper
    pub max_cache_seconds: u64,
    /// Default TTL in seconds for backing-store writes
    pub store_ttl_seconds: u64,
    /// Probationary insert offset, as a percentage of shard length from the tail
    pub insert_percent: usize,
    /// Reads needed before an entry is moved to the front
    pub promote_threshold: u32,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_SHARD_COUNT` - Number of shards (default: 16)
    /// - `CACHE_SHARD_CAPACITY` - Entries per shard (default: 1024)
    /// - `CACHE_MAX_SECONDS` - Memory idle expiry in seconds (default: 300)
    /// - `CACHE_STORE_TTL` - Backing-store TTL in seconds (default: 3600)
    /// - `CACHE_INSERT_PERCENT` - Probationary insert offset (default: 10)
    /// - `CACHE_PROMOTE_THRESHOLD` - Reads before promotion (default: 5)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            shard_count: env_or("CACHE_SHARD_COUNT", defaults.shard_count),
            shard_capacity: env_or("CACHE_SHARD_CAPACITY", defaults.shard_capacity),
            max_cache_seconds: env_or("CACHE_MAX_SECONDS", defaults.max_cache_seconds),
            store_ttl_seconds: env_or("CACHE_STORE_TTL", defaults.store_ttl_seconds),
            insert_percent: env_or("CACHE_INSERT_PERCENT", defaults.insert_percent),
            promote_threshold: env_or("CACHE_PROMOTE_THRESHOLD", defaults.promote_threshold),
        }
    }

    /// Rejects values the cache cannot be built with.
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(CacheError::InvalidConfig(
                "shard count must be positive".to_string(),
            ));
        }
        self.shard_options().validate()
    }

    /// Per-shard options derived from this configuration.
    pub fn shard_options(&self) -> ShardOptions {
        ShardOptions {
            capacity: self.shard_capacity,
            insert_percent: self.insert_percent,
            promote_threshold: self.promote_threshold,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shard_count: 16,
            shard_capacity: 1024,
            max_cache_seconds: 300,
            store_ttl_seconds: 3600,
            insert_percent: DEFAULT_INSERT_PERCENT,
            promote_threshold: DEFAULT_PROMOTE_THRESHOLD,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.shard_count, 16);
        assert_eq!(config.shard_capacity, 1024);
        assert_eq!(config.max_cache_seconds, 300);
        assert_eq!(config.store_ttl_seconds, 3600);
        assert_eq!(config.insert_percent, 10);
        assert_eq!(config.promote_threshold, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_SHARD_COUNT");
        env::remove_var("CACHE_SHARD_CAPACITY");
        env::remove_var("CACHE_MAX_SECONDS");
        env::remove_var("CACHE_STORE_TTL");
        env::remove_var("CACHE_INSERT_PERCENT");
        env::remove_var("CACHE_PROMOTE_THRESHOLD");

        let config = CacheConfig::from_env();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_shards() {
        let config = CacheConfig {
            shard_count: 0,
            ..CacheConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = CacheConfig {
            shard_capacity: 0,
            ..CacheConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_insert_percent_over_100() {
        let config = CacheConfig {
            insert_percent: 101,
            ..CacheConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
