//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// A missing key is never an error; lookups report absence through `Option`
/// or `bool`. The enum is `Clone` so a single coalesced backing-store result
/// can be handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Construction or resize with unusable parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Backing store failure, message kept verbatim
    #[error("Backing store error: {0}")]
    Backend(String),

    /// Marshal or unmarshal failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key cannot be mapped to or from its external form
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Background work could not be started
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_is_kept() {
        let err = CacheError::Backend("connection refused".to_string());
        assert_eq!(err.to_string(), "Backing store error: connection refused");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: CacheError = json_err.into();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
