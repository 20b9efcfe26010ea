//! Error types for the cache

use thiserror::Error;

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors surfaced by cache operations.
///
/// Persistence I/O never produces one of these on the hot path; writer
/// failures are logged by the background thread instead.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Configuration rejected by `CacheConfig::validate`
    #[error("Invalid cache configuration: {0}")]
    Configuration(String),

    /// Value could not be serialized or deserialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression or decompression of a stored value failed
    #[error("Compression failed for key '{key}': {reason}")]
    Compression {
        /// Affected key
        key: String,
        /// Underlying error message
        reason: String,
    },

    /// `search` received an invalid regular expression
    #[error("Invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Persistence directory could not be prepared at startup
    #[error("Persistence I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Background writer could not be stopped cleanly
    #[error("Persistence shutdown failed: {0}")]
    Shutdown(String),
}
