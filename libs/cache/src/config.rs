//! Cache configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::DiscoveryCache`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of live entries before LRU eviction
    pub max_size: usize,
    /// TTL applied when `set` is called without one
    pub default_ttl_ms: u64,
    /// Serialized values larger than this are compressed
    pub compression_threshold_bytes: usize,
    /// Master switch for compression
    pub enable_compression: bool,
    /// Interval of the background expiry sweep
    pub sweep_interval_ms: u64,
    /// Directory for per-entry files and the `_state` snapshot (None = memory only)
    pub persistence_dir: Option<PathBuf>,
    /// Capacity of the queue feeding the background writer
    pub persistence_queue_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            default_ttl_ms: 300_000,
            compression_threshold_bytes: 1024,
            enable_compression: true,
            sweep_interval_ms: 60_000,
            persistence_dir: None,
            persistence_queue_size: 1024,
        }
    }
}

impl CacheConfig {
    /// In-memory config with persistence under `dir`
    pub fn with_persistence(dir: impl Into<PathBuf>) -> Self {
        Self {
            persistence_dir: Some(dir.into()),
            ..Default::default()
        }
    }

    /// Default TTL as a `Duration`
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    /// Sweep interval as a `Duration`
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Reject values the cache cannot operate with
    pub fn validate(&self) -> Result<(), String> {
        if self.max_size == 0 {
            return Err("max_size must be greater than 0".to_string());
        }
        if self.default_ttl_ms == 0 {
            return Err("default_ttl_ms must be greater than 0".to_string());
        }
        if self.sweep_interval_ms == 0 {
            return Err("sweep_interval_ms must be greater than 0".to_string());
        }
        if self.persistence_dir.is_some() && self.persistence_queue_size == 0 {
            return Err("persistence_queue_size must be greater than 0 when persistence is enabled".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CacheConfig::default();
        assert_eq!(config.max_size, 1000);
        assert_eq!(config.default_ttl(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let config = CacheConfig {
            max_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: CacheConfig = serde_json::from_str(r#"{"max_size": 10}"#).unwrap();
        assert_eq!(config.max_size, 10);
        assert_eq!(config.sweep_interval_ms, 60_000);
        assert!(config.enable_compression);
    }
}
