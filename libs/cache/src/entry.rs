//! Stored cache entries and their (de)compression

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// zstd level used for large values
const COMPRESSION_LEVEL: i32 = 3;

/// One stored value with its expiry metadata.
///
/// `payload` holds the JSON-serialized value, zstd-compressed when
/// `compressed` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Stored bytes
    #[serde(with = "payload_base64")]
    pub payload: Vec<u8>,
    /// Whether `payload` is compressed
    pub compressed: bool,
    /// Serialized size before compression
    pub original_size: usize,
    /// Unix milliseconds at insertion
    pub created_at: i64,
    /// Time to live in milliseconds
    pub ttl_ms: u64,
}

impl CacheEntry {
    /// Serialize `value`, compressing above `threshold` when enabled
    pub fn encode(
        key: &str,
        value: &serde_json::Value,
        ttl_ms: u64,
        compress: bool,
        threshold: usize,
        now_ms: i64,
    ) -> Result<Self> {
        let raw = serde_json::to_vec(value)?;
        let original_size = raw.len();

        let (payload, compressed) = if compress && original_size > threshold {
            let packed = zstd::encode_all(raw.as_slice(), COMPRESSION_LEVEL).map_err(|e| {
                CacheError::Compression {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            })?;
            (packed, true)
        } else {
            (raw, false)
        };

        Ok(Self {
            payload,
            compressed,
            original_size,
            created_at: now_ms,
            ttl_ms,
        })
    }

    /// Recover the stored value
    pub fn decode(&self, key: &str) -> Result<serde_json::Value> {
        if self.compressed {
            let raw = zstd::decode_all(self.payload.as_slice()).map_err(|e| {
                CacheError::Compression {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            })?;
            Ok(serde_json::from_slice(&raw)?)
        } else {
            Ok(serde_json::from_slice(&self.payload)?)
        }
    }

    /// True once `now - created_at > ttl`
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.created_at) > self.ttl_ms as i64
    }

    /// Bytes held in memory for this entry
    pub fn stored_size(&self) -> usize {
        self.payload.len()
    }
}

mod payload_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}
