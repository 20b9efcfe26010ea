//! # Discovery Cache
//!
//! TTL + LRU key/value store used by discovery producers to avoid repeating
//! expensive infrastructure lookups.
//!
//! ## Purpose
//!
//! - Bounded in-memory map: when full, inserting a new key evicts the least
//!   recently accessed entry in the same critical section
//! - TTL expiry on read plus a periodic background sweep
//! - Transparent zstd compression of values above a size threshold
//! - Optional durable persistence: one file per entry written by a background
//!   thread, plus a full `_state` snapshot on [`DiscoveryCache::stop`]
//!
//! ## Failure Semantics
//!
//! Persistence is best-effort. Disk errors and a full writer queue are logged
//! and counted, never returned from `get`/`set`. Capacity and TTL are enforced
//! in memory regardless of persistence state.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use discovery_cache::{CacheConfig, DiscoveryCache};
//! use std::time::Duration;
//!
//! # async fn demo() -> discovery_cache::Result<()> {
//! let cache = DiscoveryCache::open(CacheConfig::with_persistence("/var/cache/pipeline")).await?;
//! cache.set("discovery:kafka", &serde_json::json!({"brokers": []}), Some(Duration::from_secs(60)))?;
//! let hit = cache.get("discovery:kafka")?;
//! cache.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod error;
mod persistence;
pub mod stats;
pub mod store;

pub use config::CacheConfig;
pub use entry::CacheEntry;
pub use error::{CacheError, Result};
pub use persistence::STATE_FILE;
pub use stats::{CacheStats, CounterSnapshot};
pub use store::DiscoveryCache;
