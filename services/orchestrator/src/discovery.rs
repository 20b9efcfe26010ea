//! Discovery producers and the caching layer in front of them

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use discovery_cache::DiscoveryCache;
use tracing::{debug, warn};
use types::InfrastructureRecord;

use crate::Result;

/// Source of provider payloads (management APIs, orchestrator APIs, files)
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// Current view of `provider`'s infrastructure
    async fn discover(&self, provider: &str) -> Result<InfrastructureRecord>;
}

/// Serves discovery results from the cache while they are fresh
pub struct CachingDiscovery<D> {
    inner: D,
    cache: Arc<DiscoveryCache>,
    ttl: Option<Duration>,
}

impl<D: DiscoverySource> CachingDiscovery<D> {
    /// Cache `inner` with the cache's default TTL
    pub fn new(inner: D, cache: Arc<DiscoveryCache>) -> Self {
        Self {
            inner,
            cache,
            ttl: None,
        }
    }

    /// Override the TTL of cached records
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Cache key of `provider`'s record
    pub fn cache_key(provider: &str) -> String {
        format!("discovery:{provider}")
    }

    /// Drop the cached record so the next call goes to the source
    pub fn invalidate(&self, provider: &str) -> bool {
        self.cache.delete(&Self::cache_key(provider))
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

#[async_trait]
impl<D: DiscoverySource> DiscoverySource for CachingDiscovery<D> {
    async fn discover(&self, provider: &str) -> Result<InfrastructureRecord> {
        let key = Self::cache_key(provider);

        match self.cache.get_as::<InfrastructureRecord>(&key) {
            Ok(Some(record)) => {
                debug!(provider = %provider, "Discovery served from cache");
                return Ok(record);
            }
            Ok(None) => {}
            Err(e) => {
                // Unreadable entries are replaced by the fresh record below
                warn!(provider = %provider, error = %e, "Ignoring unreadable cached discovery record");
            }
        }

        let record = self.inner.discover(provider).await?;
        if let Err(e) = self.cache.set_from(key, &record, self.ttl) {
            warn!(provider = %provider, error = %e, "Failed to cache discovery record");
        }
        Ok(record)
    }
}
