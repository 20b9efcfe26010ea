//! TTL + LRU cache store

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::error::{CacheError, Result};
use crate::persistence::{PersistenceLayer, StateSnapshot};
use crate::stats::{CacheCounters, CacheStats};

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

struct Slot {
    entry: CacheEntry,
    last_access: u64,
}

/// Map plus bookkeeping, guarded by one lock so evict-then-insert is atomic
#[derive(Default)]
struct CacheState {
    slots: HashMap<String, Slot>,
    access_clock: u64,
    total_bytes: usize,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.access_clock += 1;
        self.access_clock
    }

    fn remove(&mut self, key: &str) -> Option<Slot> {
        let slot = self.slots.remove(key)?;
        self.total_bytes = self.total_bytes.saturating_sub(slot.entry.stored_size());
        Some(slot)
    }

    fn insert(&mut self, key: String, entry: CacheEntry, last_access: u64) {
        self.total_bytes += entry.stored_size();
        if let Some(old) = self.slots.insert(key, Slot { entry, last_access }) {
            self.total_bytes = self.total_bytes.saturating_sub(old.entry.stored_size());
        }
    }

    fn least_recent_key(&self) -> Option<String> {
        self.slots
            .iter()
            .min_by_key(|(_, slot)| slot.last_access)
            .map(|(key, _)| key.clone())
    }
}

struct CacheShared {
    config: CacheConfig,
    state: Mutex<CacheState>,
    counters: CacheCounters,
    persistence: Option<PersistenceLayer>,
}

impl CacheShared {
    fn evict_least_recent(&self, state: &mut CacheState) -> Option<String> {
        let victim = state.least_recent_key()?;
        state.remove(&victim);
        CacheCounters::record(&self.counters.evictions);
        if let Some(persistence) = &self.persistence {
            persistence.enqueue_remove(&victim);
        }
        debug!(key = %victim, "Evicted least recently used cache entry");
        Some(victim)
    }

    fn expire(&self, state: &mut CacheState, key: &str) {
        if state.remove(key).is_some() {
            CacheCounters::record(&self.counters.expirations);
            if let Some(persistence) = &self.persistence {
                persistence.enqueue_remove(key);
            }
            debug!(key, "Cache entry expired");
        }
    }

    fn sweep(&self) -> usize {
        let now = now_ms();
        let mut state = self.state.lock();
        let expired: Vec<String> = state
            .slots
            .iter()
            .filter(|(_, slot)| slot.entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.expire(&mut state, key);
        }
        expired.len()
    }

    fn snapshot_state(&self) -> StateSnapshot {
        let state = self.state.lock();
        let mut snapshot = StateSnapshot {
            counters: self.counters.snapshot(),
            saved_at: now_ms(),
            ..Default::default()
        };
        for (key, slot) in &state.slots {
            snapshot.entries.insert(key.clone(), slot.entry.clone());
            snapshot.access_times.insert(key.clone(), slot.last_access);
            snapshot.sizes.insert(key.clone(), slot.entry.stored_size());
        }
        snapshot
    }
}

/// Key/value cache with TTL expiry, LRU eviction, transparent compression and
/// optional durable persistence.
///
/// Values are `serde_json::Value` trees; use [`DiscoveryCache::get_as`] and
/// [`DiscoveryCache::set_from`] for typed access.
pub struct DiscoveryCache {
    shared: Arc<CacheShared>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    stop_signal: Arc<Notify>,
}

impl DiscoveryCache {
    /// Build the cache, reload persisted state and start the expiry sweeper.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn open(config: CacheConfig) -> Result<Self> {
        config.validate().map_err(CacheError::Configuration)?;

        let persistence = match &config.persistence_dir {
            Some(dir) => Some(PersistenceLayer::start(dir.clone(), config.persistence_queue_size)?),
            None => None,
        };

        let shared = Arc::new(CacheShared {
            config,
            state: Mutex::new(CacheState::default()),
            counters: CacheCounters::default(),
            persistence,
        });

        if let Some(persistence) = &shared.persistence {
            let loaded = persistence.load(now_ms());
            if let Some(counters) = &loaded.counters {
                shared.counters.restore(counters);
            }

            let mut ordered: Vec<(String, CacheEntry, u64)> = loaded
                .entries
                .into_iter()
                .map(|(key, entry)| {
                    let access = loaded
                        .access_times
                        .get(&key)
                        .copied()
                        .unwrap_or(entry.created_at.max(0) as u64);
                    (key, entry, access)
                })
                .collect();
            ordered.sort_by_key(|(_, entry, access)| (*access, entry.created_at));

            let mut state = shared.state.lock();
            for (key, entry, _) in ordered {
                let tick = state.tick();
                state.insert(key, entry, tick);
            }
            while state.slots.len() > shared.config.max_size {
                shared.evict_least_recent(&mut state);
            }
            info!(entries = state.slots.len(), "Cache restored from disk");
        }

        let stop_signal = Arc::new(Notify::new());
        let sweeper = tokio::spawn(Self::sweep_loop(shared.clone(), stop_signal.clone()));

        Ok(Self {
            shared,
            sweeper: Mutex::new(Some(sweeper)),
            stop_signal,
        })
    }

    async fn sweep_loop(shared: Arc<CacheShared>, stop_signal: Arc<Notify>) {
        let mut interval = tokio::time::interval(shared.config.sweep_interval());
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let removed = shared.sweep();
                    if removed > 0 {
                        debug!(removed, "Expiry sweep removed entries");
                    }
                }
                _ = stop_signal.notified() => break,
            }
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    /// Value for `key`, or `None` if absent or expired. A hit refreshes recency.
    pub fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let now = now_ms();
        let mut state = self.shared.state.lock();

        let expired = match state.slots.get(key) {
            None => {
                CacheCounters::record(&self.shared.counters.misses);
                return Ok(None);
            }
            Some(slot) => slot.entry.is_expired(now),
        };
        if expired {
            self.shared.expire(&mut state, key);
            CacheCounters::record(&self.shared.counters.misses);
            return Ok(None);
        }

        let tick = state.tick();
        let Some(slot) = state.slots.get_mut(key) else {
            return Ok(None);
        };
        slot.last_access = tick;
        CacheCounters::record(&self.shared.counters.hits);
        slot.entry.decode(key).map(Some)
    }

    /// Typed lookup
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace `key`. When the cache is full and `key` is new, the
    /// least recently accessed entry is evicted first, under the same lock.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: &serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let key = key.into();
        let config = &self.shared.config;
        let ttl_ms = ttl.map_or(config.default_ttl_ms, |d| d.as_millis() as u64);
        let entry = CacheEntry::encode(
            &key,
            value,
            ttl_ms,
            config.enable_compression,
            config.compression_threshold_bytes,
            now_ms(),
        )?;

        let mut state = self.shared.state.lock();
        if !state.slots.contains_key(&key) && state.slots.len() >= config.max_size {
            self.shared.evict_least_recent(&mut state);
        }
        let tick = state.tick();
        if let Some(persistence) = &self.shared.persistence {
            persistence.enqueue_write(&key, &entry);
        }
        state.insert(key, entry, tick);
        CacheCounters::record(&self.shared.counters.writes);
        Ok(())
    }

    /// Typed insert
    pub fn set_from<T: Serialize>(
        &self,
        key: impl Into<String>,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set(key, &value, ttl)
    }

    /// Remove `key`; returns whether it was present
    pub fn delete(&self, key: &str) -> bool {
        let mut state = self.shared.state.lock();
        let removed = state.remove(key).is_some();
        if removed {
            CacheCounters::record(&self.shared.counters.deletes);
            if let Some(persistence) = &self.shared.persistence {
                persistence.enqueue_remove(key);
            }
        }
        removed
    }

    /// Whether `key` is present and not expired. Does not refresh recency.
    pub fn has(&self, key: &str) -> bool {
        let now = now_ms();
        self.shared
            .state
            .lock()
            .slots
            .get(key)
            .is_some_and(|slot| !slot.entry.is_expired(now))
    }

    /// Live `(key, value)` pairs whose key matches `pattern`, sorted by key
    pub fn search(&self, pattern: &str) -> Result<Vec<(String, serde_json::Value)>> {
        let regex = Regex::new(pattern)?;
        let now = now_ms();
        let state = self.shared.state.lock();

        let mut matches = state
            .slots
            .iter()
            .filter(|(key, slot)| regex.is_match(key) && !slot.entry.is_expired(now))
            .map(|(key, slot)| slot.entry.decode(key).map(|value| (key.clone(), value)))
            .collect::<Result<Vec<_>>>()?;
        matches.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(matches)
    }

    /// Live and not-yet-swept keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.shared.state.lock().slots.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Remove every entry
    pub fn clear(&self) {
        let mut state = self.shared.state.lock();
        if let Some(persistence) = &self.shared.persistence {
            for key in state.slots.keys() {
                persistence.enqueue_remove(key);
            }
        }
        state.slots.clear();
        state.total_bytes = 0;
    }

    /// Number of entries held
    pub fn size(&self) -> usize {
        self.shared.state.lock().slots.len()
    }

    /// Bytes held by stored payloads
    pub fn total_bytes(&self) -> usize {
        self.shared.state.lock().total_bytes
    }

    /// Run one expiry sweep now; returns the number of entries removed
    pub fn sweep_expired(&self) -> usize {
        self.shared.sweep()
    }

    /// Counters, size and hit rate
    pub fn stats(&self) -> CacheStats {
        let (size, total_bytes) = {
            let state = self.shared.state.lock();
            (state.slots.len(), state.total_bytes)
        };
        CacheStats::new(self.shared.counters.snapshot(), size, total_bytes)
    }

    /// Persistence writes dropped because the writer queue was full
    pub fn dropped_persistence_writes(&self) -> u64 {
        self.shared
            .persistence
            .as_ref()
            .map_or(0, PersistenceLayer::dropped_writes)
    }

    /// Stop the sweeper and, with persistence enabled, flush the full state
    /// snapshot. Idempotent.
    pub async fn stop(&self) -> Result<()> {
        self.stop_signal.notify_one();
        let sweeper = self.sweeper.lock().take();
        if let Some(handle) = sweeper {
            if let Err(e) = handle.await {
                warn!(error = %e, "Cache sweeper ended abnormally");
            }
        }

        if let Some(persistence) = &self.shared.persistence {
            persistence.stop(self.shared.snapshot_state()).await?;
        }
        Ok(())
    }
}

impl Drop for DiscoveryCache {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
    }
}
