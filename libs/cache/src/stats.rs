//! Cache counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lock-free counters updated on every cache operation
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
    pub writes: AtomicU64,
    pub expirations: AtomicU64,
    pub deletes: AtomicU64,
}

impl CacheCounters {
    pub fn record(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }

    pub fn restore(&self, saved: &CounterSnapshot) {
        self.hits.store(saved.hits, Ordering::Relaxed);
        self.misses.store(saved.misses, Ordering::Relaxed);
        self.evictions.store(saved.evictions, Ordering::Relaxed);
        self.writes.store(saved.writes, Ordering::Relaxed);
        self.expirations.store(saved.expirations, Ordering::Relaxed);
        self.deletes.store(saved.deletes, Ordering::Relaxed);
    }
}

/// Plain copy of the counters, as persisted in the `_state` snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Successful lookups
    pub hits: u64,
    /// Lookups of absent or expired keys
    pub misses: u64,
    /// Entries removed to respect `max_size`
    pub evictions: u64,
    /// Successful `set` calls
    pub writes: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Explicit `delete` calls that removed an entry
    pub deletes: u64,
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    /// Counter values
    #[serde(flatten)]
    pub counters: CounterSnapshot,
    /// Live entries
    pub size: usize,
    /// Bytes held by live entries
    pub total_bytes: usize,
    /// `hits / (hits + misses)`, 0 before any lookup
    pub hit_rate: f64,
}

impl CacheStats {
    pub(crate) fn new(counters: CounterSnapshot, size: usize, total_bytes: usize) -> Self {
        let lookups = counters.hits + counters.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            counters.hits as f64 / lookups as f64
        };
        Self {
            counters,
            size,
            total_bytes,
            hit_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_is_zero_without_lookups() {
        let stats = CacheStats::new(CounterSnapshot::default(), 0, 0);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let counters = CounterSnapshot {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        let stats = CacheStats::new(counters, 2, 10);
        assert!((stats.hit_rate - 0.75).abs() < f64::EPSILON);
    }
}
