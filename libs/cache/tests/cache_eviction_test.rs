//! TTL and capacity behaviour of the in-memory store

use discovery_cache::{CacheConfig, DiscoveryCache};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_expired_get_is_a_single_miss() {
    let cache = DiscoveryCache::open(CacheConfig::default()).await.unwrap();
    let big_value = json!({ "payload": "x".repeat(4096) });

    cache
        .set("k", &big_value, Some(Duration::from_millis(1000)))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let misses_before = cache.stats().counters.misses;
    assert_eq!(cache.get("k").unwrap(), None);
    assert_eq!(cache.stats().counters.misses, misses_before + 1);
}

#[tokio::test]
async fn test_live_entry_is_a_hit() {
    let cache = DiscoveryCache::open(CacheConfig::default()).await.unwrap();
    cache.set("k", &json!(1), Some(Duration::from_secs(60))).unwrap();
    assert_eq!(cache.get("k").unwrap(), Some(json!(1)));
    assert_eq!(cache.stats().hit_rate, 1.0);
}

#[tokio::test]
async fn test_capacity_evicts_oldest_access() {
    println!("🧪 Testing LRU eviction at capacity");
    let max_size = 5;
    let cache = DiscoveryCache::open(CacheConfig {
        max_size,
        ..Default::default()
    })
    .await
    .unwrap();

    for i in 0..max_size {
        cache.set(format!("key-{i}"), &json!(i), None).unwrap();
    }
    // Touch key-0 so key-1 becomes the oldest
    cache.get("key-0").unwrap();
    cache.set("key-new", &json!("new"), None).unwrap();

    assert_eq!(cache.size(), max_size);
    assert!(!cache.has("key-1"));
    assert!(cache.has("key-0"));
    assert!(cache.has("key-new"));
    assert_eq!(cache.stats().counters.evictions, 1);
    println!("✅ Evicted key-1 as least recently used");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_never_exceed_capacity() {
    let max_size = 16;
    let cache = Arc::new(
        DiscoveryCache::open(CacheConfig {
            max_size,
            ..Default::default()
        })
        .await
        .unwrap(),
    );

    let mut handles = Vec::new();
    for writer in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..100 {
                cache
                    .set(format!("w{writer}-{i}"), &json!(i), None)
                    .unwrap();
                assert!(cache.size() <= max_size);
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(cache.size(), max_size);
    assert_eq!(cache.stats().counters.evictions, 800 - max_size as u64);
}

#[tokio::test]
async fn test_background_sweep_runs_on_interval() {
    let cache = DiscoveryCache::open(CacheConfig {
        sweep_interval_ms: 20,
        ..Default::default()
    })
    .await
    .unwrap();

    cache.set("k", &json!(1), Some(Duration::from_millis(5))).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(cache.size(), 0);
    assert_eq!(cache.stats().counters.expirations, 1);
    cache.stop().await.unwrap();
}
