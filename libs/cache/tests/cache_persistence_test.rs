//! Cache Persistence Tests
//!
//! Ensures cache entries and counters survive restarts, and that expired
//! entries found on disk are dropped.

use discovery_cache::{CacheConfig, DiscoveryCache, STATE_FILE};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

fn persistent_config(dir: &TempDir) -> CacheConfig {
    CacheConfig {
        persistence_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    }
}

fn entry_files(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .filter(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            name.ends_with(".json") && name != STATE_FILE
        })
        .count()
}

#[tokio::test]
async fn test_cache_persistence_across_restarts() {
    println!("🧪 Testing cache persistence across restarts");
    let temp_dir = TempDir::new().unwrap();

    // Phase 1: populate and stop
    {
        let cache = DiscoveryCache::open(persistent_config(&temp_dir)).await.unwrap();
        cache
            .set("discovery:kafka", &json!({"brokers": [{"id": 0}]}), None)
            .unwrap();
        cache.get("discovery:kafka").unwrap();
        cache.get("missing").unwrap();
        cache.stop().await.unwrap();
        println!("✅ Phase 1: entry written and snapshot flushed");
    }

    assert!(temp_dir.path().join(STATE_FILE).exists());
    assert_eq!(entry_files(&temp_dir), 1);

    // Phase 2: reopen and verify entry plus counters
    {
        let cache = DiscoveryCache::open(persistent_config(&temp_dir)).await.unwrap();
        let stats = cache.stats();
        assert_eq!(stats.counters.writes, 1);
        assert_eq!(stats.counters.hits, 1);
        assert_eq!(stats.counters.misses, 1);

        assert_eq!(
            cache.get("discovery:kafka").unwrap(),
            Some(json!({"brokers": [{"id": 0}]}))
        );
        cache.stop().await.unwrap();
        println!("✅ Phase 2: entry and counters restored");
    }
}

#[tokio::test]
async fn test_large_values_persist_compressed() {
    let temp_dir = TempDir::new().unwrap();
    let big = json!({ "topics": vec!["orders-events-v1"; 1000] });

    {
        let cache = DiscoveryCache::open(persistent_config(&temp_dir)).await.unwrap();
        cache.set("big", &big, None).unwrap();
        assert!(cache.total_bytes() < serde_json::to_vec(&big).unwrap().len());
        cache.stop().await.unwrap();
    }

    let cache = DiscoveryCache::open(persistent_config(&temp_dir)).await.unwrap();
    assert_eq!(cache.get("big").unwrap(), Some(big));
    cache.stop().await.unwrap();
}

#[tokio::test]
async fn test_expired_entries_on_disk_are_dropped_and_deleted() {
    let temp_dir = TempDir::new().unwrap();

    {
        let cache = DiscoveryCache::open(persistent_config(&temp_dir)).await.unwrap();
        cache
            .set("short", &json!(1), Some(Duration::from_millis(50)))
            .unwrap();
        cache.set("long", &json!(2), None).unwrap();
        cache.stop().await.unwrap();
    }
    assert_eq!(entry_files(&temp_dir), 2);

    tokio::time::sleep(Duration::from_millis(150)).await;

    let cache = DiscoveryCache::open(persistent_config(&temp_dir)).await.unwrap();
    assert_eq!(cache.keys(), vec!["long".to_string()]);
    assert_eq!(entry_files(&temp_dir), 1);
    cache.stop().await.unwrap();
}

#[tokio::test]
async fn test_capacity_reenforced_after_reload() {
    let temp_dir = TempDir::new().unwrap();

    {
        let cache = DiscoveryCache::open(persistent_config(&temp_dir)).await.unwrap();
        for key in ["a", "b", "c"] {
            cache.set(key, &json!(key), None).unwrap();
        }
        // "a" becomes the most recently used
        cache.get("a").unwrap();
        cache.stop().await.unwrap();
    }

    let config = CacheConfig {
        max_size: 2,
        ..persistent_config(&temp_dir)
    };
    let cache = DiscoveryCache::open(config).await.unwrap();
    assert_eq!(cache.size(), 2);
    assert!(cache.has("a"));
    assert!(cache.has("c"));
    assert!(!cache.has("b"));
    cache.stop().await.unwrap();
}

#[tokio::test]
async fn test_delete_removes_entry_file() {
    let temp_dir = TempDir::new().unwrap();
    let cache = DiscoveryCache::open(persistent_config(&temp_dir)).await.unwrap();
    cache.set("k", &json!(1), None).unwrap();
    cache.delete("k");
    cache.stop().await.unwrap();

    assert_eq!(entry_files(&temp_dir), 0);
}

#[tokio::test]
async fn test_delete_after_restart_survives_unclean_exit() {
    println!("🧪 Testing delete after restart without a final stop");
    let temp_dir = TempDir::new().unwrap();

    {
        let cache = DiscoveryCache::open(persistent_config(&temp_dir)).await.unwrap();
        cache.set("k", &json!("v"), None).unwrap();
        cache.stop().await.unwrap();
    }
    assert!(temp_dir.path().join(STATE_FILE).exists());

    {
        let cache = DiscoveryCache::open(persistent_config(&temp_dir)).await.unwrap();
        assert!(!temp_dir.path().join(STATE_FILE).exists());
        assert!(cache.delete("k"));
        // Dropped without stop(); the writer still drains the queued removal
    }
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(entry_files(&temp_dir), 0);

    let cache = DiscoveryCache::open(persistent_config(&temp_dir)).await.unwrap();
    assert_eq!(cache.get("k").unwrap(), None);
    assert_eq!(cache.size(), 0);
    cache.stop().await.unwrap();
    println!("✅ Deleted key stayed deleted");
}

#[tokio::test]
async fn test_snapshot_only_entries_get_entry_files() {
    let temp_dir = TempDir::new().unwrap();

    {
        let cache = DiscoveryCache::open(persistent_config(&temp_dir)).await.unwrap();
        cache.set("k", &json!(1), None).unwrap();
        cache.stop().await.unwrap();
    }
    // Lose the entry file as if its write had been dropped
    for entry in std::fs::read_dir(temp_dir.path()).unwrap().flatten() {
        if entry.file_name() != STATE_FILE {
            std::fs::remove_file(entry.path()).unwrap();
        }
    }
    assert_eq!(entry_files(&temp_dir), 0);

    {
        let cache = DiscoveryCache::open(persistent_config(&temp_dir)).await.unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(json!(1)));
        assert_eq!(entry_files(&temp_dir), 1);
        // Unclean exit: no snapshot written
    }

    let cache = DiscoveryCache::open(persistent_config(&temp_dir)).await.unwrap();
    assert_eq!(cache.get("k").unwrap(), Some(json!(1)));
    cache.stop().await.unwrap();
}
