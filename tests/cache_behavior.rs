//! Cache Contract Tests
//!
//! What the TTL cache guarantees through the access layer:
//! - A cache hit performs no store access and returns identical data
//! - Expired entries are never served
//! - Writes invalidate synchronously, so a read after a write is fresh
//! - Capacity overflow evicts the oldest entries

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use doccache::cache::CacheConfig;
use doccache::{AccessConfig, DataAccess, FilterOp, MemoryStore, QueryOptions, Stored};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Car {
    make: String,
    price: i64,
}

fn car(make: &str, price: i64) -> Car {
    Car {
        make: make.to_string(),
        price,
    }
}

fn access_with_cache(cache: CacheConfig) -> (Arc<MemoryStore>, DataAccess<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let access = DataAccess::with_config(
        Arc::clone(&store),
        AccessConfig {
            cache,
            audit_enabled: false,
            ..AccessConfig::default()
        },
    );
    (store, access)
}

fn default_cache() -> (Arc<MemoryStore>, DataAccess<MemoryStore>) {
    access_with_cache(CacheConfig::default())
}

// =============================================================================
// Hits and Misses
// =============================================================================

/// Two cached reads within the TTL hit the store exactly once and return
/// identical documents.
#[tokio::test]
async fn test_second_read_is_served_from_cache() {
    let (store, access) = default_cache();
    let id = access.create("cars", &car("BMW", 20000)).await.unwrap();

    let first: Stored<Car> = access.read("cars", &id, true).await.unwrap().unwrap();
    assert_eq!(store.read_count(), 1);

    let second: Stored<Car> = access.read("cars", &id, true).await.unwrap().unwrap();
    assert_eq!(store.read_count(), 1, "cache hit must not touch the store");
    assert_eq!(first, second);

    access.destroy();
}

/// Opting out of the cache always goes to the store.
#[tokio::test]
async fn test_uncached_read_always_fetches() {
    let (store, access) = default_cache();
    let id = access.create("cars", &car("BMW", 20000)).await.unwrap();

    let _: Option<Stored<Car>> = access.read("cars", &id, false).await.unwrap();
    let _: Option<Stored<Car>> = access.read("cars", &id, false).await.unwrap();
    assert_eq!(store.read_count(), 2);

    access.destroy();
}

/// After the TTL elapses the next read performs exactly one store fetch.
#[tokio::test]
async fn test_expired_entry_triggers_refetch() {
    let (store, access) = access_with_cache(CacheConfig {
        enabled: true,
        ttl: Duration::from_millis(50),
        max_size: 100,
    });
    let id = access.create("cars", &car("BMW", 20000)).await.unwrap();

    let _: Option<Stored<Car>> = access.read("cars", &id, true).await.unwrap();
    assert_eq!(store.read_count(), 1);

    tokio::time::sleep(Duration::from_millis(80)).await;

    let _: Option<Stored<Car>> = access.read("cars", &id, true).await.unwrap();
    assert_eq!(store.read_count(), 2, "expired entry must be refetched once");

    access.destroy();
}

// =============================================================================
// Invalidation
// =============================================================================

/// A read right after an update never sees the pre-update value.
#[tokio::test]
async fn test_update_invalidates_synchronously() {
    let (_, access) = default_cache();
    let id = access.create("cars", &car("BMW", 20000)).await.unwrap();

    // Prime the cache
    let _: Option<Stored<Car>> = access.read("cars", &id, true).await.unwrap();

    access
        .update("cars", &id, &json!({"price": 18000}))
        .await
        .unwrap();

    let doc: Stored<Car> = access.read("cars", &id, true).await.unwrap().unwrap();
    assert_eq!(doc.fields.price, 18000);

    access.destroy();
}

/// Creating a document drops every cached entry for that collection,
/// including query results.
#[tokio::test]
async fn test_create_invalidates_collection_queries() {
    let (store, access) = default_cache();
    access.create("cars", &car("BMW", 20000)).await.unwrap();

    let options = QueryOptions::new().filter("make", FilterOp::Eq, json!("BMW"));
    let first: Vec<Stored<Car>> = access.query("cars", &options, true).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(store.query_count(), 1);

    // Served from cache
    let _: Vec<Stored<Car>> = access.query("cars", &options, true).await.unwrap();
    assert_eq!(store.query_count(), 1);

    access.create("cars", &car("BMW", 25000)).await.unwrap();

    let after: Vec<Stored<Car>> = access.query("cars", &options, true).await.unwrap();
    assert_eq!(store.query_count(), 2, "create must drop the cached query");
    assert_eq!(after.len(), 2);

    access.destroy();
}

/// Increments invalidate the cached document like any other write.
#[tokio::test]
async fn test_increment_invalidates_entry() {
    let (_, access) = default_cache();
    let id = access.create("cars", &car("BMW", 20000)).await.unwrap();

    let _: Option<Stored<Car>> = access.read("cars", &id, true).await.unwrap();
    access
        .increment_field("cars", &id, "price", 1000.0)
        .await
        .unwrap();

    let doc: Stored<Car> = access.read("cars", &id, true).await.unwrap().unwrap();
    assert_eq!(doc.fields.price, 21000);

    access.destroy();
}

/// Soft-deleted state is visible through the cache path immediately.
#[tokio::test]
async fn test_soft_delete_invalidates_entry() {
    let (_, access) = default_cache();
    let id = access.create("cars", &car("BMW", 20000)).await.unwrap();

    let _: Option<Stored<Car>> = access.read("cars", &id, true).await.unwrap();
    access.delete("cars", &id, true).await.unwrap();

    let doc: Stored<Car> = access.read("cars", &id, true).await.unwrap().unwrap();
    assert!(!doc.meta.is_active);

    access.destroy();
}

// =============================================================================
// Capacity
// =============================================================================

/// With max_size=4, caching a fifth distinct document evicts exactly the
/// oldest entry (25% of 4, minimum one).
#[tokio::test]
async fn test_capacity_eviction_drops_oldest() {
    let (_, access) = access_with_cache(CacheConfig {
        enabled: true,
        ttl: Duration::from_secs(60),
        max_size: 4,
    });

    let mut ids = Vec::new();
    for price in [1, 2, 3, 4, 5] {
        ids.push(access.create("cars", &car("BMW", price)).await.unwrap());
    }

    for id in &ids[..4] {
        let _: Option<Stored<Car>> = access.read("cars", id, true).await.unwrap();
        // Distinct insertion instants so eviction order is deterministic
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert_eq!(access.cache_len(), 4);

    let _: Option<Stored<Car>> = access.read("cars", &ids[4], true).await.unwrap();
    assert_eq!(access.cache_len(), 4);

    let stats = access.cache_stats();
    assert_eq!(stats.evictions, 1);

    access.destroy();
}

/// A disabled cache never serves hits.
#[tokio::test]
async fn test_disabled_cache_reads_through() {
    let (store, access) = access_with_cache(CacheConfig {
        enabled: false,
        ttl: Duration::from_secs(60),
        max_size: 100,
    });
    let id = access.create("cars", &car("BMW", 20000)).await.unwrap();

    let _: Option<Stored<Car>> = access.read("cars", &id, true).await.unwrap();
    let _: Option<Stored<Car>> = access.read("cars", &id, true).await.unwrap();
    assert_eq!(store.read_count(), 2);
    assert_eq!(access.cache_len(), 0);

    access.destroy();
}

/// clear_cache drops everything without touching the store.
#[tokio::test]
async fn test_clear_cache() {
    let (store, access) = default_cache();
    let id = access.create("cars", &car("BMW", 20000)).await.unwrap();

    let _: Option<Stored<Car>> = access.read("cars", &id, true).await.unwrap();
    assert_eq!(access.cache_len(), 1);

    access.clear_cache();
    assert_eq!(access.cache_len(), 0);

    let _: Option<Stored<Car>> = access.read("cars", &id, true).await.unwrap();
    assert_eq!(store.read_count(), 2);

    access.destroy();
}
