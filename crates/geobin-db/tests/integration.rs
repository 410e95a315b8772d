//! Integration tests for the Redis backend.
//!
//! These tests require a live Redis instance. Run with:
//!
//! ```bash
//! docker run --rm -d -p 6379:6379 redis:7
//! cargo test -p geobin-db -- --ignored
//! ```
//!
//! All tests are marked `#[ignore]` so they are skipped during normal
//! `cargo test` runs. Each test uses its own bin ids and a short TTL, so
//! they can share one database and clean up after themselves.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::TimeDelta;
use geobin_db::{BinStore, RedisStore};
use geobin_types::GeobinRequest;

/// Redis connection URL for the local Docker instance.
const REDIS_URL: &str = "redis://localhost:6379";

async fn connect() -> BinStore {
    RedisStore::connect(REDIS_URL)
        .await
        .expect("Failed to connect to Redis -- is Docker running?")
        .into()
}

fn entry(timestamp: i64, body: &str) -> String {
    let request = GeobinRequest {
        timestamp,
        headers: BTreeMap::new(),
        body: body.to_owned(),
        geo: None,
    };
    serde_json::to_string(&request).unwrap()
}

#[tokio::test]
#[ignore = "requires live Redis instance (docker run -p 6379:6379 redis)"]
async fn redis_create_append_history() {
    let store = connect().await;
    let id = "it-history";

    store.create_bin(id, TimeDelta::seconds(60)).await.unwrap();
    assert!(store.bin_exists(id).await.unwrap());
    assert_eq!(store.count(id).await.unwrap(), Some(0));
    assert!(store.history(id).await.unwrap().is_empty());

    let older = entry(1_000, "first");
    let newer = entry(2_000, "second");
    store.append(id, 2_000, newer.clone()).await.unwrap();
    store.append(id, 1_000, older.clone()).await.unwrap();

    assert_eq!(store.count(id).await.unwrap(), Some(2));
    assert_eq!(store.history(id).await.unwrap(), vec![newer, older]);

    store.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires live Redis instance (docker run -p 6379:6379 redis)"]
async fn redis_unknown_bin() {
    let store = connect().await;
    assert!(!store.bin_exists("it-never-created").await.unwrap());
    assert_eq!(store.count("it-never-created").await.unwrap(), None);
    assert!(store.history("it-never-created").await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires live Redis instance (docker run -p 6379:6379 redis)"]
async fn redis_bin_expires() {
    let store = connect().await;
    let id = "it-expiry";
    store.create_bin(id, TimeDelta::seconds(1)).await.unwrap();
    assert!(store.bin_exists(id).await.unwrap());

    tokio::time::sleep(Duration::from_millis(2_100)).await;
    assert!(!store.bin_exists(id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires live Redis instance (docker run -p 6379:6379 redis)"]
async fn redis_publish_reaches_local_viewers() {
    let store = connect().await;
    let id = "it-live";
    store.create_bin(id, TimeDelta::seconds(60)).await.unwrap();

    let mut first = store.subscribe(id).await.unwrap();
    let mut second = store.subscribe(id).await.unwrap();
    // Give the SUBSCRIBE a moment to register server side.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let payload = entry(3_000, "live");
    store.publish(id, payload.clone()).await.unwrap();

    let received = tokio::time::timeout(Duration::from_secs(2), first.recv())
        .await
        .expect("no message within 2s")
        .unwrap();
    assert_eq!(received, payload);
    assert_eq!(second.recv().await.unwrap(), payload);

    store.unsubscribe(id).await.unwrap();
    store.unsubscribe(id).await.unwrap();
    store.close().await.unwrap();
}
