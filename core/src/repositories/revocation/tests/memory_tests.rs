//! Unit tests for the in-memory revocation store

use std::sync::Arc;

use crate::repositories::revocation::{InMemoryRevocationStore, RevocationStore};
use crate::services::clock::ManualClock;

fn store_at(secs: i64) -> (InMemoryRevocationStore, ManualClock) {
    let clock = ManualClock::at_timestamp(secs);
    (InMemoryRevocationStore::with_clock(Arc::new(clock.clone())), clock)
}

#[tokio::test]
async fn test_put_and_exists() {
    let (store, _clock) = store_at(1_000);

    assert!(!store.exists("revocation:a").await.unwrap());
    store.put("revocation:a", "logout", 60).await.unwrap();

    assert!(store.exists("revocation:a").await.unwrap());
    assert_eq!(store.get("revocation:a").await.as_deref(), Some("logout"));
    assert!(!store.exists("revocation:b").await.unwrap());
}

#[tokio::test]
async fn test_entry_expires_with_ttl() {
    let (store, clock) = store_at(1_000);
    store.put("revocation:a", "logout", 60).await.unwrap();

    clock.advance_secs(59);
    assert!(store.exists("revocation:a").await.unwrap());

    clock.advance_secs(1);
    assert!(!store.exists("revocation:a").await.unwrap());
    assert!(store.is_empty().await);
    assert_eq!(store.purge_expired().await, 1);
}

#[tokio::test]
async fn test_set_if_absent_is_single_use() {
    let (store, _clock) = store_at(1_000);

    assert!(store.set_if_absent("refresh-used:r1", "1", 60).await.unwrap());
    assert!(!store.set_if_absent("refresh-used:r1", "1", 60).await.unwrap());
    assert!(store.set_if_absent("refresh-used:r2", "1", 60).await.unwrap());
}

#[tokio::test]
async fn test_set_if_absent_succeeds_after_expiry() {
    let (store, clock) = store_at(1_000);

    assert!(store.set_if_absent("refresh-used:r1", "1", 10).await.unwrap());
    clock.advance_secs(10);
    assert!(store.set_if_absent("refresh-used:r1", "1", 10).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_set_if_absent_has_one_winner() {
    let (store, _clock) = store_at(1_000);
    let store = Arc::new(store);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.set_if_absent("refresh-used:r1", "1", 60).await })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_huge_ttl_does_not_overflow() {
    let (store, _clock) = store_at(1_000);
    store.put("revocation:a", "x", u64::MAX).await.unwrap();
    assert!(store.exists("revocation:a").await.unwrap());
}

#[tokio::test]
async fn test_writes_drop_expired_entries() {
    let (store, clock) = store_at(1_000);

    for i in 0..1_000 {
        store.put(&format!("revocation:{}", i), "logout", 1).await.unwrap();
        store.set_if_absent(&format!("refresh-used:{}", i), "1", 1).await.unwrap();
    }
    store.put("revocation:long", "logout", 3_600).await.unwrap();
    assert_eq!(store.held().await, 2_001);

    clock.advance_secs(10);
    store.put("revocation:fresh", "logout", 60).await.unwrap();

    assert_eq!(store.len().await, 2);
    assert_eq!(store.held().await, 2);
    assert!(store.exists("revocation:long").await.unwrap());
}

#[tokio::test]
async fn test_set_if_absent_drops_expired_entries() {
    let (store, clock) = store_at(1_000);

    store.put("revocation:a", "logout", 5).await.unwrap();
    store.put("revocation:b", "logout", 5).await.unwrap();
    clock.advance_secs(5);

    assert!(store.set_if_absent("refresh-used:r1", "1", 60).await.unwrap());
    assert_eq!(store.held().await, 1);
}

#[tokio::test]
async fn test_live_entries_are_never_purged() {
    let (store, clock) = store_at(1_000);

    store.put("revocation:a", "logout", 60).await.unwrap();
    clock.advance_secs(30);
    store.put("revocation:b", "logout", 60).await.unwrap();

    assert_eq!(store.held().await, 2);
    assert_eq!(store.purge_expired().await, 0);
}
