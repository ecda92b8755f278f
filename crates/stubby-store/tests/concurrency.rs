use std::collections::HashSet;
use std::sync::Arc;

use jiff::SignedDuration;
use sqlx::sqlite::SqlitePoolOptions;
use stubby_core::{KeyCodec, LinkBackend, LinkError};
use stubby_storage::{InMemoryBackend, SqliteBackend};
use stubby_store::{LinkStore, StoreSettings};

const N: usize = 64;

async fn sqlite_backend() -> SqliteBackend {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("open sqlite");
    let backend = SqliteBackend::new(pool);
    backend.migrate().await.expect("create schema");
    backend
}

async fn concurrent_saves_get_distinct_consecutive_ids<B: LinkBackend>(
    store: LinkStore<B>,
    first_id: i64,
) {
    let store = Arc::new(store);
    let mut handles = vec![];

    for i in 0..N {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .save(&format!("https://example.org/{i}"), SignedDuration::ZERO)
                .await
                .unwrap()
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        let key = handle.await.unwrap();
        assert!(ids.insert(KeyCodec::decode(key.as_str()).unwrap().get()));
    }

    let expected: HashSet<i64> = (first_id..first_id + N as i64).collect();
    assert_eq!(ids, expected);
}

async fn concurrent_lookups_count_every_click<B: LinkBackend>(store: LinkStore<B>) {
    let store = Arc::new(store);
    let key = store
        .save("https://example.org", SignedDuration::ZERO)
        .await
        .unwrap();

    let mut handles = vec![];
    for _ in 0..N {
        let store = Arc::clone(&store);
        let key = key.clone();
        handles.push(tokio::spawn(async move { store.lookup(key.as_str()).await.unwrap() }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), "https://example.org");
    }

    assert_eq!(store.info(key.as_str()).await.unwrap().clicks, N as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_memory_concurrent_saves() {
    concurrent_saves_get_distinct_consecutive_ids(LinkStore::new(InMemoryBackend::new()), 1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_memory_concurrent_saves_continue_from_counter() {
    concurrent_saves_get_distinct_consecutive_ids(
        LinkStore::new(InMemoryBackend::with_counter(1000)),
        1001,
    )
    .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_memory_concurrent_lookups() {
    concurrent_lookups_count_every_click(LinkStore::new(InMemoryBackend::new())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_concurrent_saves() {
    concurrent_saves_get_distinct_consecutive_ids(LinkStore::new(sqlite_backend().await), 1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_concurrent_lookups() {
    concurrent_lookups_count_every_click(LinkStore::new(sqlite_backend().await)).await;
}

#[tokio::test]
async fn oversized_url_leaves_the_sequence_untouched() {
    let store = LinkStore::with_settings(
        sqlite_backend().await,
        StoreSettings::builder().max_url_length(2048).build(),
    );

    let first = store.save("https://a.example", SignedDuration::ZERO).await.unwrap();
    let err = store
        .save(&format!("https://b.example/{}", "x".repeat(2048)), SignedDuration::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, LinkError::Validation(_)));
    let second = store.save("https://c.example", SignedDuration::ZERO).await.unwrap();

    assert_eq!(KeyCodec::decode(first.as_str()).unwrap().get(), 1);
    assert_eq!(KeyCodec::decode(second.as_str()).unwrap().get(), 2);
}

#[tokio::test]
async fn real_clock_expiry() {
    let store = LinkStore::new(InMemoryBackend::new());
    let key = store
        .save("https://example.org", SignedDuration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(store.lookup(key.as_str()).await.unwrap(), "https://example.org");

    tokio::time::sleep(std::time::Duration::from_secs(2)).await;

    assert!(matches!(store.lookup(key.as_str()).await, Err(LinkError::Expired)));
}
