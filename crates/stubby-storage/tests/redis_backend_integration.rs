//! These tests start a Redis container and need a Docker daemon.

use std::collections::HashSet;

use jiff::Timestamp;
use redis::AsyncCommands;
use stubby_core::{LinkId, LinkRecord};
use stubby_storage::{LinkBackend, RedisBackend, StorageError};
use stubby_test_infra::redis::{RedisConfig, RedisServer};

struct Fixture {
    _redis: RedisServer,
    conn: redis::aio::MultiplexedConnection,
    backend: RedisBackend,
}

impl Fixture {
    async fn start() -> Self {
        let redis = RedisServer::new(RedisConfig::builder().build())
            .await
            .expect("start redis");
        let conn = redis.connection().await.expect("redis connection");
        let backend = RedisBackend::with_prefix(conn.clone(), "test:");

        Self {
            _redis: redis,
            conn,
            backend,
        }
    }
}

fn id(value: i64) -> LinkId {
    LinkId::new(value).unwrap()
}

fn record(url: &str, expires_at: Option<Timestamp>) -> LinkRecord {
    LinkRecord::new(url, Timestamp::from_second(1_700_000_000).unwrap(), expires_at)
}

#[tokio::test]
async fn ids_start_at_one_and_increase() {
    let fixture = Fixture::start().await;

    assert_eq!(fixture.backend.allocate_id().await.unwrap(), id(1));
    assert_eq!(fixture.backend.allocate_id().await.unwrap(), id(2));
}

#[tokio::test]
async fn insert_writes_one_hash_per_record() {
    let fixture = Fixture::start().await;
    let expires = Timestamp::from_second(1_700_000_060).unwrap();

    fixture
        .backend
        .insert(id(1), &record("https://example.org", Some(expires)))
        .await
        .unwrap();

    let mut conn = fixture.conn.clone();
    let url: String = conn.hget("test:link:1", "url").await.unwrap();
    let until: i64 = conn.hget("test:link:1", "until").await.unwrap();
    let count: i64 = conn.hget("test:link:1", "count").await.unwrap();
    assert_eq!(url, "https://example.org");
    assert_eq!(until, 1_700_000_060);
    assert_eq!(count, 0);

    let got = fixture.backend.fetch(id(1)).await.unwrap().unwrap();
    assert_eq!(got, record("https://example.org", Some(expires)));
}

#[tokio::test]
async fn insert_never_overwrites() {
    let fixture = Fixture::start().await;
    let first = record("https://first.example", None);
    let expires = Timestamp::from_second(1_700_000_060).unwrap();

    fixture.backend.insert(id(1), &first).await.unwrap();
    let err = fixture
        .backend
        .insert(id(1), &record("https://second.example", Some(expires)))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Conflict(_)));
    assert_eq!(fixture.backend.fetch(id(1)).await.unwrap().unwrap(), first);
}

#[tokio::test]
async fn fetch_missing_returns_none() {
    let fixture = Fixture::start().await;
    assert!(fixture.backend.fetch(id(42)).await.unwrap().is_none());
}

#[tokio::test]
async fn record_click_increments_existing_records_only() {
    let fixture = Fixture::start().await;
    fixture
        .backend
        .insert(id(3), &record("https://example.org", None))
        .await
        .unwrap();

    assert_eq!(fixture.backend.record_click(id(3)).await.unwrap(), 1);
    assert_eq!(fixture.backend.record_click(id(3)).await.unwrap(), 2);

    assert!(fixture.backend.record_click(id(4)).await.is_err());
    let mut conn = fixture.conn.clone();
    let exists: bool = conn.exists("test:link:4").await.unwrap();
    assert!(!exists);
}

#[tokio::test]
async fn concurrent_allocations_and_clicks_are_atomic() {
    let fixture = Fixture::start().await;
    let mut handles = vec![];

    for _ in 0..50 {
        let backend = fixture.backend.clone();
        handles.push(tokio::spawn(async move { backend.allocate_id().await.unwrap() }));
    }
    let mut ids = HashSet::new();
    for handle in handles {
        assert!(ids.insert(handle.await.unwrap()));
    }
    assert_eq!(ids, (1..=50).map(id).collect::<HashSet<_>>());

    fixture
        .backend
        .insert(id(1), &record("https://example.org", None))
        .await
        .unwrap();

    let mut clicks = vec![];
    for _ in 0..50 {
        let backend = fixture.backend.clone();
        clicks.push(tokio::spawn(async move { backend.record_click(id(1)).await.unwrap() }));
    }
    for handle in clicks {
        handle.await.unwrap();
    }
    assert_eq!(fixture.backend.fetch(id(1)).await.unwrap().unwrap().clicks, 50);
}
