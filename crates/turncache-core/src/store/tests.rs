//! Tests for the cache store

use super::*;
use crate::backend::MemoryBackend;
use crate::config::CacheSettings;
use crate::error::CacheError;

async fn store() -> CacheStore {
    let pool = CachePool::connect(&CacheSettings::default(), Arc::new(MemoryBackend::new()))
        .await
        .unwrap();
    CacheStore::new(pool, CacheKeys::default())
}

fn sid(id: &str) -> SessionId {
    SessionId::new(id).unwrap()
}

async fn fill(store: &CacheStore, session: &SessionId, n: usize) {
    for i in 1..=n {
        store
            .append(session, &CachedMessage::user(format!("m{i}")))
            .await
            .unwrap();
    }
}

fn contents(messages: &[CachedMessage]) -> Vec<&str> {
    messages.iter().map(|m| m.content.as_str()).collect()
}

#[tokio::test]
async fn test_append_returns_running_count() {
    let store = store().await;
    let s = sid("s");
    assert_eq!(store.append(&s, &CachedMessage::user("a")).await.unwrap(), 1);
    assert_eq!(store.append(&s, &CachedMessage::assistant("b")).await.unwrap(), 2);
    assert_eq!(store.count(&s).await.unwrap(), 2);
}

#[tokio::test]
async fn test_read_is_oldest_first_and_limit_takes_newest() {
    let store = store().await;
    let s = sid("s");
    fill(&store, &s, 5).await;

    let all = store.read(&s, None).await.unwrap();
    assert_eq!(contents(&all), vec!["m1", "m2", "m3", "m4", "m5"]);

    let last_two = store.read(&s, Some(2)).await.unwrap();
    assert_eq!(contents(&last_two), vec!["m4", "m5"]);

    let more_than_stored = store.read(&s, Some(50)).await.unwrap();
    assert_eq!(more_than_stored.len(), 5);

    let zero = store.read(&s, Some(0)).await.unwrap();
    assert_eq!(zero.len(), 5);
}

#[tokio::test]
async fn test_unknown_session_reads_empty() {
    let store = store().await;
    let s = sid("nobody");
    assert!(store.read(&s, None).await.unwrap().is_empty());
    assert_eq!(store.count(&s).await.unwrap(), 0);
    assert_eq!(store.get_summary(&s).await.unwrap(), None);
    assert!(!store.exists(&s).await.unwrap());
}

#[tokio::test]
async fn test_trim_no_op_cases() {
    let store = store().await;
    let s = sid("s");
    fill(&store, &s, 4).await;

    for keep_last in [0, -3, 4, 10] {
        let report = store.trim(&s, keep_last).await.unwrap();
        assert!(!report.trimmed, "keep_last={keep_last}");
        assert_eq!(report.count, 4);
    }
    assert_eq!(store.count(&s).await.unwrap(), 4);
}

#[tokio::test]
async fn test_trim_eligibility_boundary() {
    let store = store().await;
    let s = sid("s");
    fill(&store, &s, 3).await;

    for keep_last in [3, 4] {
        assert!(!trim_eligible(3, keep_last));
        let report = store.trim(&s, keep_last).await.unwrap();
        assert_eq!(report, TrimReport { trimmed: false, count: 3 });
    }

    fill(&store, &s, 1).await;
    assert!(trim_eligible(4, 3));
    let report = store.trim(&s, 3).await.unwrap();
    assert_eq!(report, TrimReport { trimmed: true, count: 3 });
    assert_eq!(contents(&store.read(&s, None).await.unwrap()), vec!["m2", "m3", "m1"]);
}

#[tokio::test]
async fn test_trim_keeps_newest_in_order() {
    let store = store().await;
    let s = sid("s");
    fill(&store, &s, 7).await;

    let report = store.trim(&s, 3).await.unwrap();
    assert_eq!(report, TrimReport { trimmed: true, count: 3 });
    assert_eq!(contents(&store.read(&s, None).await.unwrap()), vec!["m5", "m6", "m7"]);
}

#[tokio::test]
async fn test_summary_round_trip_and_overwrite() {
    let store = store().await;
    let s = sid("s");
    assert_eq!(store.get_summary(&s).await.unwrap(), None);

    store.set_summary(&s, "X").await.unwrap();
    assert_eq!(store.get_summary(&s).await.unwrap().as_deref(), Some("X"));

    store.set_summary(&s, "Y").await.unwrap();
    assert_eq!(store.get_summary(&s).await.unwrap().as_deref(), Some("Y"));
    assert!(store.exists(&s).await.unwrap());
}

#[tokio::test]
async fn test_clear_removes_both_and_is_idempotent() {
    let store = store().await;
    let s = sid("s");
    fill(&store, &s, 2).await;
    store.set_summary(&s, "X").await.unwrap();

    store.clear(&s).await.unwrap();
    store.clear(&s).await.unwrap();

    assert_eq!(store.count(&s).await.unwrap(), 0);
    assert_eq!(store.get_summary(&s).await.unwrap(), None);
    assert!(!store.exists(&s).await.unwrap());
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let store = store().await;
    let a = sid("a");
    let b = sid("b");
    fill(&store, &a, 3).await;
    store.set_summary(&b, "only b").await.unwrap();

    assert_eq!(store.count(&b).await.unwrap(), 0);
    assert_eq!(store.get_summary(&a).await.unwrap(), None);

    store.clear(&a).await.unwrap();
    assert!(store.exists(&b).await.unwrap());
}

#[tokio::test]
async fn test_outage_surfaces_storage_unavailable() {
    let backend = Arc::new(MemoryBackend::new());
    let pool = CachePool::connect(&CacheSettings::default(), backend.clone())
        .await
        .unwrap();
    let store = CacheStore::new(pool, CacheKeys::default());
    let s = sid("s");

    backend.set_available(false);
    let err = store.append(&s, &CachedMessage::user("a")).await.unwrap_err();
    assert!(matches!(err, CacheError::StorageUnavailable { .. }));
    assert_eq!(err.context(), Some("append to s"));
}
