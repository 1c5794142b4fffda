//! End-to-end properties of the session cache.
//!
//! Run: `cargo test --package turncache-core --test cache_properties`

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use turncache_core::{
    CacheError, CachePool, CacheSettings, CachedMessage, ContextSource, ConversationOrchestrator,
    DurableStore, ExtractiveSummarizer, MemoryBackend, MemoryDurableStore, RetryConfig,
    SessionCacheService, SessionId, SignalSource,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn service_with(settings: CacheSettings, backend: Arc<MemoryBackend>) -> SessionCacheService {
    let pool = CachePool::connect(&settings, backend).await.unwrap();
    SessionCacheService::new(pool, &settings)
}

async fn service(limit: i64) -> SessionCacheService {
    let settings = CacheSettings::default().with_message_limit(limit);
    service_with(settings, Arc::new(MemoryBackend::new())).await
}

fn sid(id: &str) -> SessionId {
    SessionId::new(id).unwrap()
}

fn numbered(i: usize) -> CachedMessage {
    CachedMessage::user(format!("message #{i}"))
}

// ---------------------------------------------------------------------------
// Threshold crossing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_signal_flips_exactly_once_at_limit() {
    for limit in [1_i64, 3, 10] {
        let cache = service(limit).await;
        let s = sid("crossing");

        let flags: Vec<bool> = {
            let mut flags = Vec::new();
            for i in 1..=25 {
                flags.push(cache.add_message(&s, &numbered(i)).await.unwrap().needs_summarization);
            }
            flags
        };

        let raised: Vec<usize> = flags
            .iter()
            .enumerate()
            .filter(|(_, raised)| **raised)
            .map(|(i, _)| i + 1)
            .collect();
        assert_eq!(raised, vec![limit as usize], "limit={limit}");
    }
}

#[tokio::test]
async fn test_disabled_limit_never_signals() {
    for limit in [0_i64, -5] {
        let cache = service(limit).await;
        let s = sid("disabled");
        for i in 1..=30 {
            let outcome = cache.add_message(&s, &numbered(i)).await.unwrap();
            assert!(!outcome.needs_summarization);
            assert_eq!(outcome.count, i);
        }
        let trim = cache.trim(&s, Some(5)).await.unwrap();
        assert!(trim.trimmed);
        assert!(!trim.needs_summarization);
    }
}

#[tokio::test]
async fn test_ten_message_scenario_then_trim_three() {
    let cache = service(10).await;
    let s = sid("scenario");

    for i in 1..=9 {
        let outcome = cache.add_message(&s, &numbered(i)).await.unwrap();
        assert!(!outcome.needs_summarization, "append #{i}");
        assert_eq!(outcome.count, i);
    }

    let tenth = cache.add_message(&s, &numbered(10)).await.unwrap();
    assert!(tenth.needs_summarization);
    assert_eq!(tenth.count, 10);

    let trim = cache.trim(&s, Some(3)).await.unwrap();
    assert!(trim.trimmed);
    assert_eq!(trim.count, 3);
    assert!(!trim.needs_summarization);

    let retained: Vec<String> = cache
        .get_messages(&s, None)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(retained, vec!["message #8", "message #9", "message #10"]);
}

#[tokio::test]
async fn test_trim_that_stays_above_limit_resignals() {
    let settings = CacheSettings::default()
        .with_message_limit(4)
        .with_keep_last(6);
    let cache = service_with(settings, Arc::new(MemoryBackend::new())).await;
    let s = sid("pathological");

    for i in 1..=8 {
        cache.add_message(&s, &numbered(i)).await.unwrap();
    }
    let trim = cache.trim(&s, None).await.unwrap();
    assert!(trim.trimmed);
    assert_eq!(trim.count, 6);
    assert!(trim.needs_summarization);
    assert!(cache.trim_signal(&s, &trim).is_some());
}

#[tokio::test]
async fn test_untrimmed_session_rearms_without_repeating_the_crossing() {
    let settings = CacheSettings::default()
        .with_message_limit(4)
        .with_keep_last(2);
    let cache = service_with(settings, Arc::new(MemoryBackend::new())).await;
    let s = sid("missed-trim");

    let mut crossings = Vec::new();
    let mut signals = Vec::new();
    for i in 1..=10 {
        let outcome = cache.add_message(&s, &numbered(i)).await.unwrap();
        if outcome.needs_summarization {
            crossings.push(outcome.count);
        }
        if let Some(signal) = cache.append_signal(&s, &outcome) {
            signals.push((signal.count, signal.source));
        }
    }

    assert_eq!(crossings, vec![4]);
    assert_eq!(
        signals,
        vec![
            (4, SignalSource::Append),
            (6, SignalSource::Overdue),
            (8, SignalSource::Overdue),
            (10, SignalSource::Overdue),
        ]
    );
}

// ---------------------------------------------------------------------------
// Trim edge cases
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_trim_no_ops_leave_count_unchanged() {
    let cache = service(100).await;
    let s = sid("trim");
    for i in 1..=5 {
        cache.add_message(&s, &numbered(i)).await.unwrap();
    }

    for keep_last in [0, -1, 5, 6] {
        let trim = cache.trim(&s, Some(keep_last)).await.unwrap();
        assert!(!trim.trimmed, "keep_last={keep_last}");
        assert_eq!(trim.count, 5);
    }

    let empty = cache.trim(&sid("never-seen"), Some(2)).await.unwrap();
    assert!(!empty.trimmed);
    assert_eq!(empty.count, 0);
}

// ---------------------------------------------------------------------------
// Summary and clear
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_summary_round_trip_and_absent_summary() {
    let cache = service(10).await;
    let s = sid("summary");
    assert_eq!(cache.get_summary(&s).await.unwrap(), None);

    cache.set_summary(&s, "X").await.unwrap();
    assert_eq!(cache.get_summary(&s).await.unwrap().as_deref(), Some("X"));
}

#[tokio::test]
async fn test_double_clear_is_safe() {
    let cache = service(10).await;
    let s = sid("clear");
    cache.add_message(&s, &numbered(1)).await.unwrap();
    cache.set_summary(&s, "X").await.unwrap();

    cache.clear_session(&s).await.unwrap();
    cache.clear_session(&s).await.unwrap();

    assert_eq!(cache.get_count(&s).await.unwrap(), 0);
    assert_eq!(cache.get_summary(&s).await.unwrap(), None);
    assert!(!cache.session_exists(&s).await.unwrap());
}

// ---------------------------------------------------------------------------
// Restoration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_restoration_scenario() {
    let settings = CacheSettings::default();
    let pool = CachePool::connect(&settings, Arc::new(MemoryBackend::new()))
        .await
        .unwrap();
    let cache = Arc::new(SessionCacheService::new(pool, &settings));
    let durable = Arc::new(MemoryDurableStore::new());
    let s1 = sid("s1");

    for text in ["first", "second", "third"] {
        durable.append(&s1, &CachedMessage::user(text)).await.unwrap();
    }
    durable.set_summary(&s1, "recap").await.unwrap();

    let orchestrator = ConversationOrchestrator::new(
        cache.clone(),
        durable,
        Arc::new(ExtractiveSummarizer::new()),
        RetryConfig::default().with_max_attempts(1),
    );

    let context = orchestrator.load_context(&s1).await.unwrap();
    assert_eq!(context.source, ContextSource::Restored);

    assert_eq!(cache.get_summary(&s1).await.unwrap().as_deref(), Some("recap"));
    assert!(cache.get_messages(&s1, None).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

async fn concurrent_counts(cache: Arc<SessionCacheService>, n: usize) -> Vec<(usize, bool)> {
    let s = sid("concurrent");
    let tasks = (1..=n).map(|i| {
        let cache = cache.clone();
        let s = s.clone();
        tokio::spawn(async move {
            let outcome = cache.add_message(&s, &numbered(i)).await.unwrap();
            (outcome.count, outcome.needs_summarization)
        })
    });
    futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_appends_get_distinct_counts() {
    let n = 200;
    let cache = Arc::new(service(50).await);
    let results = concurrent_counts(cache.clone(), n).await;

    let counts: BTreeSet<usize> = results.iter().map(|(c, _)| *c).collect();
    assert_eq!(counts, (1..=n).collect::<BTreeSet<_>>());

    let triggers = results.iter().filter(|(_, raised)| *raised).count();
    assert_eq!(triggers, 1);
    assert_eq!(cache.get_count(&sid("concurrent")).await.unwrap(), n);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_session_lock_protects_unserialized_backend() {
    let n = 100;
    let settings = CacheSettings::default().with_message_limit(30);
    let backend = Arc::new(MemoryBackend::without_key_serialization());
    let cache = Arc::new(service_with(settings, backend).await);

    let results = concurrent_counts(cache, n).await;
    let counts: BTreeSet<usize> = results.iter().map(|(c, _)| *c).collect();
    assert_eq!(counts.len(), n);
    assert_eq!(results.iter().filter(|(_, raised)| *raised).count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_trim_racing_appends_never_duplicates() {
    let cache = Arc::new(service(1000).await);
    let s = sid("race");
    for i in 1..=20 {
        cache.add_message(&s, &numbered(i)).await.unwrap();
    }

    let appender = {
        let cache = cache.clone();
        let s = s.clone();
        tokio::spawn(async move {
            for i in 21..=60 {
                cache.add_message(&s, &numbered(i)).await.unwrap();
            }
        })
    };
    let trimmer = {
        let cache = cache.clone();
        let s = s.clone();
        tokio::spawn(async move {
            for _ in 0..10 {
                cache.trim(&s, Some(5)).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };
    appender.await.unwrap();
    trimmer.await.unwrap();

    let messages = cache.get_messages(&s, None).await.unwrap();
    let numbers: Vec<usize> = messages
        .iter()
        .map(|m| m.content.trim_start_matches("message #").parse().unwrap())
        .collect();

    // Survivors are a strictly increasing run ending at the last append.
    assert!(numbers.windows(2).all(|w| w[1] == w[0] + 1));
    assert_eq!(numbers.last(), Some(&60));
}

// ---------------------------------------------------------------------------
// Failure modes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_slow_backend_times_out_as_storage_unavailable() {
    let settings = CacheSettings::default().with_operation_timeout(Duration::from_millis(30));
    let backend = Arc::new(MemoryBackend::new());
    let cache = service_with(settings, backend.clone()).await;

    backend.set_latency(Some(Duration::from_millis(300)));
    let err = cache.add_message(&sid("slow"), &numbered(1)).await.unwrap_err();
    assert!(matches!(err, CacheError::StorageUnavailable { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_not_initialized_before_connect_and_after_close() {
    let settings = CacheSettings::default();
    let pool = Arc::new(CachePool::new(&settings));
    let cache = SessionCacheService::new(pool.clone(), &settings);
    let s = sid("lifecycle");

    let err = cache.add_message(&s, &numbered(1)).await.unwrap_err();
    assert!(matches!(err, CacheError::NotInitialized { .. }));
    assert!(!err.is_retryable());

    pool.attach(Arc::new(MemoryBackend::new())).await.unwrap();
    assert_eq!(cache.add_message(&s, &numbered(1)).await.unwrap().count, 1);

    pool.close().await;
    let err = cache.get_count(&s).await.unwrap_err();
    assert!(matches!(err, CacheError::NotInitialized { .. }));
}

#[tokio::test]
async fn test_unreachable_backend_is_storage_unavailable_not_empty() {
    let backend = Arc::new(MemoryBackend::new());
    let cache = service_with(CacheSettings::default(), backend.clone()).await;
    let s = sid("outage");
    cache.add_message(&s, &numbered(1)).await.unwrap();

    backend.set_available(false);
    let err = cache.get_messages(&s, None).await.unwrap_err();
    assert!(matches!(err, CacheError::StorageUnavailable { .. }));
    assert!(!err.user_message().contains("outage"));

    let health = cache.health_check().await;
    assert!(health.initialized);
    assert!(!health.reachable);
}
