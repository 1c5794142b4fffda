//! Diagnostic check functions

use super::types::CheckResult;
use std::path::Path;
use turncache_core::{CacheSettings, DurableStore, PoolHealth, SessionId};

const PROBE_SESSION: &str = "turncache-doctor-probe";

/// Flag threshold combinations that make summarization ineffective
pub fn check_thresholds(settings: &CacheSettings) -> Vec<CheckResult> {
    let mut results = Vec::new();
    let (limit, keep_last) = (settings.message_limit, settings.keep_last);

    if limit <= 0 {
        results.push(
            CheckResult::warn("Thresholds", "message_limit <= 0, summarization is disabled")
                .with_hint("Set message_limit to a positive count"),
        );
        return results;
    }

    if keep_last <= 0 {
        results.push(
            CheckResult::warn("Thresholds", "keep_last <= 0, trims after summarization do nothing")
                .with_hint(format!("A common choice is keep_last = {}", limit / 2)),
        );
    } else if keep_last >= limit {
        results.push(
            CheckResult::warn(
                "Thresholds",
                format!("keep_last ({keep_last}) >= message_limit ({limit}), every trim re-signals"),
            )
            .with_hint("Keep keep_last below message_limit"),
        );
    } else {
        results.push(CheckResult::pass(
            "Thresholds",
            format!("Trim keeps {keep_last} of {limit} messages"),
        ));
    }
    results
}

/// The durable data directory exists (or can be created) and is writable
pub async fn check_data_dir(dir: &Path) -> CheckResult {
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        return CheckResult::fail("Data Directory", format!("Cannot create {}: {e}", dir.display()))
            .with_hint("Pass --data-dir or set TURNCACHE__DURABLE__DATA_DIR");
    }

    let probe = dir.join(".turncache-write-probe");
    match tokio::fs::write(&probe, b"ok").await {
        Ok(()) => {
            let _ = tokio::fs::remove_file(&probe).await;
            CheckResult::pass("Data Directory", format!("Writable: {}", dir.display()))
        }
        Err(e) => CheckResult::fail("Data Directory", format!("Not writable: {e}"))
            .with_hint("Check directory permissions"),
    }
}

pub fn check_pool(health: &PoolHealth) -> CheckResult {
    if !health.initialized {
        return CheckResult::fail("Cache Pool", "Not initialized");
    }
    let backend = health.backend.as_deref().unwrap_or("backend");
    if !health.reachable {
        let error = health.error.as_deref().unwrap_or("unknown error");
        return CheckResult::fail("Cache Pool", format!("{backend} unreachable: {error}"))
            .with_hint("Check the backend and operation_timeout");
    }
    let latency = health
        .latency_ms
        .map(|ms| format!(", {ms} ms"))
        .unwrap_or_default();
    CheckResult::pass(
        "Cache Pool",
        format!(
            "{backend} reachable ({}/{} connections in use{latency})",
            health.in_use, health.max_connections
        ),
    )
}

/// Read-only probe of the durable store
pub async fn check_durable(store: &dyn DurableStore) -> CheckResult {
    let probe = match SessionId::new(PROBE_SESSION) {
        Ok(id) => id,
        Err(e) => return CheckResult::fail("Durable Store", e.to_string()),
    };
    match store.message_count(&probe).await {
        Ok(_) => CheckResult::pass("Durable Store", "Readable"),
        Err(e) => CheckResult::fail("Durable Store", e.to_string())
            .with_hint("Check the data directory"),
    }
}
