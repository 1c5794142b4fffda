//! In-process backend built on `DashMap`
//!
//! Every single-key operation runs while holding the key's shard lock, so
//! appends, trims and reads on one key are atomic. The backend also offers
//! fault injection (latency, outages) used by tests and `turncache doctor`.

use super::{CacheBackend, ListTrim, resolve_range};
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
enum Value {
    List(VecDeque<String>),
    Text(String),
}

/// In-memory key-value backend
#[derive(Debug)]
pub struct MemoryBackend {
    data: DashMap<String, Value>,
    available: AtomicBool,
    closed: AtomicBool,
    latency: Mutex<Option<Duration>>,
    per_key_atomic: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            available: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            latency: Mutex::new(None),
            per_key_atomic: true,
        }
    }

    /// A backend whose append reports the length in a separate step.
    ///
    /// Concurrent appends may observe each other's lengths, like a store
    /// without server-side atomic counters. Callers must serialize per session.
    pub fn without_key_serialization() -> Self {
        Self {
            per_key_atomic: false,
            ..Self::new()
        }
    }

    /// Delay every operation by `latency`
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock() = Some(latency);
        self
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Simulate an outage: while unavailable every call fails
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of keys currently stored
    pub fn key_count(&self) -> usize {
        self.data.len()
    }

    async fn enter(&self, op: &str) -> CacheResult<()> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::storage_unavailable_with_context(
                "backend closed",
                op.to_string(),
            ));
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(CacheError::storage_unavailable_with_context(
                "backend unreachable",
                op.to_string(),
            ));
        }
        Ok(())
    }

    fn wrong_type(key: &str) -> CacheError {
        CacheError::invalid_argument(
            "key",
            format!("operation against a key holding the wrong kind of value: {key}"),
        )
    }

    fn list_len(&self, key: &str) -> CacheResult<usize> {
        match self.data.get(key).as_deref() {
            None => Ok(0),
            Some(Value::List(list)) => Ok(list.len()),
            Some(Value::Text(_)) => Err(Self::wrong_type(key)),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn serializes_per_key(&self) -> bool {
        self.per_key_atomic
    }

    async fn ping(&self) -> CacheResult<()> {
        self.enter("ping").await
    }

    async fn rpush(&self, key: &str, value: String) -> CacheResult<usize> {
        self.enter("rpush").await?;

        let len = {
            let mut entry = self
                .data
                .entry(key.to_string())
                .or_insert_with(|| Value::List(VecDeque::new()));
            match entry.value_mut() {
                Value::List(list) => {
                    list.push_back(value);
                    list.len()
                }
                Value::Text(_) => return Err(Self::wrong_type(key)),
            }
        };

        if self.per_key_atomic {
            return Ok(len);
        }

        // Length is read back separately and may include concurrent appends.
        tokio::task::yield_now().await;
        self.list_len(key)
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> CacheResult<Vec<String>> {
        self.enter("lrange").await?;

        match self.data.get(key).as_deref() {
            None => Ok(Vec::new()),
            Some(Value::List(list)) => Ok(resolve_range(list.len(), start, stop)
                .map(|(from, to)| list.range(from..to).cloned().collect())
                .unwrap_or_default()),
            Some(Value::Text(_)) => Err(Self::wrong_type(key)),
        }
    }

    async fn llen(&self, key: &str) -> CacheResult<usize> {
        self.enter("llen").await?;
        self.list_len(key)
    }

    async fn trim_keep_last(&self, key: &str, keep_last: usize) -> CacheResult<ListTrim> {
        self.enter("ltrim").await?;

        let Some(mut entry) = self.data.get_mut(key) else {
            return Ok(ListTrim {
                removed: 0,
                remaining: 0,
            });
        };

        match entry.value_mut() {
            Value::List(list) => {
                let removed = list.len().saturating_sub(keep_last);
                list.drain(..removed);
                debug!(key, removed, remaining = list.len(), "List trimmed");
                Ok(ListTrim {
                    removed,
                    remaining: list.len(),
                })
            }
            Value::Text(_) => Err(Self::wrong_type(key)),
        }
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.enter("get").await?;

        match self.data.get(key).as_deref() {
            None => Ok(None),
            Some(Value::Text(text)) => Ok(Some(text.clone())),
            Some(Value::List(_)) => Err(Self::wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: String) -> CacheResult<()> {
        self.enter("set").await?;
        self.data.insert(key.to_string(), Value::Text(value));
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> CacheResult<usize> {
        self.enter("del").await?;
        Ok(keys
            .iter()
            .filter(|key| self.data.remove(key.as_str()).is_some())
            .count())
    }

    async fn exists(&self, keys: &[String]) -> CacheResult<usize> {
        self.enter("exists").await?;
        Ok(keys
            .iter()
            .filter(|key| self.data.contains_key(key.as_str()))
            .count())
    }

    async fn close(&self) -> CacheResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
