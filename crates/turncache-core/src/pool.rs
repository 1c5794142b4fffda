//! Shared connection pool around a [`CacheBackend`]
//!
//! The pool is created once at startup and shared by every session. Each
//! operation borrows a permit, runs under the configured timeout and
//! releases the permit on every exit path, including cancellation.

use crate::backend::CacheBackend;
use crate::config::CacheSettings;
use crate::error::{CacheError, CacheResult};
use parking_lot::RwLock;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Health report for the pool and its backend
#[derive(Debug, Clone, Serialize)]
pub struct PoolHealth {
    pub initialized: bool,
    pub reachable: bool,
    pub backend: Option<String>,
    pub max_connections: usize,
    pub in_use: usize,
    pub latency_ms: Option<u128>,
    pub error: Option<String>,
}

/// Decrements the in-flight counter when an operation ends
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct CachePool {
    backend: RwLock<Option<Arc<dyn CacheBackend>>>,
    permits: Semaphore,
    max_connections: usize,
    acquire_timeout: Duration,
    operation_timeout: Duration,
    in_flight: AtomicUsize,
}

impl CachePool {
    /// Create an unconnected pool; every operation fails with
    /// `NotInitialized` until [`CachePool::attach`] succeeds.
    pub fn new(settings: &CacheSettings) -> Self {
        let max_connections = settings.pool.max_connections as usize;
        Self {
            backend: RwLock::new(None),
            permits: Semaphore::new(max_connections),
            max_connections,
            acquire_timeout: settings.pool.acquire_timeout,
            operation_timeout: settings.operation_timeout,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Create a pool and connect it to `backend`
    pub async fn connect(
        settings: &CacheSettings,
        backend: Arc<dyn CacheBackend>,
    ) -> CacheResult<Arc<Self>> {
        let pool = Arc::new(Self::new(settings));
        pool.attach(backend).await?;
        Ok(pool)
    }

    /// Verify the backend answers a ping, then make it the pool's backend
    #[instrument(skip(self, backend), fields(backend = backend.name()))]
    pub async fn attach(&self, backend: Arc<dyn CacheBackend>) -> CacheResult<()> {
        match timeout(self.operation_timeout, backend.ping()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(CacheError::storage_unavailable_with_context(
                    "timed out connecting to cache backend",
                    backend.name().to_string(),
                ));
            }
        }

        info!(
            backend = backend.name(),
            max_connections = self.max_connections,
            "Cache pool connected"
        );
        *self.backend.write() = Some(backend);
        Ok(())
    }

    /// Detach and close the backend. Later operations fail with `NotInitialized`.
    pub async fn close(&self) {
        let backend = self.backend.write().take();
        if let Some(backend) = backend {
            if let Err(e) = backend.close().await {
                warn!(error = %e, "Error closing cache backend");
            }
            info!(backend = backend.name(), "Cache pool closed");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.read().is_some()
    }

    /// Whether callers must serialize per-session append sequences themselves
    pub fn serializes_per_key(&self) -> bool {
        self.backend
            .read()
            .as_ref()
            .map(|b| b.serializes_per_key())
            .unwrap_or(true)
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    pub fn in_use(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn current_backend(&self) -> CacheResult<Arc<dyn CacheBackend>> {
        self.backend
            .read()
            .clone()
            .ok_or_else(|| CacheError::not_initialized("cache pool"))
    }

    /// Borrow a connection and run `f` under the operation timeout.
    ///
    /// Acquire and operation timeouts surface as `StorageUnavailable`.
    pub async fn run<T, F, Fut>(&self, op: &'static str, f: F) -> CacheResult<T>
    where
        F: FnOnce(Arc<dyn CacheBackend>) -> Fut,
        Fut: Future<Output = CacheResult<T>>,
    {
        let backend = self.current_backend()?;

        let _permit = match timeout(self.acquire_timeout, self.permits.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(CacheError::not_initialized("cache pool")),
            Err(_) => {
                warn!(op, waited = ?self.acquire_timeout, "Timed out waiting for a cache connection");
                return Err(CacheError::storage_unavailable_with_context(
                    "connection pool exhausted",
                    op,
                ));
            }
        };
        let _in_flight = InFlight::enter(&self.in_flight);

        match timeout(self.operation_timeout, f(backend)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, timeout = ?self.operation_timeout, "Cache operation timed out");
                Err(CacheError::storage_unavailable_with_context(
                    format!("operation timed out after {:?}", self.operation_timeout),
                    op,
                ))
            }
        }
    }

    /// Ping the backend and report pool state. Never fails.
    pub async fn health(&self) -> PoolHealth {
        let backend = self.backend.read().as_ref().map(|b| b.name().to_string());
        let initialized = backend.is_some();

        let started = Instant::now();
        let result = self.run("ping", |b| async move { b.ping().await }).await;
        let latency_ms = started.elapsed().as_millis();

        let (reachable, error) = match result {
            Ok(()) => (true, None),
            Err(e) => {
                debug!(error = %e, "Cache health check failed");
                (false, Some(e.to_string()))
            }
        };

        PoolHealth {
            initialized,
            reachable,
            backend,
            max_connections: self.max_connections,
            in_use: self.in_use(),
            latency_ms: reachable.then_some(latency_ms),
            error,
        }
    }
}

impl std::fmt::Debug for CachePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachePool")
            .field("initialized", &self.is_initialized())
            .field("max_connections", &self.max_connections)
            .field("in_use", &self.in_use())
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}
