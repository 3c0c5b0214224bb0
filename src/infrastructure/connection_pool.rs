//! Connection Pool
//!
//! Fixed-capacity pool of simulated database connection slots.
//! Acquisition waits at most a hard deadline; there is no queueing beyond it.

use crate::domain::ports::MetricsSink;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Connection pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum slots held at once
    pub capacity: usize,
    /// How long a caller may wait for a free slot
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            acquire_timeout: Duration::from_millis(50),
        }
    }
}

/// One held connection slot.
///
/// Returned to the pool exactly once, either through [`PoolSlot::release`]
/// or when dropped on any other exit path.
pub struct PoolSlot {
    permit: Option<OwnedSemaphorePermit>,
    in_use: Arc<AtomicUsize>,
    metrics: Arc<dyn MetricsSink>,
}

impl PoolSlot {
    /// Return the slot to the pool.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for PoolSlot {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            // Count goes down before the permit is freed so it never exceeds capacity.
            self.in_use.fetch_sub(1, Ordering::SeqCst);
            self.metrics.connection_released();
            drop(permit);
        }
    }
}

impl std::fmt::Debug for PoolSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolSlot")
            .field("held", &self.permit.is_some())
            .finish()
    }
}

/// Bounded pool of connection slots backed by a counting semaphore.
pub struct ResourcePool {
    config: PoolConfig,
    semaphore: Arc<Semaphore>,
    in_use: Arc<AtomicUsize>,
    metrics: Arc<dyn MetricsSink>,
}

impl ResourcePool {
    /// Create a new pool. Every acquire and release is mirrored to `metrics`.
    pub fn new(config: PoolConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.capacity)),
            in_use: Arc::new(AtomicUsize::new(0)),
            config,
            metrics,
        }
    }

    /// Acquire with the configured timeout.
    pub async fn acquire_default(&self) -> Result<PoolSlot, PoolError> {
        self.acquire(self.config.acquire_timeout).await
    }

    /// Reserve one slot, waiting at most `timeout`.
    ///
    /// A timeout leaves the pool untouched. A single failed attempt is
    /// final for the caller.
    pub async fn acquire(&self, timeout: Duration) -> Result<PoolSlot, PoolError> {
        let permit =
            match tokio::time::timeout(timeout, self.semaphore.clone().acquire_owned()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => return Err(PoolError::Closed),
                Err(_) => return Err(PoolError::Timeout(timeout)),
            };

        self.in_use.fetch_add(1, Ordering::SeqCst);
        self.metrics.connection_acquired();

        Ok(PoolSlot {
            permit: Some(permit),
            in_use: self.in_use.clone(),
            metrics: self.metrics.clone(),
        })
    }

    /// Stop handing out slots. Pending and future acquires fail with
    /// [`PoolError::Closed`]; held slots are still released normally.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Slots currently held.
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.config.capacity,
            in_use: self.in_use(),
            available: self.semaphore.available_permits(),
        }
    }
}

/// Pool statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    pub capacity: usize,
    /// Slots currently held
    pub in_use: usize,
    /// Slots free right now
    pub available: usize,
}

/// Pool errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("connection pool timeout after {0:?}")]
    Timeout(Duration),
    #[error("connection pool closed")]
    Closed,
}
