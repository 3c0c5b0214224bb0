//! Request Processor - Main application use case
//!
//! Orchestrates one simulated request: injected connection delay, pool
//! acquisition, simulated work, random fault injection, and metric reporting.
//! This is the only thing the inbound adapters call.

use crate::domain::entities::RequestOutcome;
use crate::domain::errors::SimulationError;
use crate::domain::ports::MetricsSink;
use crate::domain::services::SpikeScheduler;
use crate::domain::value_objects::{Operation, StatusClass, Tenant};
use crate::infrastructure::connection_pool::{PoolError, PoolSlot, ResourcePool};
use rand::Rng;
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Request processor configuration.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Simulated processing time band, in milliseconds
    pub processing_time_ms: Range<u64>,
    /// Probability of an injected internal error once a slot is held
    pub error_rate: f64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            processing_time_ms: 0..50,
            error_rate: 0.05,
        }
    }
}

/// Request processor - main application use case.
///
/// Every call to [`RequestProcessor::process`] reports exactly one request
/// count and one latency observation, plus one error count on failure.
pub struct RequestProcessor {
    scheduler: Arc<SpikeScheduler>,
    pool: Arc<ResourcePool>,
    metrics: Arc<dyn MetricsSink>,
    config: ProcessorConfig,
}

impl RequestProcessor {
    pub fn new(
        scheduler: Arc<SpikeScheduler>,
        pool: Arc<ResourcePool>,
        metrics: Arc<dyn MetricsSink>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            scheduler,
            pool,
            metrics,
            config,
        }
    }

    pub fn scheduler(&self) -> &Arc<SpikeScheduler> {
        &self.scheduler
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    /// Run one simulated request end to end.
    ///
    /// Failures never escape: they become part of the returned outcome.
    pub async fn process(&self, operation: Operation, tenant: Tenant) -> RequestOutcome {
        let start = Instant::now();

        let result = self.handle(tenant, start).await;
        let latency = start.elapsed();

        let (status, cause) = match &result {
            Ok(()) => (StatusClass::Ok, None),
            Err(e) => {
                tracing::debug!(
                    "request {} for {} failed after {:?}: {}",
                    operation,
                    tenant,
                    latency,
                    e
                );
                self.metrics.record_error(e.cause(), tenant, operation);
                (e.status(), Some(e.cause()))
            }
        };

        self.metrics
            .record_request(operation, status, tenant, latency);

        RequestOutcome {
            operation,
            tenant,
            status,
            latency,
            cause,
        }
    }

    async fn handle(&self, tenant: Tenant, start: Instant) -> Result<(), SimulationError> {
        let slot = self.acquire_connection(tenant, start).await?;

        let work = sample_ms(&self.config.processing_time_ms);
        tokio::time::sleep(work).await;

        let fault = rand::thread_rng().gen_bool(fault_probability(self.config.error_rate));
        slot.release();

        if fault {
            Err(SimulationError::InternalFault)
        } else {
            Ok(())
        }
    }

    /// Pay the injected connection delay, then wait for a slot.
    ///
    /// The pool's own deadline starts after the delay, so a spiking tenant pays
    /// both costs back to back.
    async fn acquire_connection(
        &self,
        tenant: Tenant,
        start: Instant,
    ) -> Result<PoolSlot, SimulationError> {
        let delay = self.scheduler.delay(tenant);
        tokio::time::sleep(delay).await;

        match self.pool.acquire_default().await {
            Ok(slot) => {
                self.metrics
                    .record_connection_latency(tenant, start.elapsed());
                Ok(slot)
            }
            Err(PoolError::Timeout(waited)) => Err(SimulationError::PoolTimeout(waited)),
            Err(PoolError::Closed) => Err(SimulationError::PoolTimeout(Duration::ZERO)),
        }
    }
}

/// Non-finite rates never fire.
fn fault_probability(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn sample_ms(band: &Range<u64>) -> Duration {
    if band.is_empty() {
        return Duration::from_millis(band.start);
    }
    Duration::from_millis(rand::thread_rng().gen_range(band.clone()))
}
