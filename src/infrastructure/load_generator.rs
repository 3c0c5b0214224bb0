//! Load Generator
//!
//! Self-driving client that keeps the simulated service busy. Time is cut
//! into one-second epochs; each epoch fires R evenly spaced requests, waits
//! for all of them, then recomputes R.

use crate::domain::ports::RequestTransport;
use crate::domain::value_objects::{Operation, Tenant};
use crate::infrastructure::shutdown::ShutdownController;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Target requests per epoch, asked once at the start of every epoch.
pub type RateFn = Arc<dyn Fn() -> u32 + Send + Sync>;

/// Load generator configuration.
#[derive(Debug, Clone)]
pub struct LoadGeneratorConfig {
    /// Length of one epoch
    pub epoch: Duration,
}

impl Default for LoadGeneratorConfig {
    fn default() -> Self {
        Self {
            epoch: Duration::from_secs(1),
        }
    }
}

/// Summary of one finished epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EpochReport {
    /// Requests the rate function asked for
    pub target: u32,
    /// Units actually spawned before scheduling stopped
    pub launched: u32,
    /// Units whose request got a response
    pub delivered: u32,
    /// Units that hit a transport failure or panicked
    pub failed: u32,
}

enum UnitResult {
    Delivered,
    Failed,
}

/// Drives traffic through a [`RequestTransport`] at a target rate.
pub struct LoadGenerator {
    transport: Arc<dyn RequestTransport>,
    rate: RateFn,
    config: LoadGeneratorConfig,
}

impl LoadGenerator {
    pub fn new(transport: Arc<dyn RequestTransport>, rate: RateFn, config: LoadGeneratorConfig) -> Self {
        Self {
            transport,
            rate,
            config,
        }
    }

    /// Generator with a fixed requests-per-epoch target.
    pub fn with_constant_rate(transport: Arc<dyn RequestTransport>, rps: u32) -> Self {
        Self::new(transport, Arc::new(move || rps), LoadGeneratorConfig::default())
    }

    /// Run epochs back to back until shutdown.
    ///
    /// Shutdown stops scheduling inside the current epoch; requests already
    /// launched are still awaited before this returns.
    pub async fn run(&self, shutdown: ShutdownController) {
        tracing::info!("load generator started (epoch={:?})", self.config.epoch);

        while !shutdown.is_shutdown() {
            let rate = (self.rate)();
            let report = self.run_epoch(rate, shutdown.child_token()).await;
            tracing::debug!(
                "epoch finished: target={} launched={} delivered={} failed={}",
                report.target,
                report.launched,
                report.delivered,
                report.failed
            );
        }

        tracing::info!("load generator stopped");
    }

    /// Run a single epoch at `rate` requests, scoped by `cancel`.
    ///
    /// `cancel` only stops new ticks. Every launched unit is joined before
    /// the scope is torn down.
    pub async fn run_epoch(&self, rate: u32, cancel: CancellationToken) -> EpochReport {
        let mut report = EpochReport {
            target: rate,
            ..Default::default()
        };

        if rate == 0 {
            tokio::select! {
                _ = tokio::time::sleep(self.config.epoch) => {}
                _ = cancel.cancelled() => {}
            }
            cancel.cancel();
            return report;
        }

        let period = self.config.epoch / rate;
        let period = period.max(Duration::from_nanos(1));
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        let mut units: JoinSet<UnitResult> = JoinSet::new();

        for _ in 0..rate {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("epoch cancelled after {} of {} ticks", report.launched, rate);
                    break;
                }
                _ = ticker.tick() => {
                    let transport = self.transport.clone();
                    units.spawn(send_one(transport));
                    report.launched += 1;
                }
            }
        }

        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(UnitResult::Delivered) => report.delivered += 1,
                Ok(UnitResult::Failed) => report.failed += 1,
                Err(e) => {
                    tracing::error!("request unit panicked: {}", e);
                    report.failed += 1;
                }
            }
        }

        cancel.cancel();
        report
    }
}

/// One request unit: pick a tenant and an operation, send, drain.
async fn send_one(transport: Arc<dyn RequestTransport>) -> UnitResult {
    let (tenant, operation) = {
        let mut rng = rand::thread_rng();
        (Tenant::random(&mut rng), Operation::random(&mut rng))
    };

    let start = Instant::now();
    match transport.send(operation.as_str(), tenant.as_str()).await {
        Ok(status) => {
            tracing::trace!(
                "{} {} -> {} in {:?}",
                tenant,
                operation,
                status,
                start.elapsed()
            );
            UnitResult::Delivered
        }
        Err(e) => {
            tracing::warn!("error making request: {}", e);
            UnitResult::Failed
        }
    }
}
