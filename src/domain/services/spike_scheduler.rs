//! Spike Scheduler
//!
//! Decides how long a tenant waits before it may even try to get a
//! connection. Every so often one tenant is picked to suffer a latency
//! spike for a short duration; everyone else pays a small baseline cost.

use crate::domain::entities::SpikeWindow;
use crate::domain::value_objects::Tenant;
use parking_lot::Mutex;
use rand::Rng;
use std::ops::Range;
use std::time::{Duration, Instant};

/// Spike scheduler configuration.
#[derive(Debug, Clone)]
pub struct SpikeConfig {
    /// Minimum time between two spike selections
    pub selection_interval: Duration,
    /// How long the selected tenant keeps spiking
    pub spike_duration: Duration,
    /// Delay band for the spiking tenant, in milliseconds
    pub spike_delay_ms: Range<u64>,
    /// Baseline connection-setup delay for everyone else, in milliseconds
    pub base_delay_ms: Range<u64>,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            selection_interval: Duration::from_secs(300),
            spike_duration: Duration::from_secs(30),
            spike_delay_ms: 1500..2000,
            base_delay_ms: 0..50,
        }
    }
}

/// Lock-guarded spike state machine.
///
/// Shared by `Arc` for the lifetime of the process. The lock is only held
/// while the window is checked and updated, never across a sleep.
pub struct SpikeScheduler {
    config: SpikeConfig,
    window: Mutex<SpikeWindow>,
}

impl SpikeScheduler {
    pub fn new(config: SpikeConfig) -> Self {
        Self {
            config,
            window: Mutex::new(SpikeWindow::default()),
        }
    }

    /// Delay for `tenant` evaluated at the current instant.
    pub fn delay(&self, tenant: Tenant) -> Duration {
        self.delay_for(tenant, Instant::now())
    }

    /// Delay for `tenant` evaluated at `now`.
    ///
    /// Re-arming and expiry are checked independently on every call, in that
    /// order, so an expired spike is not reselected until a full interval
    /// has passed since the last selection.
    pub fn delay_for(&self, tenant: Tenant, now: Instant) -> Duration {
        let spiking = self.evaluate(tenant, now);
        let band = if spiking {
            &self.config.spike_delay_ms
        } else {
            &self.config.base_delay_ms
        };
        Duration::from_millis(sample(band))
    }

    /// Apply the window transitions for `now` and report whether `tenant`
    /// is inside an active spike.
    fn evaluate(&self, tenant: Tenant, now: Instant) -> bool {
        let mut window = self.window.lock();

        let due = window
            .elapsed_at(now)
            .map_or(true, |elapsed| elapsed > self.config.selection_interval);
        if due {
            let selected = Tenant::random(&mut rand::thread_rng());
            window.started_at = Some(now);
            window.tenant = Some(selected);
            tracing::info!(
                "spike window armed: tenant={} duration={:?}",
                selected,
                self.config.spike_duration
            );
        }

        let elapsed = window.elapsed_at(now).unwrap_or_default();
        if elapsed > self.config.spike_duration {
            if let Some(expired) = window.tenant.take() {
                tracing::info!("spike for tenant {} expired", expired);
            }
        }

        elapsed < self.config.spike_duration && window.tenant == Some(tenant)
    }

    /// Copy of the current window state.
    pub fn snapshot(&self) -> SpikeWindow {
        *self.window.lock()
    }

    /// Tenant currently spiking, if any.
    pub fn spike_tenant(&self) -> Option<Tenant> {
        self.window.lock().tenant
    }
}

impl Default for SpikeScheduler {
    fn default() -> Self {
        Self::new(SpikeConfig::default())
    }
}

fn sample(band: &Range<u64>) -> u64 {
    if band.is_empty() {
        return band.start;
    }
    rand::thread_rng().gen_range(band.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ms(d: Duration) -> u128 {
        d.as_millis()
    }

    fn other_than(tenant: Tenant) -> Vec<Tenant> {
        Tenant::CATALOG
            .iter()
            .copied()
            .filter(|t| *t != tenant)
            .collect()
    }

    #[test]
    fn test_spike_config_default() {
        let config = SpikeConfig::default();
        assert_eq!(config.selection_interval, Duration::from_secs(300));
        assert_eq!(config.spike_duration, Duration::from_secs(30));
        assert_eq!(config.spike_delay_ms, 1500..2000);
        assert_eq!(config.base_delay_ms, 0..50);
    }

    #[test]
    fn test_first_call_arms_window() {
        let scheduler = SpikeScheduler::default();
        assert_eq!(scheduler.snapshot(), SpikeWindow::default());

        let t0 = Instant::now();
        scheduler.delay_for(Tenant::Alpha, t0);

        let window = scheduler.snapshot();
        assert_eq!(window.started_at, Some(t0));
        let tenant = window.tenant.unwrap();
        assert!(Tenant::CATALOG.contains(&tenant));
    }

    #[test]
    fn test_spiking_tenant_gets_high_band() {
        let scheduler = SpikeScheduler::default();
        let t0 = Instant::now();
        scheduler.delay_for(Tenant::Alpha, t0);
        let spiking = scheduler.spike_tenant().unwrap();

        for offset in [0, 1, 10, 29] {
            let delay = scheduler.delay_for(spiking, t0 + Duration::from_secs(offset));
            assert!(
                (1500..2000).contains(&ms(delay)),
                "offset {}s gave {:?}",
                offset,
                delay
            );
        }
    }

    #[test]
    fn test_other_tenants_get_base_band() {
        let scheduler = SpikeScheduler::default();
        let t0 = Instant::now();
        scheduler.delay_for(Tenant::Alpha, t0);
        let spiking = scheduler.spike_tenant().unwrap();

        for tenant in other_than(spiking) {
            let delay = scheduler.delay_for(tenant, t0 + Duration::from_secs(5));
            assert!(ms(delay) < 50, "{} got {:?}", tenant, delay);
        }
        let delay = scheduler.delay_for(Tenant::Unknown, t0 + Duration::from_secs(5));
        assert!(ms(delay) < 50);
    }

    #[test]
    fn test_spike_expires_after_duration() {
        let scheduler = SpikeScheduler::default();
        let t0 = Instant::now();
        scheduler.delay_for(Tenant::Alpha, t0);
        let spiking = scheduler.spike_tenant().unwrap();

        let delay = scheduler.delay_for(spiking, t0 + Duration::from_secs(31));
        assert!(ms(delay) < 50);
        assert!(scheduler.spike_tenant().is_none());
        // Timer is not re-armed by expiry
        assert_eq!(scheduler.snapshot().started_at, Some(t0));
    }

    #[test]
    fn test_no_reselection_before_interval() {
        let scheduler = SpikeScheduler::default();
        let t0 = Instant::now();
        scheduler.delay_for(Tenant::Alpha, t0);
        scheduler.delay_for(Tenant::Alpha, t0 + Duration::from_secs(31));

        for secs in [60, 120, 299, 300] {
            for tenant in Tenant::CATALOG {
                let delay = scheduler.delay_for(tenant, t0 + Duration::from_secs(secs));
                assert!(ms(delay) < 50, "{} at {}s got {:?}", tenant, secs, delay);
            }
            assert!(scheduler.spike_tenant().is_none());
            assert_eq!(scheduler.snapshot().started_at, Some(t0));
        }
    }

    #[test]
    fn test_rearms_after_interval() {
        let scheduler = SpikeScheduler::default();
        let t0 = Instant::now();
        scheduler.delay_for(Tenant::Alpha, t0);
        scheduler.delay_for(Tenant::Alpha, t0 + Duration::from_secs(31));
        assert!(scheduler.spike_tenant().is_none());

        let t1 = t0 + Duration::from_secs(301);
        scheduler.delay_for(Tenant::Beta, t1);
        let window = scheduler.snapshot();
        assert_eq!(window.started_at, Some(t1));
        let spiking = window.tenant.unwrap();

        let delay = scheduler.delay_for(spiking, t1 + Duration::from_secs(1));
        assert!((1500..2000).contains(&ms(delay)));
    }

    #[test]
    fn test_exact_duration_boundary_is_not_spiking() {
        let scheduler = SpikeScheduler::default();
        let t0 = Instant::now();
        scheduler.delay_for(Tenant::Alpha, t0);
        let spiking = scheduler.spike_tenant().unwrap();

        let delay = scheduler.delay_for(spiking, t0 + Duration::from_secs(30));
        assert!(ms(delay) < 50);
    }

    #[test]
    fn test_custom_bands() {
        let scheduler = SpikeScheduler::new(SpikeConfig {
            spike_delay_ms: 100..101,
            base_delay_ms: 7..8,
            ..Default::default()
        });
        let t0 = Instant::now();
        scheduler.delay_for(Tenant::Alpha, t0);
        let spiking = scheduler.spike_tenant().unwrap();

        assert_eq!(scheduler.delay_for(spiking, t0), Duration::from_millis(100));
        for tenant in other_than(spiking) {
            assert_eq!(scheduler.delay_for(tenant, t0), Duration::from_millis(7));
        }
    }

    #[test]
    fn test_empty_band_returns_start() {
        assert_eq!(sample(&(0..0)), 0);
        assert_eq!(sample(&(20..10)), 20);
    }

    #[test]
    fn test_concurrent_callers_see_single_spike_tenant() {
        use std::thread;

        let scheduler = Arc::new(SpikeScheduler::new(SpikeConfig {
            spike_delay_ms: 1000..1001,
            base_delay_ms: 0..1,
            ..Default::default()
        }));
        let t0 = Instant::now();
        let mut handles = vec![];

        for i in 0..8 {
            let s = scheduler.clone();
            handles.push(thread::spawn(move || {
                let mut spiked = vec![];
                for j in 0..500 {
                    let tenant = Tenant::CATALOG[(i + j) % Tenant::CATALOG.len()];
                    if s.delay_for(tenant, t0 + Duration::from_millis(j as u64)) >= Duration::from_secs(1) {
                        spiked.push(tenant);
                    }
                }
                spiked
            }));
        }

        let mut spiked: Vec<Tenant> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        spiked.sort();
        spiked.dedup();

        assert_eq!(spiked.len(), 1);
        assert_eq!(Some(spiked[0]), scheduler.spike_tenant());
    }
}
