//! Domain Entities - Core simulation objects
//!
//! These entities have no external dependencies beyond serde.

use crate::domain::value_objects::{ErrorCause, Operation, StatusClass, Tenant};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Result of one simulated request.
///
/// Produced once per call to the request processor and consumed
/// immediately by the metrics sink and the inbound adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestOutcome {
    pub operation: Operation,
    pub tenant: Tenant,
    pub status: StatusClass,
    /// Wall-clock time from the injected delay through the final decision
    pub latency: Duration,
    /// Set on failure branches only
    pub cause: Option<ErrorCause>,
}

impl RequestOutcome {
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    pub fn latency_seconds(&self) -> f64 {
        self.latency.as_secs_f64()
    }
}

/// Shared spike-window state.
///
/// `started_at == None` is the zero value: no window has ever been armed,
/// so the first evaluation always arms one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpikeWindow {
    /// When the current selection interval began
    pub started_at: Option<Instant>,
    /// Tenant currently spiking, if any
    pub tenant: Option<Tenant>,
}

impl SpikeWindow {
    /// Time elapsed since the window was armed, or `None` if never armed.
    pub fn elapsed_at(&self, now: Instant) -> Option<Duration> {
        self.started_at.map(|s| now.saturating_duration_since(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_failure_follows_status() {
        let mut outcome = RequestOutcome {
            operation: Operation::Read,
            tenant: Tenant::Alpha,
            status: StatusClass::Ok,
            latency: Duration::from_millis(250),
            cause: None,
        };
        assert!(!outcome.is_failure());
        assert!((outcome.latency_seconds() - 0.25).abs() < f64::EPSILON);

        outcome.status = StatusClass::Unavailable;
        outcome.cause = Some(ErrorCause::DbConnectionTimeout);
        assert!(outcome.is_failure());
    }

    #[test]
    fn test_spike_window_default_is_unarmed() {
        let window = SpikeWindow::default();
        assert!(window.started_at.is_none());
        assert!(window.tenant.is_none());
        assert!(window.elapsed_at(Instant::now()).is_none());
    }

    #[test]
    fn test_spike_window_elapsed_saturates() {
        let now = Instant::now();
        let window = SpikeWindow {
            started_at: Some(now + Duration::from_secs(5)),
            tenant: Some(Tenant::Beta),
        };
        assert_eq!(window.elapsed_at(now), Some(Duration::ZERO));
        assert_eq!(
            window.elapsed_at(now + Duration::from_secs(8)),
            Some(Duration::from_secs(3))
        );
    }
}
