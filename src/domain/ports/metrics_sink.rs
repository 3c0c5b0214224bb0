//! Metrics Sink Port
//!
//! Defines the interface for recording simulation metrics.

use crate::domain::value_objects::{ErrorCause, Operation, StatusClass, Tenant};
use std::time::Duration;

/// Sink for counters, histograms and the connection gauge.
///
/// This is an outbound port. The request processor and the resource pool
/// report through it without knowing how the values are exposed.
pub trait MetricsSink: Send + Sync {
    /// Count one finished request and observe its latency.
    ///
    /// Feeds `requests_total` and `latency_seconds`, both keyed by
    /// (operation, status, tenant).
    fn record_request(
        &self,
        operation: Operation,
        status: StatusClass,
        tenant: Tenant,
        latency: Duration,
    );

    /// Count one failed request under `errors_total{cause, tenant, operation}`.
    fn record_error(&self, cause: ErrorCause, tenant: Tenant, operation: Operation);

    /// A connection slot was handed out.
    fn connection_acquired(&self);

    /// A connection slot was returned.
    fn connection_released(&self);

    /// Time spent in the injected delay plus the pool wait, on success only.
    fn record_connection_latency(&self, tenant: Tenant, latency: Duration);
}
