//! Prometheus Metrics Sink
//!
//! Implements MetricsSink with Prometheus text exposition.

use crate::domain::ports::MetricsSink;
use crate::domain::value_objects::{ErrorCause, Operation, StatusClass, Tenant};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Prometheus client default buckets, in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Labels of `requests_total` and `latency_seconds`.
pub type RequestKey = (Operation, StatusClass, Tenant);

/// Labels of `errors_total`.
pub type ErrorKey = (ErrorCause, Tenant, Operation);

/// Fixed-bucket histogram.
#[derive(Debug)]
pub struct Histogram {
    bounds: &'static [f64],
    inner: Mutex<HistogramInner>,
}

#[derive(Debug)]
struct HistogramInner {
    /// Per-bucket counts, not cumulative
    counts: Vec<u64>,
    count: u64,
    sum: f64,
}

/// Point-in-time copy of a histogram with cumulative bucket counts.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    pub buckets: Vec<(f64, u64)>,
    pub count: u64,
    pub sum: f64,
}

impl Histogram {
    pub fn new(bounds: &'static [f64]) -> Self {
        Self {
            bounds,
            inner: Mutex::new(HistogramInner {
                counts: vec![0; bounds.len()],
                count: 0,
                sum: 0.0,
            }),
        }
    }

    pub fn observe(&self, value: f64) {
        let mut inner = self.inner.lock();
        if let Some(idx) = self.bounds.iter().position(|b| value <= *b) {
            inner.counts[idx] += 1;
        }
        inner.count += 1;
        inner.sum += value;
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        let inner = self.inner.lock();
        let mut cumulative = 0;
        let buckets = self
            .bounds
            .iter()
            .zip(inner.counts.iter())
            .map(|(bound, n)| {
                cumulative += n;
                (*bound, cumulative)
            })
            .collect();
        HistogramSnapshot {
            buckets,
            count: inner.count,
            sum: inner.sum,
        }
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new(&DEFAULT_BUCKETS)
    }
}

/// Prometheus-compatible metrics sink.
///
/// Series are created lazily on first use and live for the whole process.
pub struct PrometheusMetricsSink {
    namespace: String,
    requests: DashMap<RequestKey, AtomicU64>,
    latency: DashMap<RequestKey, Arc<Histogram>>,
    errors: DashMap<ErrorKey, AtomicU64>,
    db_connections: AtomicI64,
    connection_latency: DashMap<Tenant, Arc<Histogram>>,
}

impl PrometheusMetricsSink {
    /// Create a sink whose series are prefixed with `app_`.
    pub fn new() -> Self {
        Self::with_namespace("app")
    }

    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            requests: DashMap::new(),
            latency: DashMap::new(),
            errors: DashMap::new(),
            db_connections: AtomicI64::new(0),
            connection_latency: DashMap::new(),
        }
    }

    pub fn request_count(&self, operation: Operation, status: StatusClass, tenant: Tenant) -> u64 {
        self.requests
            .get(&(operation, status, tenant))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum of `requests_total` over every label set.
    pub fn total_requests(&self) -> u64 {
        self.requests
            .iter()
            .map(|e| e.value().load(Ordering::Relaxed))
            .sum()
    }

    pub fn error_count(&self, cause: ErrorCause, tenant: Tenant, operation: Operation) -> u64 {
        self.errors
            .get(&(cause, tenant, operation))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn total_errors(&self) -> u64 {
        self.errors
            .iter()
            .map(|e| e.value().load(Ordering::Relaxed))
            .sum()
    }

    pub fn latency_snapshot(&self, key: RequestKey) -> Option<HistogramSnapshot> {
        self.latency.get(&key).map(|h| h.snapshot())
    }

    /// Number of latency observations over every label set.
    pub fn total_latency_observations(&self) -> u64 {
        self.latency.iter().map(|e| e.value().snapshot().count).sum()
    }

    pub fn connection_latency_snapshot(&self, tenant: Tenant) -> Option<HistogramSnapshot> {
        self.connection_latency.get(&tenant).map(|h| h.snapshot())
    }

    /// Current value of the `db_connections` gauge.
    pub fn db_connections(&self) -> i64 {
        self.db_connections.load(Ordering::SeqCst)
    }

    fn histogram<K>(map: &DashMap<K, Arc<Histogram>>, key: K) -> Arc<Histogram>
    where
        K: std::hash::Hash + Eq,
    {
        map.entry(key).or_default().clone()
    }

    /// Export metrics in Prometheus text format.
    ///
    /// Series are sorted by label values so the output is stable.
    pub fn export_prometheus(&self) -> String {
        let ns = &self.namespace;
        let mut output = String::new();

        let mut requests: Vec<(RequestKey, u64)> = self
            .requests
            .iter()
            .map(|e| (*e.key(), e.value().load(Ordering::Relaxed)))
            .collect();
        requests.sort_by_key(|(k, _)| *k);

        let _ = writeln!(output, "# HELP {ns}_requests_total The total number of requests");
        let _ = writeln!(output, "# TYPE {ns}_requests_total counter");
        for ((operation, status, tenant), value) in &requests {
            let _ = writeln!(
                output,
                "{ns}_requests_total{{operation=\"{}\",status=\"{}\",tenant=\"{}\"}} {}",
                operation, status, tenant, value
            );
        }

        let mut latency: Vec<(RequestKey, HistogramSnapshot)> = self
            .latency
            .iter()
            .map(|e| (*e.key(), e.value().snapshot()))
            .collect();
        latency.sort_by_key(|(k, _)| *k);

        let _ = writeln!(output, "# HELP {ns}_latency_seconds The latency of requests");
        let _ = writeln!(output, "# TYPE {ns}_latency_seconds histogram");
        for ((operation, status, tenant), snapshot) in &latency {
            let labels = format!(
                "operation=\"{}\",status=\"{}\",tenant=\"{}\"",
                operation, status, tenant
            );
            write_histogram(&mut output, &format!("{ns}_latency_seconds"), &labels, snapshot);
        }

        let mut errors: Vec<(ErrorKey, u64)> = self
            .errors
            .iter()
            .map(|e| (*e.key(), e.value().load(Ordering::Relaxed)))
            .collect();
        errors.sort_by_key(|(k, _)| *k);

        let _ = writeln!(output, "# HELP {ns}_errors_total The total number of errors");
        let _ = writeln!(output, "# TYPE {ns}_errors_total counter");
        for ((cause, tenant, operation), value) in &errors {
            let _ = writeln!(
                output,
                "{ns}_errors_total{{cause=\"{}\",tenant=\"{}\",operation=\"{}\"}} {}",
                cause, tenant, operation, value
            );
        }

        let _ = writeln!(
            output,
            "# HELP {ns}_db_connections The number of active database connections"
        );
        let _ = writeln!(output, "# TYPE {ns}_db_connections gauge");
        let _ = writeln!(output, "{ns}_db_connections {}", self.db_connections());

        let mut connection_latency: Vec<(Tenant, HistogramSnapshot)> = self
            .connection_latency
            .iter()
            .map(|e| (*e.key(), e.value().snapshot()))
            .collect();
        connection_latency.sort_by_key(|(k, _)| *k);

        let _ = writeln!(
            output,
            "# HELP {ns}_db_connection_latency_seconds The latency of database connections"
        );
        let _ = writeln!(output, "# TYPE {ns}_db_connection_latency_seconds histogram");
        for (tenant, snapshot) in &connection_latency {
            write_histogram(
                &mut output,
                &format!("{ns}_db_connection_latency_seconds"),
                &format!("tenant=\"{}\"", tenant),
                snapshot,
            );
        }

        output
    }
}

fn write_histogram(output: &mut String, name: &str, labels: &str, snapshot: &HistogramSnapshot) {
    for (bound, cumulative) in &snapshot.buckets {
        let _ = writeln!(output, "{name}_bucket{{{labels},le=\"{}\"}} {}", bound, cumulative);
    }
    let _ = writeln!(output, "{name}_bucket{{{labels},le=\"+Inf\"}} {}", snapshot.count);
    let _ = writeln!(output, "{name}_sum{{{labels}}} {}", snapshot.sum);
    let _ = writeln!(output, "{name}_count{{{labels}}} {}", snapshot.count);
}

impl Default for PrometheusMetricsSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for PrometheusMetricsSink {
    fn record_request(
        &self,
        operation: Operation,
        status: StatusClass,
        tenant: Tenant,
        latency: Duration,
    ) {
        let key = (operation, status, tenant);
        self.requests
            .entry(key)
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
        Self::histogram(&self.latency, key).observe(latency.as_secs_f64());
    }

    fn record_error(&self, cause: ErrorCause, tenant: Tenant, operation: Operation) {
        self.errors
            .entry((cause, tenant, operation))
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }

    fn connection_acquired(&self) {
        self.db_connections.fetch_add(1, Ordering::SeqCst);
    }

    fn connection_released(&self) {
        self.db_connections.fetch_sub(1, Ordering::SeqCst);
    }

    fn record_connection_latency(&self, tenant: Tenant, latency: Duration) {
        Self::histogram(&self.connection_latency, tenant).observe(latency.as_secs_f64());
    }
}
