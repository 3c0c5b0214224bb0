//! loadsim Library
//!
//! A self-driving synthetic workload: a simulated service with a bounded
//! connection pool and per-tenant latency spikes, plus the load generator
//! that keeps it busy. Exposed as a library for integration tests.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use adapters::inbound::{ApiServer, ApiState};
pub use adapters::outbound::{HttpTransport, InProcessTransport, PrometheusMetricsSink};
pub use application::{ProcessorConfig, RequestProcessor};
pub use config::{load_config, ClientTransport, Config};
pub use domain::entities::RequestOutcome;
pub use domain::ports::{MetricsSink, RequestTransport, TransportError};
pub use domain::services::{SpikeConfig, SpikeScheduler};
pub use domain::value_objects::{ErrorCause, Operation, StatusClass, Tenant};
pub use infrastructure::{
    LoadGenerator, LoadGeneratorConfig, PoolConfig, ResourcePool, ShutdownController,
};
