//! Infrastructure Layer
//!
//! Concurrency primitives and background control loops.

pub mod connection_pool;
pub mod load_generator;
pub mod shutdown;

pub use connection_pool::{PoolConfig, PoolError, PoolSlot, PoolStats, ResourcePool};
pub use load_generator::{EpochReport, LoadGenerator, LoadGeneratorConfig, RateFn};
pub use shutdown::{shutdown_signal, InFlightGuard, ShutdownController};
