//! Request Transport Port
//!
//! The boundary the load generator drives traffic through.

use crate::domain::value_objects::StatusClass;
use async_trait::async_trait;
use thiserror::Error;

/// Failure to deliver a request or read its response.
///
/// Only ever logged by the load generator; never counted as a metric.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status: {0}")]
    UnexpectedStatus(u16),
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Delivers one simulated request carrying an operation and a tenant name.
///
/// Implementations must treat missing or unrecognized names as `unknown`
/// rather than failing.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    async fn send(&self, operation: &str, tenant: &str) -> Result<StatusClass, TransportError>;
}
