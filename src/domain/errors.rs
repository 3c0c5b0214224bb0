//! Simulated service failures.
//!
//! Every variant is terminal for the single request that raised it and is
//! absorbed by the request processor.

use crate::domain::value_objects::{ErrorCause, StatusClass};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// No connection slot became free before the deadline. Never retried.
    #[error("database connection timeout after {0:?}")]
    PoolTimeout(Duration),
    /// Randomly injected after a successful acquisition.
    #[error("simulated internal server error")]
    InternalFault,
}

impl SimulationError {
    pub fn cause(&self) -> ErrorCause {
        match self {
            Self::PoolTimeout(_) => ErrorCause::DbConnectionTimeout,
            Self::InternalFault => ErrorCause::InternalServerError,
        }
    }

    pub fn status(&self) -> StatusClass {
        match self {
            Self::PoolTimeout(_) => StatusClass::Unavailable,
            Self::InternalFault => StatusClass::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_mapping() {
        let err = SimulationError::PoolTimeout(Duration::from_millis(50));
        assert_eq!(err.cause(), ErrorCause::DbConnectionTimeout);
        assert_eq!(err.status(), StatusClass::Unavailable);
        assert_eq!(err.to_string(), "database connection timeout after 50ms");
    }

    #[test]
    fn test_internal_fault_mapping() {
        let err = SimulationError::InternalFault;
        assert_eq!(err.cause(), ErrorCause::InternalServerError);
        assert_eq!(err.status(), StatusClass::InternalError);
    }
}
