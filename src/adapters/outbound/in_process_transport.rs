//! In-Process Transport
//!
//! Hands requests straight to the request processor, skipping HTTP.

use crate::application::RequestProcessor;
use crate::domain::ports::{RequestTransport, TransportError};
use crate::domain::value_objects::{Operation, StatusClass, Tenant};
use async_trait::async_trait;
use std::sync::Arc;

pub struct InProcessTransport {
    processor: Arc<RequestProcessor>,
}

impl InProcessTransport {
    pub fn new(processor: Arc<RequestProcessor>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl RequestTransport for InProcessTransport {
    async fn send(&self, operation: &str, tenant: &str) -> Result<StatusClass, TransportError> {
        let outcome = self
            .processor
            .process(Operation::parse(operation), Tenant::parse(tenant))
            .await;
        Ok(outcome.status)
    }
}
