//! HTTP Transport
//!
//! Delivers simulated requests to the service over HTTP with reqwest.

use crate::adapters::inbound::{OPERATION_HEADER, TENANT_HEADER};
use crate::domain::ports::{RequestTransport, TransportError};
use crate::domain::value_objects::StatusClass;
use async_trait::async_trait;
use std::time::Duration;

/// Sends each request as a GET with the operation and tenant in headers.
pub struct HttpTransport {
    client: reqwest::Client,
    target_url: String,
}

impl HttpTransport {
    /// Create a transport targeting `target_url`, e.g. `http://127.0.0.1:8080`.
    pub fn new(target_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            target_url: target_url.into(),
        })
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }
}

#[async_trait]
impl RequestTransport for HttpTransport {
    async fn send(&self, operation: &str, tenant: &str) -> Result<StatusClass, TransportError> {
        let resp = self
            .client
            .get(&self.target_url)
            .header(OPERATION_HEADER, operation)
            .header(TENANT_HEADER, tenant)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let code = resp.status().as_u16();

        // Drain the body so the connection can be reused
        resp.bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        StatusClass::from_http_code(code).ok_or(TransportError::UnexpectedStatus(code))
    }
}
