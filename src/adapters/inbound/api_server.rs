//! HTTP Server Adapter
//!
//! Serves simulated requests, the Prometheus scrape endpoint and a health
//! endpoint. Every path other than `/metrics` and `/health` is a simulated
//! request whose operation and tenant come from request headers.

use crate::adapters::outbound::PrometheusMetricsSink;
use crate::application::RequestProcessor;
use crate::domain::entities::RequestOutcome;
use crate::domain::value_objects::{Operation, StatusClass, Tenant};
use crate::infrastructure::connection_pool::PoolStats;
use crate::infrastructure::shutdown::ShutdownController;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Header carrying the operation name.
pub const OPERATION_HEADER: &str = "x-operation";
/// Header carrying the tenant name.
pub const TENANT_HEADER: &str = "x-customer";

/// Content type of the Prometheus text format.
const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub pool: PoolStats,
    pub spike_tenant: Option<Tenant>,
    pub in_flight: usize,
}

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub processor: Arc<RequestProcessor>,
    pub metrics: Arc<PrometheusMetricsSink>,
    pub shutdown: ShutdownController,
}

impl ApiState {
    pub fn new(
        processor: Arc<RequestProcessor>,
        metrics: Arc<PrometheusMetricsSink>,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            processor,
            metrics,
            shutdown,
        }
    }
}

/// HTTP server for the simulated service.
pub struct ApiServer {
    listen_addr: String,
    state: ApiState,
}

impl ApiServer {
    pub fn new(listen_addr: String, state: ApiState) -> Self {
        Self { listen_addr, state }
    }

    /// Build the router with all routes attached.
    pub fn router(state: ApiState) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .route("/", any(request_handler))
            .fallback(request_handler)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> anyhow::Result<TcpListener> {
        Ok(TcpListener::bind(&self.listen_addr).await?)
    }

    /// Serve on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        tracing::info!("simulated service listening on {}", listener.local_addr()?);

        let shutdown = self.state.shutdown.clone();
        axum::serve(listener, Self::router(self.state.clone()))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        tracing::info!("simulated service stopped");
        Ok(())
    }
}

// Handler functions

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn response_body(outcome: &RequestOutcome) -> String {
    match outcome.status {
        StatusClass::Ok if outcome.tenant.is_unknown() || outcome.operation.is_unknown() => {
            "Hello!".to_string()
        }
        StatusClass::Ok => format!(
            "Hello, {}! Operation: {}",
            outcome.tenant, outcome.operation
        ),
        StatusClass::Unavailable => "Database Connection Timeout".to_string(),
        StatusClass::InternalError => "Internal Server Error".to_string(),
    }
}

async fn request_handler(State(state): State<ApiState>, headers: HeaderMap) -> impl IntoResponse {
    let operation = Operation::from_attribute(header_value(&headers, OPERATION_HEADER));
    let tenant = Tenant::from_attribute(header_value(&headers, TENANT_HEADER));

    // Run detached so a disconnecting client cannot cut a request short
    // between acquiring a slot and reporting metrics.
    let guard = state.shutdown.request_guard();
    let processor = state.processor.clone();
    let joined = tokio::spawn(async move {
        let _guard = guard;
        processor.process(operation, tenant).await
    })
    .await;

    match joined {
        Ok(outcome) => {
            let code = StatusCode::from_u16(outcome.status.http_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (code, response_body(&outcome))
        }
        Err(e) => {
            tracing::error!("request task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            )
        }
    }
}

async fn metrics_handler(State(state): State<ApiState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)],
        state.metrics.export_prometheus(),
    )
}

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: if state.shutdown.is_shutdown() {
            "draining".to_string()
        } else {
            "ok".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        pool: state.processor.pool().stats(),
        spike_tenant: state.processor.scheduler().spike_tenant(),
        in_flight: state.shutdown.in_flight(),
    };
    Json(response)
}
