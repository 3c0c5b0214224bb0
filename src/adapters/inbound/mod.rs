mod api_server;

pub use api_server::{ApiServer, ApiState, HealthResponse, OPERATION_HEADER, TENANT_HEADER};
