mod metrics_sink;
mod request_transport;

pub use metrics_sink::MetricsSink;
pub use request_transport::{RequestTransport, TransportError};
