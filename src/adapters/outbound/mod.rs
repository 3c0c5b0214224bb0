mod http_transport;
mod in_process_transport;
mod prometheus_metrics_sink;

pub use http_transport::HttpTransport;
pub use in_process_transport::InProcessTransport;
pub use prometheus_metrics_sink::{
    ErrorKey, Histogram, HistogramSnapshot, PrometheusMetricsSink, RequestKey, DEFAULT_BUCKETS,
};
