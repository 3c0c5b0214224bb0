//! Application Layer
//!
//! Use cases that orchestrate the domain and infrastructure.

pub mod request_processor;

pub use request_processor::{ProcessorConfig, RequestProcessor};
