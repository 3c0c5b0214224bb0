//! Adapters Layer
//!
//! Inbound: the HTTP server. Outbound: metrics exposition and the
//! transports the load generator sends through.

pub mod inbound;
pub mod outbound;
