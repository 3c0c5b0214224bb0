//! Domain Layer
//!
//! Simulation primitives, the spike state machine, and the ports the
//! application layer talks through.

pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;
