//! Case Room API server library.
//!
//! Exposes the router, shared state and session coordinator so the binary
//! and the integration tests assemble the same application.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
