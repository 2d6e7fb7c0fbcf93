//! Case Room — external collaborators.
//!
//! The session server consumes incident data, incident analysis and summary
//! documents through the capability traits in [`collaborator`]. Each trait
//! has a live adapter speaking to a remote HTTP API and a fallback adapter
//! that answers locally and never fails.

pub mod analyst;
pub mod chat;
pub mod collaborator;
pub mod error;
pub mod fallback;
pub mod guard;
pub mod incident_io;
pub mod summary;

pub use collaborator::{IncidentAnalyst, IncidentSource, SummaryWriter};
pub use error::IntegrationError;
