//! Case Room — session bounded context.
//!
//! Responsible for the lifecycle of a case room: participants and their
//! presence, the investigation phase state machine, evidence, hypotheses
//! and voting, and the fan-out of every accepted change to the connections
//! subscribed to the room.

pub mod application;
pub mod broadcast;
pub mod domain;
pub mod presence;
pub mod protocol;
pub mod store;
