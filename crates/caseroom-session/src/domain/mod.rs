//! Domain model for the session context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod evidence;
pub mod hypothesis;
pub mod incident;
pub mod participant;
pub mod phase;
