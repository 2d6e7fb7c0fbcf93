//! Case Room Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that the room
//! context, the collaborator adapters and the API server depend on.
//! It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod rng;
