//! Shared test doubles for the Case Room server.

mod clock;
mod collaborators;
mod rng;

pub use clock::FixedClock;
pub use collaborators::{
    FailingCollaborator, SlowCollaborator, StubAnalyst, StubIncidentSource, StubSummaryWriter,
};
pub use rng::{MockRng, SequenceRng};
