//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Trait for aggregate roots whose state changes are expressed as events.
///
/// Command methods validate first, then record an event and `apply` it, so a
/// rejected command never leaves the aggregate half-mutated.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version (number of events applied).
    fn version(&self) -> i64;

    /// Apply an event to mutate internal state.
    fn apply(&mut self, event: &Self::Event);

    /// Returns events produced by command handling that have not been
    /// published yet.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Drains the uncommitted events so they can be published.
    fn take_uncommitted_events(&mut self) -> Vec<Self::Event>;
}
