//! Fan-out of server events to subscribed connections.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::presence::{ConnectionId, PresenceTracker};
use crate::protocol::ServerEvent;

/// Delivers events to the connections subscribed to a room.
///
/// Delivery is best-effort per connection: a closed channel is logged and
/// skipped, and never fails the command that produced the event.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    presence: Arc<PresenceTracker>,
}

impl Broadcaster {
    /// Creates a broadcaster over the given subscription registry.
    #[must_use]
    pub fn new(presence: Arc<PresenceTracker>) -> Self {
        Self { presence }
    }

    /// Sends `event` to every connection subscribed to `room_id`.
    pub fn emit_to_room(&self, room_id: Uuid, event: &ServerEvent) {
        self.fan_out(room_id, None, event);
    }

    /// Sends `event` to every subscriber of `room_id` except `excluding`.
    pub fn emit_to_others(&self, room_id: Uuid, excluding: ConnectionId, event: &ServerEvent) {
        self.fan_out(room_id, Some(excluding), event);
    }

    /// Sends `event` to one connection.
    pub fn emit_to_connection(&self, connection_id: ConnectionId, event: ServerEvent) {
        let Some(sink) = self.presence.sink(connection_id) else {
            warn!(%connection_id, event = event.name(), "connection not registered, dropping event");
            return;
        };
        let name = event.name();
        if sink.send(event).is_err() {
            warn!(%connection_id, event = name, "failed to deliver event");
        }
    }

    fn fan_out(&self, room_id: Uuid, excluding: Option<ConnectionId>, event: &ServerEvent) {
        let mut delivered = 0_usize;
        for (connection_id, sink) in self.presence.subscribers(room_id) {
            if Some(connection_id) == excluding {
                continue;
            }
            if sink.send(event.clone()).is_err() {
                warn!(%room_id, %connection_id, event = event.name(), "failed to deliver event");
                continue;
            }
            delivered += 1;
        }
        debug!(%room_id, event = event.name(), delivered, "event broadcast");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::phase::Phase;
    use crate::presence::Attachment;
    use tokio::sync::mpsc;

    #[test]
    fn test_emit_to_others_skips_origin_and_survives_closed_sinks() {
        // Arrange
        let presence = Arc::new(PresenceTracker::new());
        let broadcaster = Broadcaster::new(Arc::clone(&presence));
        let room_id = Uuid::new_v4();
        let mut receivers = Vec::new();
        let mut connections = Vec::new();
        for _ in 0..3 {
            let (sink, receiver) = mpsc::unbounded_channel();
            let connection_id = Uuid::new_v4();
            presence.register(connection_id, sink);
            presence.attach(
                connection_id,
                Attachment {
                    room_id,
                    participant_id: Uuid::new_v4(),
                },
            );
            connections.push(connection_id);
            receivers.push(receiver);
        }
        // Third connection's receiver is gone.
        drop(receivers.pop());
        let event = ServerEvent::PhaseChanged {
            phase: Phase::EvidenceReview,
        };

        // Act
        broadcaster.emit_to_others(room_id, connections[0], &event);

        // Assert
        assert!(receivers[0].try_recv().is_err());
        assert_eq!(receivers[1].try_recv().unwrap(), event);
    }

    #[test]
    fn test_emit_to_room_reaches_only_that_room() {
        // Arrange
        let presence = Arc::new(PresenceTracker::new());
        let broadcaster = Broadcaster::new(Arc::clone(&presence));
        let (sink, mut receiver) = mpsc::unbounded_channel();
        let connection_id = Uuid::new_v4();
        presence.register(connection_id, sink);
        presence.attach(
            connection_id,
            Attachment {
                room_id: Uuid::new_v4(),
                participant_id: Uuid::new_v4(),
            },
        );

        // Act
        broadcaster.emit_to_room(
            Uuid::new_v4(),
            &ServerEvent::PhaseChanged {
                phase: Phase::EvidenceReview,
            },
        );

        // Assert
        assert!(receiver.try_recv().is_err());
    }
}
