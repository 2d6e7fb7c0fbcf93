//! Connection presence and per-room subscriptions.
//!
//! A connection is registered when its transport opens and attached to a
//! (room, participant) pair once it joins. The subscription registry is
//! updated in the same critical section as the attachment, so a connection
//! receives room events exactly while it is attached.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::ServerEvent;

/// Identifier of one live transport connection.
pub type ConnectionId = Uuid;

/// Outbound channel of one connection.
pub type EventSink = mpsc::UnboundedSender<ServerEvent>;

/// The room and participant a connection acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    /// Room the connection is subscribed to.
    pub room_id: Uuid,
    /// Participant the connection acts as.
    pub participant_id: Uuid,
}

#[derive(Debug)]
struct Connection {
    sink: EventSink,
    attachment: Option<Attachment>,
}

#[derive(Debug, Default)]
struct Registry {
    connections: HashMap<ConnectionId, Connection>,
    rooms: HashMap<Uuid, HashSet<ConnectionId>>,
}

impl Registry {
    fn detach(&mut self, connection_id: ConnectionId) -> Option<Attachment> {
        let attachment = self
            .connections
            .get_mut(&connection_id)
            .and_then(|connection| connection.attachment.take())?;
        if let Some(subscribers) = self.rooms.get_mut(&attachment.room_id) {
            subscribers.remove(&connection_id);
            if subscribers.is_empty() {
                self.rooms.remove(&attachment.room_id);
            }
        }
        Some(attachment)
    }
}

/// Tracks live connections and which room each one is subscribed to.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    registry: Mutex<Registry>,
}

impl PresenceTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a newly opened connection with its outbound channel.
    pub fn register(&self, connection_id: ConnectionId, sink: EventSink) {
        self.registry().connections.insert(
            connection_id,
            Connection {
                sink,
                attachment: None,
            },
        );
    }

    /// Attaches a registered connection to a room as a participant,
    /// replacing any earlier attachment of that connection. Returns the
    /// previous attachment, if it differed.
    pub fn attach(&self, connection_id: ConnectionId, attachment: Attachment) -> Option<Attachment> {
        let mut registry = self.registry();
        if !registry.connections.contains_key(&connection_id) {
            return None;
        }
        let previous = registry
            .detach(connection_id)
            .filter(|previous| *previous != attachment);
        if let Some(connection) = registry.connections.get_mut(&connection_id) {
            connection.attachment = Some(attachment);
        }
        registry
            .rooms
            .entry(attachment.room_id)
            .or_default()
            .insert(connection_id);
        previous
    }

    /// The attachment of a connection, if it has joined a room.
    #[must_use]
    pub fn attachment(&self, connection_id: ConnectionId) -> Option<Attachment> {
        self.registry()
            .connections
            .get(&connection_id)
            .and_then(|connection| connection.attachment)
    }

    /// Unsubscribes a connection from its room but keeps it registered.
    pub fn detach(&self, connection_id: ConnectionId) -> Option<Attachment> {
        self.registry().detach(connection_id)
    }

    /// Forgets a closed connection. Returns the pair it was attached to, or
    /// `None` if it never attached or was already removed.
    pub fn on_disconnect(&self, connection_id: ConnectionId) -> Option<Attachment> {
        let mut registry = self.registry();
        let attachment = registry.detach(connection_id);
        registry.connections.remove(&connection_id);
        attachment
    }

    /// Whether any live connection is attached as this participant.
    #[must_use]
    pub fn is_participant_connected(&self, room_id: Uuid, participant_id: Uuid) -> bool {
        let registry = self.registry();
        registry.rooms.get(&room_id).is_some_and(|subscribers| {
            subscribers.iter().any(|id| {
                registry
                    .connections
                    .get(id)
                    .and_then(|connection| connection.attachment)
                    .is_some_and(|attachment| attachment.participant_id == participant_id)
            })
        })
    }

    /// Outbound channels of every connection subscribed to a room.
    #[must_use]
    pub fn subscribers(&self, room_id: Uuid) -> Vec<(ConnectionId, EventSink)> {
        let registry = self.registry();
        registry
            .rooms
            .get(&room_id)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .filter_map(|id| {
                        registry
                            .connections
                            .get(id)
                            .map(|connection| (*id, connection.sink.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Outbound channel of a single connection.
    #[must_use]
    pub fn sink(&self, connection_id: ConnectionId) -> Option<EventSink> {
        self.registry()
            .connections
            .get(&connection_id)
            .map(|connection| connection.sink.clone())
    }
}
