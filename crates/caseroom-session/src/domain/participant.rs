//! Participants and their roles.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role a participant plays in the investigation.
///
/// Roles are not unique across participants; only `LeadDetective` carries
/// coordinating privileges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Coordinates the room and advances phases.
    LeadDetective,
    /// Reconstructs the incident timeline.
    TimelineSpecialist,
    /// Digs into logs, metrics and changes.
    #[default]
    TechnicalAnalyst,
    /// Works through responder statements.
    WitnessInterviewer,
    /// Curates the evidence board.
    EvidenceCoordinator,
}

impl Role {
    /// Whether this role may advance the room's phase.
    #[must_use]
    pub fn is_coordinator(self) -> bool {
        matches!(self, Role::LeadDetective)
    }
}

/// Last known pointer position of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// One human actor within a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Identifier issued at join time; clients resend it to reconnect.
    pub id: Uuid,
    /// Display name, unique within the room ignoring case.
    pub name: String,
    /// Assigned role.
    pub role: Role,
    /// Whether the participant currently has a live connection.
    pub online: bool,
    /// Last known pointer position.
    pub cursor: Option<CursorPosition>,
}

impl Participant {
    /// Whether `name` collides with this participant's name, ignoring case.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_role_is_technical_analyst() {
        assert_eq!(Role::default(), Role::TechnicalAnalyst);
        assert!(!Role::default().is_coordinator());
        assert!(Role::LeadDetective.is_coordinator());
    }

    #[test]
    fn test_has_name_ignores_case() {
        let participant = Participant {
            id: Uuid::new_v4(),
            name: "Alice".to_owned(),
            role: Role::TechnicalAnalyst,
            online: true,
            cursor: None,
        };

        assert!(participant.has_name("alice"));
        assert!(participant.has_name("ALICE"));
        assert!(!participant.has_name("Alicia"));
    }
}
