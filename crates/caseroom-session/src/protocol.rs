//! Realtime wire protocol.
//!
//! Messages are JSON objects tagged by a kebab-case `type` field; payload
//! fields are snake_case.

use caseroom_core::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::query_handlers::RoomView;
use crate::domain::events::RoomEventKind;
use crate::domain::evidence::EvidenceItem;
use crate::domain::hypothesis::{Hypothesis, HypothesisDraft, ValidationAnnotation};
use crate::domain::incident::SummaryDocument;
use crate::domain::participant::{CursorPosition, Participant};
use crate::domain::phase::Phase;

/// A message sent by a client over its realtime connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientCommand {
    /// Attach this connection to a participant issued by the join endpoint.
    JoinRoom {
        room_id: Uuid,
        participant_id: Uuid,
    },
    MoveCursor {
        room_id: Uuid,
        position: CursorPosition,
    },
    AdvancePhase {
        room_id: Uuid,
        target_phase: Phase,
    },
    ReplaceEvidence {
        room_id: Uuid,
        items: Vec<EvidenceItem>,
    },
    MarkReviewed {
        room_id: Uuid,
        evidence_id: String,
    },
    SubmitHypothesis {
        room_id: Uuid,
        hypothesis: HypothesisDraft,
    },
    CastVote {
        room_id: Uuid,
        hypothesis_id: String,
    },
}

impl ClientCommand {
    /// Wire name of the command, echoed back in rejections.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::JoinRoom { .. } => "join-room",
            ClientCommand::MoveCursor { .. } => "move-cursor",
            ClientCommand::AdvancePhase { .. } => "advance-phase",
            ClientCommand::ReplaceEvidence { .. } => "replace-evidence",
            ClientCommand::MarkReviewed { .. } => "mark-reviewed",
            ClientCommand::SubmitHypothesis { .. } => "submit-hypothesis",
            ClientCommand::CastVote { .. } => "cast-vote",
        }
    }

    /// The room the command targets.
    #[must_use]
    pub fn room_id(&self) -> Uuid {
        match self {
            ClientCommand::JoinRoom { room_id, .. }
            | ClientCommand::MoveCursor { room_id, .. }
            | ClientCommand::AdvancePhase { room_id, .. }
            | ClientCommand::ReplaceEvidence { room_id, .. }
            | ClientCommand::MarkReviewed { room_id, .. }
            | ClientCommand::SubmitHypothesis { room_id, .. }
            | ClientCommand::CastVote { room_id, .. } => *room_id,
        }
    }
}

/// A message pushed by the server to subscribed connections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Full room state, sent to a connection when it attaches.
    RoomSnapshot { room: Box<RoomView> },
    ParticipantJoined { participant: Participant },
    ParticipantLeft { participant: Participant },
    PhaseChanged { phase: Phase },
    EvidenceChanged { items: Vec<EvidenceItem> },
    HypothesisAdded { hypothesis: Hypothesis },
    HypothesisVoted {
        hypothesis_id: String,
        voters: Vec<Uuid>,
    },
    CursorMoved {
        participant_id: Uuid,
        position: CursorPosition,
    },
    HypothesisValidated {
        hypothesis_id: String,
        validation: ValidationAnnotation,
    },
    SummaryGenerated { summary: SummaryDocument },
    /// Sent to the requesting connection only.
    CommandRejected {
        command: String,
        error: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        current: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        required: Option<usize>,
    },
}

impl ServerEvent {
    /// Wire message for an accepted room event.
    #[must_use]
    pub fn from_room_event(kind: &RoomEventKind) -> Self {
        match kind {
            RoomEventKind::ParticipantAdmitted(payload) => ServerEvent::ParticipantJoined {
                participant: payload.participant.clone(),
            },
            RoomEventKind::ParticipantConnected(payload) => ServerEvent::ParticipantJoined {
                participant: payload.participant.clone(),
            },
            RoomEventKind::ParticipantDisconnected(payload) => ServerEvent::ParticipantLeft {
                participant: payload.participant.clone(),
            },
            RoomEventKind::CursorMoved(payload) => ServerEvent::CursorMoved {
                participant_id: payload.participant_id,
                position: payload.position,
            },
            RoomEventKind::PhaseChanged(payload) => ServerEvent::PhaseChanged { phase: payload.to },
            RoomEventKind::EvidenceReplaced(payload) => ServerEvent::EvidenceChanged {
                items: payload.items.clone(),
            },
            RoomEventKind::HypothesisSubmitted(payload) => ServerEvent::HypothesisAdded {
                hypothesis: payload.hypothesis.clone(),
            },
            RoomEventKind::HypothesisVoted(payload) => ServerEvent::HypothesisVoted {
                hypothesis_id: payload.hypothesis_id.clone(),
                voters: payload.voters.clone(),
            },
            RoomEventKind::HypothesisValidated(payload) => ServerEvent::HypothesisValidated {
                hypothesis_id: payload.hypothesis_id.clone(),
                validation: payload.validation.clone(),
            },
            RoomEventKind::SummaryGenerated(payload) => ServerEvent::SummaryGenerated {
                summary: payload.summary.clone(),
            },
        }
    }

    /// Rejection notice for a failed command.
    #[must_use]
    pub fn rejected(command: &str, error: &DomainError) -> Self {
        let (current, required) = match error {
            DomainError::ConsensusNotReached { current, required } => {
                (Some(*current), Some(*required))
            }
            _ => (None, None),
        };
        ServerEvent::CommandRejected {
            command: command.to_owned(),
            error: error.code().to_owned(),
            message: error.to_string(),
            current,
            required,
        }
    }

    /// Wire name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::RoomSnapshot { .. } => "room-snapshot",
            ServerEvent::ParticipantJoined { .. } => "participant-joined",
            ServerEvent::ParticipantLeft { .. } => "participant-left",
            ServerEvent::PhaseChanged { .. } => "phase-changed",
            ServerEvent::EvidenceChanged { .. } => "evidence-changed",
            ServerEvent::HypothesisAdded { .. } => "hypothesis-added",
            ServerEvent::HypothesisVoted { .. } => "hypothesis-voted",
            ServerEvent::CursorMoved { .. } => "cursor-moved",
            ServerEvent::HypothesisValidated { .. } => "hypothesis-validated",
            ServerEvent::SummaryGenerated { .. } => "summary-generated",
            ServerEvent::CommandRejected { .. } => "command-rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_command_parses_kebab_case_tag() {
        // Arrange
        let room_id = Uuid::new_v4();
        let raw = json!({
            "type": "advance-phase",
            "room_id": room_id,
            "target_phase": "evidence_review"
        });

        // Act
        let command: ClientCommand = serde_json::from_value(raw).unwrap();

        // Assert
        assert_eq!(
            command,
            ClientCommand::AdvancePhase {
                room_id,
                target_phase: Phase::EvidenceReview
            }
        );
        assert_eq!(command.name(), "advance-phase");
        assert_eq!(command.room_id(), room_id);
    }

    #[test]
    fn test_client_command_rejects_unknown_type() {
        let raw = json!({ "type": "delete-room", "room_id": Uuid::new_v4() });
        assert!(serde_json::from_value::<ClientCommand>(raw).is_err());
    }

    #[test]
    fn test_rejection_carries_consensus_counts() {
        // Act
        let event = ServerEvent::rejected(
            "advance-phase",
            &DomainError::ConsensusNotReached {
                current: 2,
                required: 3,
            },
        );

        // Assert
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "command-rejected");
        assert_eq!(json["command"], "advance-phase");
        assert_eq!(json["error"], "consensus_not_reached");
        assert_eq!(json["current"], 2);
        assert_eq!(json["required"], 3);
    }

    #[test]
    fn test_rejection_omits_counts_for_other_errors() {
        let event = ServerEvent::rejected("cast-vote", &DomainError::HypothesisNotFound("h9".into()));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["error"], "hypothesis_not_found");
        assert!(json.get("current").is_none());
    }

    #[test]
    fn test_phase_changed_wire_shape() {
        let json = serde_json::to_value(ServerEvent::PhaseChanged {
            phase: Phase::TheoryDevelopment,
        })
        .unwrap();
        assert_eq!(json, json!({ "type": "phase-changed", "phase": "theory_development" }));
    }
}
