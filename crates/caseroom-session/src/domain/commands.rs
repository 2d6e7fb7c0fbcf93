//! Commands for the session context.

use caseroom_core::command::Command;
use uuid::Uuid;

use super::evidence::EvidenceItem;
use super::hypothesis::{HypothesisDraft, ValidationAnnotation};
use super::incident::{IncidentAnalysis, IncidentRecord, SummaryDocument};
use super::participant::{CursorPosition, Role};
use super::phase::Phase;
use crate::presence::ConnectionId;

macro_rules! impl_command {
    ($command:ty, $name:literal) => {
        impl Command for $command {
            fn command_type(&self) -> &'static str {
                $name
            }

            fn correlation_id(&self) -> Uuid {
                self.correlation_id
            }
        }
    };
}

/// Command to open a new room for an incident.
#[derive(Debug, Clone)]
pub struct CreateRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// External incident reference.
    pub incident_id: String,
    /// Incident record fetched from the incident collaborator.
    pub incident: Option<IncidentRecord>,
    /// Analysis produced by the analysis collaborator.
    pub analysis: Option<IncidentAnalysis>,
    /// Whether the room was opened by an incident webhook.
    pub auto_created: bool,
}

impl_command!(CreateRoom, "room.create");

/// Command to join a room by its shareable code.
#[derive(Debug, Clone)]
pub struct JoinRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room's short code.
    pub code: String,
    /// Requested display name.
    pub name: String,
    /// Requested role; defaults to technical analyst.
    pub role: Option<Role>,
}

impl_command!(JoinRoom, "room.join");

/// Command to attach a live connection to a previously joined participant.
#[derive(Debug, Clone)]
pub struct ConnectParticipant {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room to attach to.
    pub room_id: Uuid,
    /// The participant id issued at join time.
    pub participant_id: Uuid,
    /// The connection being attached.
    pub connection_id: ConnectionId,
}

impl_command!(ConnectParticipant, "room.connect_participant");

/// Command issued when a connection closes.
#[derive(Debug, Clone)]
pub struct DisconnectConnection {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The connection that closed.
    pub connection_id: ConnectionId,
}

impl_command!(DisconnectConnection, "room.disconnect_connection");

/// Command to record a participant's pointer position.
#[derive(Debug, Clone)]
pub struct MoveCursor {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room.
    pub room_id: Uuid,
    /// The participant whose pointer moved.
    pub participant_id: Uuid,
    /// The originating connection, excluded from the echo.
    pub origin: ConnectionId,
    /// The new position.
    pub position: CursorPosition,
}

impl_command!(MoveCursor, "room.move_cursor");

/// Command to advance the room's phase.
#[derive(Debug, Clone)]
pub struct AdvancePhase {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room.
    pub room_id: Uuid,
    /// The requesting participant.
    pub participant_id: Uuid,
    /// The phase the requester wants to enter.
    pub target_phase: Phase,
}

impl_command!(AdvancePhase, "room.advance_phase");

/// Command to replace the room's evidence list wholesale.
#[derive(Debug, Clone)]
pub struct ReplaceEvidence {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room.
    pub room_id: Uuid,
    /// The complete new list.
    pub items: Vec<EvidenceItem>,
}

impl_command!(ReplaceEvidence, "room.replace_evidence");

/// Command to flag a single evidence item as reviewed.
#[derive(Debug, Clone)]
pub struct MarkEvidenceReviewed {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room.
    pub room_id: Uuid,
    /// The evidence item.
    pub evidence_id: String,
}

impl_command!(MarkEvidenceReviewed, "room.mark_evidence_reviewed");

/// Command to submit a new hypothesis.
#[derive(Debug, Clone)]
pub struct SubmitHypothesis {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room.
    pub room_id: Uuid,
    /// The proposing participant.
    pub participant_id: Uuid,
    /// The hypothesis content.
    pub draft: HypothesisDraft,
}

impl_command!(SubmitHypothesis, "room.submit_hypothesis");

/// Command to vote for a hypothesis.
#[derive(Debug, Clone)]
pub struct CastVote {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room.
    pub room_id: Uuid,
    /// The voting participant.
    pub participant_id: Uuid,
    /// The hypothesis voted for.
    pub hypothesis_id: String,
}

impl_command!(CastVote, "room.cast_vote");

/// Command to attach the analysis collaborator's validation to a hypothesis.
#[derive(Debug, Clone)]
pub struct AttachValidation {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room.
    pub room_id: Uuid,
    /// The hypothesis annotated.
    pub hypothesis_id: String,
    /// The annotation.
    pub validation: ValidationAnnotation,
}

impl_command!(AttachValidation, "room.attach_validation");

/// Command to store the room's generated summary document.
#[derive(Debug, Clone)]
pub struct RecordSummary {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room.
    pub room_id: Uuid,
    /// The generated document.
    pub summary: SummaryDocument,
}

impl_command!(RecordSummary, "room.record_summary");
