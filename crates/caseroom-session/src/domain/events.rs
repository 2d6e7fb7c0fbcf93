//! Domain events for the session context.

use caseroom_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::evidence::EvidenceItem;
use super::hypothesis::{Hypothesis, ValidationAnnotation};
use super::incident::SummaryDocument;
use super::participant::{CursorPosition, Participant};
use super::phase::Phase;

/// Emitted when a participant joins the room by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantAdmitted {
    /// The new participant.
    pub participant: Participant,
}

/// Emitted when a participant attaches a live connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantConnected {
    /// The participant, now online.
    pub participant: Participant,
}

/// Emitted when a participant's last live connection drops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantDisconnected {
    /// The participant, now offline.
    pub participant: Participant,
}

/// Emitted when a participant moves their pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorMoved {
    /// The participant whose pointer moved.
    pub participant_id: Uuid,
    /// The new position.
    pub position: CursorPosition,
}

/// Emitted when the room advances to its next phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseChanged {
    /// The phase the room left.
    pub from: Phase,
    /// The phase the room entered.
    pub to: Phase,
    /// The hypothesis that carried the consensus gate, when entering
    /// `conclusion`.
    pub consensus_hypothesis_id: Option<String>,
}

/// Emitted when the evidence list is replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceReplaced {
    /// The complete new list.
    pub items: Vec<EvidenceItem>,
}

/// Emitted when a hypothesis is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisSubmitted {
    /// The new hypothesis, including the proposer's own vote.
    pub hypothesis: Hypothesis,
}

/// Emitted when a participant votes for a hypothesis for the first time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisVoted {
    /// The hypothesis voted for.
    pub hypothesis_id: String,
    /// The participant who voted.
    pub voter_id: Uuid,
    /// The complete voter set after the vote.
    pub voters: Vec<Uuid>,
}

/// Emitted when the analysis collaborator validates a hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisValidated {
    /// The hypothesis annotated.
    pub hypothesis_id: String,
    /// The annotation, replacing any earlier one.
    pub validation: ValidationAnnotation,
}

/// Emitted when the room's summary document is generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryGenerated {
    /// The generated document.
    pub summary: SummaryDocument,
}

/// Event type identifier for [`ParticipantAdmitted`].
pub const PARTICIPANT_ADMITTED_EVENT_TYPE: &str = "room.participant_admitted";

/// Event type identifier for [`ParticipantConnected`].
pub const PARTICIPANT_CONNECTED_EVENT_TYPE: &str = "room.participant_connected";

/// Event type identifier for [`ParticipantDisconnected`].
pub const PARTICIPANT_DISCONNECTED_EVENT_TYPE: &str = "room.participant_disconnected";

/// Event type identifier for [`CursorMoved`].
pub const CURSOR_MOVED_EVENT_TYPE: &str = "room.cursor_moved";

/// Event type identifier for [`PhaseChanged`].
pub const PHASE_CHANGED_EVENT_TYPE: &str = "room.phase_changed";

/// Event type identifier for [`EvidenceReplaced`].
pub const EVIDENCE_REPLACED_EVENT_TYPE: &str = "room.evidence_replaced";

/// Event type identifier for [`HypothesisSubmitted`].
pub const HYPOTHESIS_SUBMITTED_EVENT_TYPE: &str = "room.hypothesis_submitted";

/// Event type identifier for [`HypothesisVoted`].
pub const HYPOTHESIS_VOTED_EVENT_TYPE: &str = "room.hypothesis_voted";

/// Event type identifier for [`HypothesisValidated`].
pub const HYPOTHESIS_VALIDATED_EVENT_TYPE: &str = "room.hypothesis_validated";

/// Event type identifier for [`SummaryGenerated`].
pub const SUMMARY_GENERATED_EVENT_TYPE: &str = "room.summary_generated";

/// Event payload variants for the session context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoomEventKind {
    /// A participant joined by name.
    ParticipantAdmitted(ParticipantAdmitted),
    /// A participant attached a connection.
    ParticipantConnected(ParticipantConnected),
    /// A participant went offline.
    ParticipantDisconnected(ParticipantDisconnected),
    /// A pointer moved.
    CursorMoved(CursorMoved),
    /// The phase advanced.
    PhaseChanged(PhaseChanged),
    /// The evidence list was replaced.
    EvidenceReplaced(EvidenceReplaced),
    /// A hypothesis was submitted.
    HypothesisSubmitted(HypothesisSubmitted),
    /// A vote was recorded.
    HypothesisVoted(HypothesisVoted),
    /// A validation annotation was attached.
    HypothesisValidated(HypothesisValidated),
    /// The summary document was generated.
    SummaryGenerated(SummaryGenerated),
}

impl RoomEventKind {
    /// Event type name of this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            RoomEventKind::ParticipantAdmitted(_) => PARTICIPANT_ADMITTED_EVENT_TYPE,
            RoomEventKind::ParticipantConnected(_) => PARTICIPANT_CONNECTED_EVENT_TYPE,
            RoomEventKind::ParticipantDisconnected(_) => PARTICIPANT_DISCONNECTED_EVENT_TYPE,
            RoomEventKind::CursorMoved(_) => CURSOR_MOVED_EVENT_TYPE,
            RoomEventKind::PhaseChanged(_) => PHASE_CHANGED_EVENT_TYPE,
            RoomEventKind::EvidenceReplaced(_) => EVIDENCE_REPLACED_EVENT_TYPE,
            RoomEventKind::HypothesisSubmitted(_) => HYPOTHESIS_SUBMITTED_EVENT_TYPE,
            RoomEventKind::HypothesisVoted(_) => HYPOTHESIS_VOTED_EVENT_TYPE,
            RoomEventKind::HypothesisValidated(_) => HYPOTHESIS_VALIDATED_EVENT_TYPE,
            RoomEventKind::SummaryGenerated(_) => SUMMARY_GENERATED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the session context.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: RoomEventKind,
}

impl DomainEvent for RoomEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(&self.kind).unwrap_or(serde_json::Value::Null)
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
