//! Query handlers for the session context.
//!
//! Queries lock the room only long enough to copy its state into a
//! read-only view DTO.

use caseroom_core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::Room;
use crate::domain::evidence::EvidenceItem;
use crate::domain::hypothesis::Hypothesis;
use crate::domain::incident::{IncidentAnalysis, IncidentRecord, SummaryDocument};
use crate::domain::participant::Participant;
use crate::domain::phase::Phase;
use crate::store::RoomStore;

/// Read-only snapshot of a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomView {
    /// The room identifier.
    pub room_id: Uuid,
    /// The shareable code.
    pub code: String,
    /// External incident reference.
    pub incident_id: String,
    /// Cached incident record.
    pub incident: Option<IncidentRecord>,
    /// Cached analysis.
    pub analysis: Option<IncidentAnalysis>,
    /// Participants in join order.
    pub participants: Vec<Participant>,
    /// Current evidence list.
    pub evidence: Vec<EvidenceItem>,
    /// Hypotheses in submission order.
    pub hypotheses: Vec<Hypothesis>,
    /// Current phase.
    pub phase: Phase,
    /// Hypothesis that carried the consensus gate.
    pub consensus_hypothesis_id: Option<String>,
    /// Generated summary document.
    pub summary: Option<SummaryDocument>,
    /// Whether a webhook opened the room.
    pub auto_created: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time the room entered `postmortem`.
    pub completed_at: Option<DateTime<Utc>>,
    /// Accepted mutation count.
    pub version: i64,
}

impl RoomView {
    /// Copies the room's current state.
    #[must_use]
    pub fn from_room(room: &Room) -> Self {
        Self {
            room_id: room.id,
            code: room.code.clone(),
            incident_id: room.incident_id.clone(),
            incident: room.incident.clone(),
            analysis: room.analysis.clone(),
            participants: room.participants.clone(),
            evidence: room.evidence.clone(),
            hypotheses: room.hypotheses.clone(),
            phase: room.phase,
            consensus_hypothesis_id: room.consensus_hypothesis_id.clone(),
            summary: room.summary.clone(),
            auto_created: room.auto_created,
            created_at: room.created_at,
            completed_at: room.completed_at,
            version: room.version,
        }
    }
}

/// The leading hypothesis and how far it is from the consensus gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadingHypothesisView {
    /// Hypothesis with the most voters, if any exist.
    pub hypothesis: Option<Hypothesis>,
    /// Its voter count.
    pub votes: usize,
    /// Votes needed to leave `investigation`.
    pub required: usize,
    /// Participants currently online.
    pub online_participants: usize,
    /// Whether `votes` meets `required`.
    pub consensus_reached: bool,
}

/// Retrieves a room snapshot by id.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound` if no room has the id.
pub async fn get_room_by_id(room_id: Uuid, store: &RoomStore) -> Result<RoomView, DomainError> {
    let handle = store.get(room_id)?;
    let room = handle.lock().await;
    Ok(RoomView::from_room(&room))
}

/// Retrieves the room's leading hypothesis with the current threshold.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound` if no room has the id.
pub async fn get_leading_hypothesis(
    room_id: Uuid,
    store: &RoomStore,
) -> Result<LeadingHypothesisView, DomainError> {
    let handle = store.get(room_id)?;
    let room = handle.lock().await;
    let hypothesis = room.leading_hypothesis().cloned();
    let votes = hypothesis.as_ref().map_or(0, Hypothesis::vote_count);
    let required = room.required_votes();
    Ok(LeadingHypothesisView {
        consensus_reached: hypothesis.is_some() && votes >= required,
        hypothesis,
        votes,
        required,
        online_participants: room.online_count(),
    })
}
