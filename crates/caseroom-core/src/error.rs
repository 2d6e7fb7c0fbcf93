//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
///
/// Every variant is reported to the requester only; none of them is raised
/// after a room has been mutated.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No active room matches the given id or code.
    #[error("room not found: {0}")]
    RoomNotFound(String),

    /// The participant is not a member of the room.
    #[error("participant not found: {0}")]
    ParticipantNotFound(Uuid),

    /// The hypothesis does not exist in the room.
    #[error("hypothesis not found: {0}")]
    HypothesisNotFound(String),

    /// The evidence item does not exist in the room.
    #[error("evidence not found: {0}")]
    EvidenceNotFound(String),

    /// A participant with the same name (ignoring case) already joined.
    #[error("name already taken in this room: {0}")]
    NameTaken(String),

    /// The requested phase is not the immediate successor of the current one.
    #[error("invalid phase transition from {from} to {to}")]
    InvalidTransition {
        /// The room's current phase.
        from: String,
        /// The phase that was requested.
        to: String,
    },

    /// No hypothesis holds enough votes to leave the investigation phase.
    #[error("consensus not reached: leading hypothesis has {current} of {required} required votes")]
    ConsensusNotReached {
        /// Votes held by the leading hypothesis (0 when there is none).
        current: usize,
        /// Votes required by the consensus threshold.
        required: usize,
    },

    /// The requester lacks the role needed for the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The connection issued a room command without being attached to that room.
    #[error("connection is not attached to room {0}")]
    NotAttached(Uuid),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Machine-readable error code used in HTTP bodies and realtime rejections.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RoomNotFound(_) => "room_not_found",
            Self::ParticipantNotFound(_) => "participant_not_found",
            Self::HypothesisNotFound(_) => "hypothesis_not_found",
            Self::EvidenceNotFound(_) => "evidence_not_found",
            Self::NameTaken(_) => "name_taken",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::ConsensusNotReached { .. } => "consensus_not_reached",
            Self::Forbidden(_) => "forbidden",
            Self::NotAttached(_) => "not_attached",
            Self::Validation(_) => "validation_error",
            Self::Infrastructure(_) => "infrastructure_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consensus_not_reached_message_reports_counts() {
        let err = DomainError::ConsensusNotReached {
            current: 2,
            required: 3,
        };

        assert_eq!(err.code(), "consensus_not_reached");
        assert_eq!(
            err.to_string(),
            "consensus not reached: leading hypothesis has 2 of 3 required votes"
        );
    }

    #[test]
    fn test_invalid_transition_message_names_both_phases() {
        let err = DomainError::InvalidTransition {
            from: "briefing".to_owned(),
            to: "investigation".to_owned(),
        };

        assert_eq!(err.code(), "invalid_transition");
        assert_eq!(
            err.to_string(),
            "invalid phase transition from briefing to investigation"
        );
    }
}
