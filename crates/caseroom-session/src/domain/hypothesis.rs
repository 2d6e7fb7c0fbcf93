//! Hypotheses, votes and the consensus threshold.

use caseroom_core::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Confidence given to hypotheses submitted by participants.
pub const DEFAULT_CONFIDENCE: u8 = 50;

/// Who proposed a hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposedBy {
    /// A room participant.
    Participant {
        /// The proposer's participant id.
        participant_id: Uuid,
        /// The proposer's display name at submission time.
        name: String,
    },
    /// The external analysis collaborator.
    Analysis {
        /// The analysis identity's display name.
        name: String,
    },
}

/// Annotation attached by the analysis collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationAnnotation {
    /// Score from 0 to 100.
    pub score: u8,
    /// Free-text reasoning.
    pub reasoning: String,
    /// Patterns in the evidence that support the hypothesis.
    #[serde(default)]
    pub supporting_patterns: Vec<String>,
    /// Patterns in the evidence that contradict it.
    #[serde(default)]
    pub contradictions: Vec<String>,
}

/// A proposed explanation with its votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// Identifier, unique within the room.
    pub id: String,
    /// Short headline.
    pub title: String,
    /// Longer explanation.
    pub description: String,
    /// The asserted root cause.
    pub root_cause: String,
    /// Ids of evidence items backing the hypothesis.
    pub supporting_evidence: Vec<String>,
    /// Confidence from 0 to 100.
    pub confidence: u8,
    /// Proposer identity.
    pub proposed_by: ProposedBy,
    /// Distinct participant ids that voted for the hypothesis, in vote order.
    pub voters: Vec<Uuid>,
    /// Annotation from the analysis collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationAnnotation>,
}

impl Hypothesis {
    /// Number of distinct voters.
    #[must_use]
    pub fn vote_count(&self) -> usize {
        self.voters.len()
    }

    /// Whether `participant_id` has already voted for this hypothesis.
    #[must_use]
    pub fn has_voter(&self, participant_id: Uuid) -> bool {
        self.voters.contains(&participant_id)
    }
}

/// Client-supplied content of a new hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypothesisDraft {
    /// Short headline.
    pub title: String,
    /// Longer explanation.
    pub description: String,
    /// The asserted root cause.
    pub root_cause: String,
    /// Ids of evidence items backing the hypothesis.
    #[serde(default)]
    pub supporting_evidence: Vec<String>,
}

impl HypothesisDraft {
    /// Rejects drafts with blank text fields.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` naming the first blank field.
    pub fn validate(&self) -> Result<(), DomainError> {
        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("root_cause", &self.root_cause),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::Validation(format!(
                    "hypothesis {field} must not be blank"
                )));
            }
        }
        Ok(())
    }
}

/// Returns the hypothesis with the most voters.
///
/// Ties go to the earliest submitted hypothesis so repeated queries during a
/// tie are stable. An empty list has no leading hypothesis.
#[must_use]
pub fn leading_hypothesis(hypotheses: &[Hypothesis]) -> Option<&Hypothesis> {
    hypotheses.iter().fold(None, |leader, candidate| match leader {
        Some(current) if current.vote_count() >= candidate.vote_count() => Some(current),
        _ => Some(candidate),
    })
}

/// Votes required on one hypothesis to leave the investigation phase:
/// `ceil(0.6 × online_participants)`.
#[must_use]
pub fn consensus_threshold(online_participants: usize) -> usize {
    (online_participants * 3).div_ceil(5)
}
