//! Investigation phases.

use std::fmt;
use std::str::FromStr;

use caseroom_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// One stage of the fixed, forward-only investigation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Participants read the case briefing.
    Briefing,
    /// Evidence is reviewed and annotated.
    EvidenceReview,
    /// Hypotheses are proposed.
    TheoryDevelopment,
    /// Hypotheses are voted on until consensus.
    Investigation,
    /// The winning hypothesis is confirmed.
    Conclusion,
    /// The summary document is produced. Terminal.
    Postmortem,
}

impl Phase {
    /// Every phase in its required order.
    pub const ALL: [Phase; 6] = [
        Phase::Briefing,
        Phase::EvidenceReview,
        Phase::TheoryDevelopment,
        Phase::Investigation,
        Phase::Conclusion,
        Phase::Postmortem,
    ];

    /// The only phase a room in this phase may advance to.
    #[must_use]
    pub fn successor(self) -> Option<Phase> {
        match self {
            Phase::Briefing => Some(Phase::EvidenceReview),
            Phase::EvidenceReview => Some(Phase::TheoryDevelopment),
            Phase::TheoryDevelopment => Some(Phase::Investigation),
            Phase::Investigation => Some(Phase::Conclusion),
            Phase::Conclusion => Some(Phase::Postmortem),
            Phase::Postmortem => None,
        }
    }

    /// Whether no further transitions are defined.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.successor().is_none()
    }

    /// Wire name of the phase.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Briefing => "briefing",
            Phase::EvidenceReview => "evidence_review",
            Phase::TheoryDevelopment => "theory_development",
            Phase::Investigation => "investigation",
            Phase::Conclusion => "conclusion",
            Phase::Postmortem => "postmortem",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| DomainError::Validation(format!("unknown phase: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successor_walks_the_fixed_order() {
        let mut walked = vec![Phase::Briefing];
        while let Some(next) = walked.last().and_then(|p| p.successor()) {
            walked.push(next);
        }

        assert_eq!(walked, Phase::ALL.to_vec());
        assert!(Phase::Postmortem.is_terminal());
    }

    #[test]
    fn test_ordering_matches_sequence() {
        assert!(Phase::Briefing < Phase::EvidenceReview);
        assert!(Phase::Investigation < Phase::Conclusion);
        assert!(Phase::Conclusion < Phase::Postmortem);
    }

    #[test]
    fn test_serde_uses_snake_case_names() {
        let json = serde_json::to_value(Phase::TheoryDevelopment).unwrap();
        assert_eq!(json, "theory_development");

        let parsed: Phase = serde_json::from_value("evidence_review".into()).unwrap();
        assert_eq!(parsed, Phase::EvidenceReview);
    }

    #[test]
    fn test_from_str_rejects_unknown_phase() {
        assert_eq!("postmortem".parse::<Phase>().unwrap(), Phase::Postmortem);
        assert!(matches!(
            "epilogue".parse::<Phase>(),
            Err(DomainError::Validation(_))
        ));
    }
}
