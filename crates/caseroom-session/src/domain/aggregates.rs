//! Aggregate root for the session context.

use caseroom_core::aggregate::AggregateRoot;
use caseroom_core::clock::Clock;
use caseroom_core::error::DomainError;
use caseroom_core::event::EventMetadata;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::events::{
    CursorMoved, EvidenceReplaced, HypothesisSubmitted, HypothesisValidated, HypothesisVoted,
    ParticipantAdmitted, ParticipantConnected, ParticipantDisconnected, PhaseChanged, RoomEvent,
    RoomEventKind, SummaryGenerated,
};
use super::evidence::{EvidenceItem, validate_evidence, with_reviewed};
use super::hypothesis::{
    DEFAULT_CONFIDENCE, Hypothesis, HypothesisDraft, ProposedBy, ValidationAnnotation,
    consensus_threshold, leading_hypothesis,
};
use super::incident::{IncidentAnalysis, IncidentRecord, SummaryDocument};
use super::participant::{CursorPosition, Participant, Role};
use super::phase::Phase;

/// Initial content of a freshly created room.
#[derive(Debug, Clone, Default)]
pub struct RoomSeed {
    /// External incident reference.
    pub incident_id: String,
    /// Cached incident record.
    pub incident: Option<IncidentRecord>,
    /// Cached analysis.
    pub analysis: Option<IncidentAnalysis>,
    /// Evidence derived from the analysis.
    pub evidence: Vec<EvidenceItem>,
    /// Hypotheses suggested by the analysis.
    pub hypotheses: Vec<Hypothesis>,
    /// Whether the room was opened by a webhook.
    pub auto_created: bool,
}

/// Result of a vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    /// Voter set after the vote.
    pub voters: Vec<Uuid>,
    /// False when the participant had already voted and nothing changed.
    pub recorded: bool,
}

/// The aggregate root for a case room.
#[derive(Debug)]
pub struct Room {
    /// Aggregate identifier.
    pub id: Uuid,
    pub(crate) code: String,
    pub(crate) incident_id: String,
    pub(crate) incident: Option<IncidentRecord>,
    pub(crate) analysis: Option<IncidentAnalysis>,
    pub(crate) participants: Vec<Participant>,
    pub(crate) evidence: Vec<EvidenceItem>,
    pub(crate) hypotheses: Vec<Hypothesis>,
    pub(crate) phase: Phase,
    pub(crate) consensus_hypothesis_id: Option<String>,
    pub(crate) summary: Option<SummaryDocument>,
    pub(crate) auto_created: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    /// Current version (accepted mutation count).
    pub(crate) version: i64,
    uncommitted_events: Vec<RoomEvent>,
}

impl Room {
    /// Creates a room in the `briefing` phase.
    #[must_use]
    pub fn new(id: Uuid, code: String, seed: RoomSeed, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            code,
            incident_id: seed.incident_id,
            incident: seed.incident,
            analysis: seed.analysis,
            participants: Vec::new(),
            evidence: seed.evidence,
            hypotheses: seed.hypotheses,
            phase: Phase::Briefing,
            consensus_hypothesis_id: None,
            summary: None,
            auto_created: seed.auto_created,
            created_at,
            completed_at: None,
            version: 0,
            uncommitted_events: Vec::new(),
        }
    }

    /// The room's shareable code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// External incident reference.
    #[must_use]
    pub fn incident_id(&self) -> &str {
        &self.incident_id
    }

    /// Cached incident record, if one was fetched.
    #[must_use]
    pub fn incident(&self) -> Option<&IncidentRecord> {
        self.incident.as_ref()
    }

    /// Cached analysis, if one was produced.
    #[must_use]
    pub fn analysis(&self) -> Option<&IncidentAnalysis> {
        self.analysis.as_ref()
    }

    /// All participants in join order, including offline ones.
    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Looks up a participant by id.
    #[must_use]
    pub fn participant(&self, participant_id: Uuid) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == participant_id)
    }

    /// Current evidence list.
    #[must_use]
    pub fn evidence(&self) -> &[EvidenceItem] {
        &self.evidence
    }

    /// Hypotheses in submission order.
    #[must_use]
    pub fn hypotheses(&self) -> &[Hypothesis] {
        &self.hypotheses
    }

    /// Looks up a hypothesis by id.
    #[must_use]
    pub fn hypothesis(&self, hypothesis_id: &str) -> Option<&Hypothesis> {
        self.hypotheses.iter().find(|h| h.id == hypothesis_id)
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Hypothesis that carried the consensus gate.
    #[must_use]
    pub fn consensus_hypothesis(&self) -> Option<&Hypothesis> {
        self.consensus_hypothesis_id
            .as_deref()
            .and_then(|id| self.hypothesis(id))
    }

    /// Generated summary document, if any.
    #[must_use]
    pub fn summary(&self) -> Option<&SummaryDocument> {
        self.summary.as_ref()
    }

    /// Whether a webhook opened the room.
    #[must_use]
    pub fn auto_created(&self) -> bool {
        self.auto_created
    }

    /// When the room was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the room entered `postmortem`.
    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Number of participants with a live connection.
    #[must_use]
    pub fn online_count(&self) -> usize {
        self.participants.iter().filter(|p| p.online).count()
    }

    /// Hypothesis with the most voters, earliest first on ties.
    #[must_use]
    pub fn leading_hypothesis(&self) -> Option<&Hypothesis> {
        leading_hypothesis(&self.hypotheses)
    }

    /// Votes needed on the leading hypothesis to leave `investigation`.
    #[must_use]
    pub fn required_votes(&self) -> usize {
        consensus_threshold(self.online_count())
    }

    fn require_participant(&self, participant_id: Uuid) -> Result<&Participant, DomainError> {
        self.participant(participant_id)
            .ok_or(DomainError::ParticipantNotFound(participant_id))
    }

    fn require_hypothesis(&self, hypothesis_id: &str) -> Result<&Hypothesis, DomainError> {
        self.hypothesis(hypothesis_id)
            .ok_or_else(|| DomainError::HypothesisNotFound(hypothesis_id.to_owned()))
    }

    fn record(&mut self, kind: RoomEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let event = RoomEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: self.id,
                sequence_number: self.version + 1,
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        self.apply(&event);
        self.uncommitted_events.push(event);
    }

    /// Admits a new participant by display name. The participant starts
    /// online.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank name and
    /// `DomainError::NameTaken` if another participant already uses the name,
    /// ignoring case.
    pub fn admit_participant(
        &mut self,
        participant_id: Uuid,
        name: &str,
        role: Role,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Participant, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation(
                "participant name must not be blank".to_owned(),
            ));
        }
        if self.participants.iter().any(|p| p.has_name(name)) {
            return Err(DomainError::NameTaken(name.to_owned()));
        }

        let participant = Participant {
            id: participant_id,
            name: name.to_owned(),
            role,
            online: true,
            cursor: None,
        };
        self.record(
            RoomEventKind::ParticipantAdmitted(ParticipantAdmitted {
                participant: participant.clone(),
            }),
            correlation_id,
            clock,
        );
        Ok(participant)
    }

    /// Marks a participant online after a connection attaches. Records an
    /// event only when the participant was offline.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ParticipantNotFound` for an unknown id.
    pub fn mark_connected(
        &mut self,
        participant_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Participant, DomainError> {
        let mut participant = self.require_participant(participant_id)?.clone();
        if participant.online {
            return Ok(participant);
        }
        participant.online = true;
        self.record(
            RoomEventKind::ParticipantConnected(ParticipantConnected {
                participant: participant.clone(),
            }),
            correlation_id,
            clock,
        );
        Ok(participant)
    }

    /// Marks a participant offline. Their votes and submissions stay.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ParticipantNotFound` for an unknown id.
    pub fn mark_disconnected(
        &mut self,
        participant_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Participant, DomainError> {
        let mut participant = self.require_participant(participant_id)?.clone();
        participant.online = false;
        self.record(
            RoomEventKind::ParticipantDisconnected(ParticipantDisconnected {
                participant: participant.clone(),
            }),
            correlation_id,
            clock,
        );
        Ok(participant)
    }

    /// Records a participant's pointer position.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ParticipantNotFound` for an unknown id.
    pub fn move_cursor(
        &mut self,
        participant_id: Uuid,
        position: CursorPosition,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.require_participant(participant_id)?;
        self.record(
            RoomEventKind::CursorMoved(CursorMoved {
                participant_id,
                position,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Advances the room to `target`.
    ///
    /// # Errors
    ///
    /// - `DomainError::ParticipantNotFound` if the requester is not in the room.
    /// - `DomainError::InvalidTransition` unless `target` is the immediate
    ///   successor of the current phase.
    /// - `DomainError::Forbidden` unless the requester is the lead detective
    ///   or the room's only participant.
    /// - `DomainError::ConsensusNotReached` when leaving `investigation`
    ///   without enough votes on the leading hypothesis.
    pub fn advance_phase(
        &mut self,
        requester_id: Uuid,
        target: Phase,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Phase, DomainError> {
        let requester = self.require_participant(requester_id)?;
        if self.phase.successor() != Some(target) {
            return Err(DomainError::InvalidTransition {
                from: self.phase.to_string(),
                to: target.to_string(),
            });
        }
        if !requester.role.is_coordinator() && self.participants.len() != 1 {
            return Err(DomainError::Forbidden(
                "only the lead detective can advance the phase".to_owned(),
            ));
        }

        let mut consensus_hypothesis_id = None;
        if self.phase == Phase::Investigation {
            let required = self.required_votes();
            let leader = self.leading_hypothesis();
            let current = leader.map_or(0, Hypothesis::vote_count);
            match leader {
                Some(leader) if current >= required => {
                    consensus_hypothesis_id = Some(leader.id.clone());
                }
                _ => return Err(DomainError::ConsensusNotReached { current, required }),
            }
        }

        let from = self.phase;
        self.record(
            RoomEventKind::PhaseChanged(PhaseChanged {
                from,
                to: target,
                consensus_hypothesis_id,
            }),
            correlation_id,
            clock,
        );
        Ok(target)
    }

    /// Replaces the evidence list wholesale.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for duplicate ids or out-of-range
    /// significance.
    pub fn replace_evidence(
        &mut self,
        items: Vec<EvidenceItem>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        validate_evidence(&items)?;
        self.record(
            RoomEventKind::EvidenceReplaced(EvidenceReplaced { items }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Flags one evidence item as reviewed and republishes the whole list.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::EvidenceNotFound` for an unknown id.
    pub fn mark_evidence_reviewed(
        &mut self,
        evidence_id: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let items = with_reviewed(&self.evidence, evidence_id)?;
        self.record(
            RoomEventKind::EvidenceReplaced(EvidenceReplaced { items }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Appends a hypothesis with the proposer's own vote.
    ///
    /// # Errors
    ///
    /// - `DomainError::ParticipantNotFound` if the proposer is not in the room.
    /// - `DomainError::Validation` for a blank draft or a reused id.
    pub fn submit_hypothesis(
        &mut self,
        participant_id: Uuid,
        hypothesis_id: String,
        draft: HypothesisDraft,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Hypothesis, DomainError> {
        let proposer = self.require_participant(participant_id)?;
        draft.validate()?;
        if self.hypothesis(&hypothesis_id).is_some() {
            return Err(DomainError::Validation(format!(
                "hypothesis id already in use: {hypothesis_id}"
            )));
        }

        let hypothesis = Hypothesis {
            id: hypothesis_id,
            title: draft.title,
            description: draft.description,
            root_cause: draft.root_cause,
            supporting_evidence: draft.supporting_evidence,
            confidence: DEFAULT_CONFIDENCE,
            proposed_by: ProposedBy::Participant {
                participant_id,
                name: proposer.name.clone(),
            },
            voters: vec![participant_id],
            validation: None,
        };
        self.record(
            RoomEventKind::HypothesisSubmitted(HypothesisSubmitted {
                hypothesis: hypothesis.clone(),
            }),
            correlation_id,
            clock,
        );
        Ok(hypothesis)
    }

    /// Adds a participant's vote. Voting twice changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::HypothesisNotFound` or
    /// `DomainError::ParticipantNotFound` for unknown ids.
    pub fn cast_vote(
        &mut self,
        hypothesis_id: &str,
        participant_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<VoteOutcome, DomainError> {
        let hypothesis = self.require_hypothesis(hypothesis_id)?;
        self.require_participant(participant_id)?;

        if hypothesis.has_voter(participant_id) {
            return Ok(VoteOutcome {
                voters: hypothesis.voters.clone(),
                recorded: false,
            });
        }

        let mut voters = hypothesis.voters.clone();
        voters.push(participant_id);
        self.record(
            RoomEventKind::HypothesisVoted(HypothesisVoted {
                hypothesis_id: hypothesis_id.to_owned(),
                voter_id: participant_id,
                voters: voters.clone(),
            }),
            correlation_id,
            clock,
        );
        Ok(VoteOutcome {
            voters,
            recorded: true,
        })
    }

    /// Attaches a validation annotation, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::HypothesisNotFound` for an unknown id.
    pub fn attach_validation(
        &mut self,
        hypothesis_id: &str,
        validation: ValidationAnnotation,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.require_hypothesis(hypothesis_id)?;
        self.record(
            RoomEventKind::HypothesisValidated(HypothesisValidated {
                hypothesis_id: hypothesis_id.to_owned(),
                validation,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Stores the summary document. Only the first document is kept; later
    /// calls return it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the room has not reached
    /// consensus yet.
    pub fn record_summary(
        &mut self,
        summary: SummaryDocument,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<SummaryDocument, DomainError> {
        if let Some(existing) = &self.summary {
            return Ok(existing.clone());
        }
        if self.consensus_hypothesis_id.is_none() {
            return Err(DomainError::Validation(
                "summary requires a concluded investigation".to_owned(),
            ));
        }
        self.record(
            RoomEventKind::SummaryGenerated(SummaryGenerated {
                summary: summary.clone(),
            }),
            correlation_id,
            clock,
        );
        Ok(summary)
    }
}

impl AggregateRoot for Room {
    type Event = RoomEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            RoomEventKind::ParticipantAdmitted(payload) => {
                self.participants.push(payload.participant.clone());
            }
            RoomEventKind::ParticipantConnected(ParticipantConnected { participant })
            | RoomEventKind::ParticipantDisconnected(ParticipantDisconnected { participant }) => {
                if let Some(existing) = self.participants.iter_mut().find(|p| p.id == participant.id)
                {
                    existing.online = participant.online;
                }
            }
            RoomEventKind::CursorMoved(payload) => {
                if let Some(existing) = self
                    .participants
                    .iter_mut()
                    .find(|p| p.id == payload.participant_id)
                {
                    existing.cursor = Some(payload.position);
                }
            }
            RoomEventKind::PhaseChanged(payload) => {
                self.phase = payload.to;
                match payload.to {
                    Phase::Conclusion => {
                        self.consensus_hypothesis_id
                            .clone_from(&payload.consensus_hypothesis_id);
                    }
                    Phase::Postmortem => self.completed_at = Some(event.metadata.occurred_at),
                    _ => {}
                }
            }
            RoomEventKind::EvidenceReplaced(payload) => {
                self.evidence.clone_from(&payload.items);
            }
            RoomEventKind::HypothesisSubmitted(payload) => {
                self.hypotheses.push(payload.hypothesis.clone());
            }
            RoomEventKind::HypothesisVoted(payload) => {
                if let Some(hypothesis) = self
                    .hypotheses
                    .iter_mut()
                    .find(|h| h.id == payload.hypothesis_id)
                {
                    hypothesis.voters.clone_from(&payload.voters);
                }
            }
            RoomEventKind::HypothesisValidated(payload) => {
                if let Some(hypothesis) = self
                    .hypotheses
                    .iter_mut()
                    .find(|h| h.id == payload.hypothesis_id)
                {
                    hypothesis.validation = Some(payload.validation.clone());
                }
            }
            RoomEventKind::SummaryGenerated(payload) => {
                self.summary = Some(payload.summary.clone());
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn take_uncommitted_events(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.uncommitted_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseroom_core::event::DomainEvent;
    use caseroom_test_support::FixedClock;
    use chrono::TimeZone;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn empty_room() -> Room {
        Room::new(
            Uuid::new_v4(),
            "CASE-AB12".to_owned(),
            RoomSeed {
                incident_id: "INC-2024-001".to_owned(),
                ..RoomSeed::default()
            },
            clock().0,
        )
    }

    fn admit(room: &mut Room, name: &str, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        room.admit_participant(id, name, role, Uuid::new_v4(), &clock())
            .unwrap();
        id
    }

    fn draft(title: &str) -> HypothesisDraft {
        HypothesisDraft {
            title: title.to_owned(),
            description: "Pool reached capacity under load".to_owned(),
            root_cause: "Unbounded retries".to_owned(),
            supporting_evidence: Vec::new(),
        }
    }

    fn advance_to(room: &mut Room, lead: Uuid, target: Phase) {
        while room.phase() != target {
            let next = room.phase().successor().unwrap();
            room.advance_phase(lead, next, Uuid::new_v4(), &clock())
                .unwrap();
        }
    }

    #[test]
    fn test_admit_participant_produces_event_with_metadata() {
        // Arrange
        let mut room = empty_room();
        let correlation_id = Uuid::new_v4();
        let participant_id = Uuid::new_v4();

        // Act
        let participant = room
            .admit_participant(
                participant_id,
                "Alice",
                Role::LeadDetective,
                correlation_id,
                &clock(),
            )
            .unwrap();

        // Assert
        assert!(participant.online);
        assert_eq!(room.participants().len(), 1);
        assert_eq!(room.version(), 1);

        let events = room.uncommitted_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "room.participant_admitted");
        let meta = events[0].metadata();
        assert_eq!(meta.aggregate_id, room.id);
        assert_eq!(meta.sequence_number, 1);
        assert_eq!(meta.correlation_id, correlation_id);
        assert_eq!(meta.causation_id, correlation_id);
        assert_eq!(meta.occurred_at, clock().0);
    }

    #[test]
    fn test_admit_participant_rejects_name_ignoring_case() {
        // Arrange
        let mut room = empty_room();
        admit(&mut room, "Alice", Role::LeadDetective);

        // Act
        let result = room.admit_participant(
            Uuid::new_v4(),
            "alice",
            Role::TechnicalAnalyst,
            Uuid::new_v4(),
            &clock(),
        );

        // Assert
        assert!(matches!(result, Err(DomainError::NameTaken(_))));
        assert_eq!(room.participants().len(), 1);
        assert_eq!(room.uncommitted_events().len(), 1);
    }

    #[test]
    fn test_admit_participant_rejects_blank_name() {
        let mut room = empty_room();
        let result = room.admit_participant(
            Uuid::new_v4(),
            "   ",
            Role::TechnicalAnalyst,
            Uuid::new_v4(),
            &clock(),
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_sequence_numbers_increase_across_commands() {
        // Arrange
        let mut room = empty_room();
        let alice = admit(&mut room, "Alice", Role::LeadDetective);

        // Act
        room.move_cursor(
            alice,
            CursorPosition { x: 1.0, y: 2.0 },
            Uuid::new_v4(),
            &clock(),
        )
        .unwrap();
        let drained = room.take_uncommitted_events();

        // Assert
        let sequence: Vec<i64> = drained
            .iter()
            .map(|event| event.metadata.sequence_number)
            .collect();
        assert_eq!(sequence, vec![1, 2]);
        assert!(room.uncommitted_events().is_empty());
        assert_eq!(
            room.participant(alice).unwrap().cursor,
            Some(CursorPosition { x: 1.0, y: 2.0 })
        );
    }

    #[test]
    fn test_disconnect_keeps_participant_and_votes() {
        // Arrange
        let mut room = empty_room();
        let alice = admit(&mut room, "Alice", Role::LeadDetective);
        let bob = admit(&mut room, "Bob", Role::TechnicalAnalyst);
        let hypothesis = room
            .submit_hypothesis(alice, "h1".to_owned(), draft("Pool"), Uuid::new_v4(), &clock())
            .unwrap();
        room.cast_vote(&hypothesis.id, bob, Uuid::new_v4(), &clock())
            .unwrap();

        // Act
        let left = room
            .mark_disconnected(bob, Uuid::new_v4(), &clock())
            .unwrap();

        // Assert
        assert!(!left.online);
        assert_eq!(room.participants().len(), 2);
        assert_eq!(room.online_count(), 1);
        assert_eq!(room.hypothesis("h1").unwrap().voters, vec![alice, bob]);

        // Reconnect
        let back = room.mark_connected(bob, Uuid::new_v4(), &clock()).unwrap();
        assert!(back.online);
        assert_eq!(room.online_count(), 2);
    }

    #[test]
    fn test_mark_connected_is_silent_for_an_online_participant() {
        // Arrange
        let mut room = empty_room();
        let bob = admit(&mut room, "Bob", Role::TechnicalAnalyst);
        room.take_uncommitted_events();

        // Act
        let participant = room.mark_connected(bob, Uuid::new_v4(), &clock()).unwrap();

        // Assert
        assert!(participant.online);
        assert!(room.take_uncommitted_events().is_empty());
    }

    #[test]
    fn test_mark_connected_rejects_unknown_participant() {
        let mut room = empty_room();
        let unknown = Uuid::new_v4();
        let result = room.mark_connected(unknown, Uuid::new_v4(), &clock());
        assert!(matches!(result, Err(DomainError::ParticipantNotFound(id)) if id == unknown));
    }

    #[test]
    fn test_advance_phase_rejects_skipping() {
        // Arrange
        let mut room = empty_room();
        let alice = admit(&mut room, "Alice", Role::LeadDetective);

        // Act
        let result =
            room.advance_phase(alice, Phase::TheoryDevelopment, Uuid::new_v4(), &clock());

        // Assert
        match result {
            Err(DomainError::InvalidTransition { from, to }) => {
                assert_eq!(from, "briefing");
                assert_eq!(to, "theory_development");
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
        assert_eq!(room.phase(), Phase::Briefing);
    }

    #[test]
    fn test_advance_phase_rejects_backwards_and_same_phase() {
        let mut room = empty_room();
        let alice = admit(&mut room, "Alice", Role::LeadDetective);
        advance_to(&mut room, alice, Phase::TheoryDevelopment);

        for target in [Phase::Briefing, Phase::TheoryDevelopment] {
            let result = room.advance_phase(alice, target, Uuid::new_v4(), &clock());
            assert!(matches!(result, Err(DomainError::InvalidTransition { .. })));
        }
        assert_eq!(room.phase(), Phase::TheoryDevelopment);
    }

    #[test]
    fn test_advance_phase_requires_lead_detective_when_not_alone() {
        // Arrange
        let mut room = empty_room();
        admit(&mut room, "Alice", Role::LeadDetective);
        let bob = admit(&mut room, "Bob", Role::TechnicalAnalyst);

        // Act
        let result = room.advance_phase(bob, Phase::EvidenceReview, Uuid::new_v4(), &clock());

        // Assert
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
        assert_eq!(room.phase(), Phase::Briefing);
    }

    #[test]
    fn test_solo_participant_advances_through_every_phase() {
        // Arrange
        let mut room = empty_room();
        let solo = admit(&mut room, "Sam", Role::WitnessInterviewer);
        advance_to(&mut room, solo, Phase::TheoryDevelopment);
        room.submit_hypothesis(solo, "h1".to_owned(), draft("Pool"), Uuid::new_v4(), &clock())
            .unwrap();

        // Act
        advance_to(&mut room, solo, Phase::Postmortem);

        // Assert
        assert_eq!(room.phase(), Phase::Postmortem);
        assert_eq!(room.consensus_hypothesis().unwrap().id, "h1");
        assert_eq!(room.completed_at(), Some(clock().0));
        let result = room.advance_phase(solo, Phase::Postmortem, Uuid::new_v4(), &clock());
        assert!(matches!(result, Err(DomainError::InvalidTransition { .. })));
    }

    #[test]
    fn test_consensus_gate_reports_exact_counts() {
        // Arrange: five online participants, leading hypothesis with two votes.
        let mut room = empty_room();
        let lead = admit(&mut room, "Lead", Role::LeadDetective);
        let others: Vec<Uuid> = ["B", "C", "D", "E"]
            .iter()
            .map(|name| admit(&mut room, name, Role::TechnicalAnalyst))
            .collect();
        advance_to(&mut room, lead, Phase::TheoryDevelopment);
        room.submit_hypothesis(lead, "h1".to_owned(), draft("Pool"), Uuid::new_v4(), &clock())
            .unwrap();
        room.cast_vote("h1", others[0], Uuid::new_v4(), &clock())
            .unwrap();
        advance_to(&mut room, lead, Phase::Investigation);

        // Act
        let result = room.advance_phase(lead, Phase::Conclusion, Uuid::new_v4(), &clock());

        // Assert
        match result {
            Err(DomainError::ConsensusNotReached { current, required }) => {
                assert_eq!(current, 2);
                assert_eq!(required, 3);
            }
            other => panic!("expected ConsensusNotReached, got {other:?}"),
        }
        assert_eq!(room.phase(), Phase::Investigation);

        // A third vote carries the gate.
        room.cast_vote("h1", others[1], Uuid::new_v4(), &clock())
            .unwrap();
        room.advance_phase(lead, Phase::Conclusion, Uuid::new_v4(), &clock())
            .unwrap();
        assert_eq!(room.phase(), Phase::Conclusion);
    }

    #[test]
    fn test_consensus_gate_counts_only_online_participants() {
        // Arrange
        let mut room = empty_room();
        let lead = admit(&mut room, "Lead", Role::LeadDetective);
        let bob = admit(&mut room, "Bob", Role::TechnicalAnalyst);
        let carol = admit(&mut room, "Carol", Role::TechnicalAnalyst);
        advance_to(&mut room, lead, Phase::TheoryDevelopment);
        room.submit_hypothesis(lead, "h1".to_owned(), draft("Pool"), Uuid::new_v4(), &clock())
            .unwrap();
        advance_to(&mut room, lead, Phase::Investigation);
        room.mark_disconnected(bob, Uuid::new_v4(), &clock())
            .unwrap();
        room.mark_disconnected(carol, Uuid::new_v4(), &clock())
            .unwrap();

        // Act
        let result = room.advance_phase(lead, Phase::Conclusion, Uuid::new_v4(), &clock());

        // Assert: one online participant, one vote required.
        assert!(result.is_ok());
    }

    #[test]
    fn test_consensus_gate_rejects_empty_hypothesis_list() {
        // Arrange
        let mut room = empty_room();
        let lead = admit(&mut room, "Lead", Role::LeadDetective);
        advance_to(&mut room, lead, Phase::Investigation);

        // Act
        let result = room.advance_phase(lead, Phase::Conclusion, Uuid::new_v4(), &clock());

        // Assert
        assert!(matches!(
            result,
            Err(DomainError::ConsensusNotReached {
                current: 0,
                required: 1
            })
        ));
    }

    #[test]
    fn test_submit_hypothesis_auto_votes_for_proposer() {
        // Arrange
        let mut room = empty_room();
        let alice = admit(&mut room, "Alice", Role::LeadDetective);

        // Act
        let hypothesis = room
            .submit_hypothesis(alice, "h1".to_owned(), draft("Pool"), Uuid::new_v4(), &clock())
            .unwrap();

        // Assert
        assert_eq!(hypothesis.voters, vec![alice]);
        assert_eq!(hypothesis.confidence, 50);
        assert_eq!(
            hypothesis.proposed_by,
            ProposedBy::Participant {
                participant_id: alice,
                name: "Alice".to_owned()
            }
        );
        assert_eq!(room.hypotheses().len(), 1);
    }

    #[test]
    fn test_submit_hypothesis_rejects_unknown_participant_and_blank_draft() {
        let mut room = empty_room();
        let alice = admit(&mut room, "Alice", Role::LeadDetective);

        let unknown = room.submit_hypothesis(
            Uuid::new_v4(),
            "h1".to_owned(),
            draft("Pool"),
            Uuid::new_v4(),
            &clock(),
        );
        assert!(matches!(unknown, Err(DomainError::ParticipantNotFound(_))));

        let blank = room.submit_hypothesis(alice, "h1".to_owned(), draft(" "), Uuid::new_v4(), &clock());
        assert!(matches!(blank, Err(DomainError::Validation(_))));
        assert!(room.hypotheses().is_empty());
    }

    #[test]
    fn test_cast_vote_is_idempotent() {
        // Arrange
        let mut room = empty_room();
        let alice = admit(&mut room, "Alice", Role::LeadDetective);
        let bob = admit(&mut room, "Bob", Role::TechnicalAnalyst);
        room.submit_hypothesis(alice, "h1".to_owned(), draft("Pool"), Uuid::new_v4(), &clock())
            .unwrap();
        room.take_uncommitted_events();

        // Act
        let first = room.cast_vote("h1", bob, Uuid::new_v4(), &clock()).unwrap();
        let second = room.cast_vote("h1", bob, Uuid::new_v4(), &clock()).unwrap();

        // Assert
        assert!(first.recorded);
        assert!(!second.recorded);
        assert_eq!(second.voters, vec![alice, bob]);
        assert_eq!(room.uncommitted_events().len(), 1);
        assert_eq!(room.hypothesis("h1").unwrap().vote_count(), 2);
    }

    #[test]
    fn test_cast_vote_rejects_unknown_ids() {
        let mut room = empty_room();
        let alice = admit(&mut room, "Alice", Role::LeadDetective);
        room.submit_hypothesis(alice, "h1".to_owned(), draft("Pool"), Uuid::new_v4(), &clock())
            .unwrap();

        let missing_hypothesis = room.cast_vote("h9", alice, Uuid::new_v4(), &clock());
        assert!(matches!(
            missing_hypothesis,
            Err(DomainError::HypothesisNotFound(id)) if id == "h9"
        ));

        let missing_participant = room.cast_vote("h1", Uuid::new_v4(), Uuid::new_v4(), &clock());
        assert!(matches!(
            missing_participant,
            Err(DomainError::ParticipantNotFound(_))
        ));
    }

    #[test]
    fn test_attach_validation_last_write_wins() {
        // Arrange
        let mut room = empty_room();
        let alice = admit(&mut room, "Alice", Role::LeadDetective);
        room.submit_hypothesis(alice, "h1".to_owned(), draft("Pool"), Uuid::new_v4(), &clock())
            .unwrap();
        let annotation = |score: u8| ValidationAnnotation {
            score,
            reasoning: format!("score {score}"),
            supporting_patterns: Vec::new(),
            contradictions: Vec::new(),
        };

        // Act
        room.attach_validation("h1", annotation(40), Uuid::new_v4(), &clock())
            .unwrap();
        room.attach_validation("h1", annotation(90), Uuid::new_v4(), &clock())
            .unwrap();

        // Assert
        assert_eq!(
            room.hypothesis("h1").unwrap().validation.as_ref().unwrap().score,
            90
        );
    }

    #[test]
    fn test_mark_evidence_reviewed_rejects_unknown_id_without_event() {
        let mut room = empty_room();
        let result = room.mark_evidence_reviewed("evid-9", Uuid::new_v4(), &clock());
        assert!(matches!(result, Err(DomainError::EvidenceNotFound(_))));
        assert!(room.uncommitted_events().is_empty());
    }

    #[test]
    fn test_record_summary_requires_consensus_and_keeps_first_document() {
        // Arrange
        let mut room = empty_room();
        let solo = admit(&mut room, "Sam", Role::LeadDetective);
        let document = |title: &str| SummaryDocument {
            title: title.to_owned(),
            summary: String::new(),
            timeline: String::new(),
            root_cause: String::new(),
            impact: String::new(),
            resolution: String::new(),
            action_items: Vec::new(),
            lessons: Vec::new(),
        };

        // Act
        let early = room.record_summary(document("early"), Uuid::new_v4(), &clock());
        advance_to(&mut room, solo, Phase::TheoryDevelopment);
        room.submit_hypothesis(solo, "h1".to_owned(), draft("Pool"), Uuid::new_v4(), &clock())
            .unwrap();
        advance_to(&mut room, solo, Phase::Conclusion);
        let first = room
            .record_summary(document("first"), Uuid::new_v4(), &clock())
            .unwrap();
        let second = room
            .record_summary(document("second"), Uuid::new_v4(), &clock())
            .unwrap();

        // Assert
        assert!(matches!(early, Err(DomainError::Validation(_))));
        assert_eq!(first.title, "first");
        assert_eq!(second.title, "first");
        assert_eq!(room.summary().unwrap().title, "first");
    }
}
