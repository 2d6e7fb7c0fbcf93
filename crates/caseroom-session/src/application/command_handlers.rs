//! Command handlers for the session context.
//!
//! Each handler locks the target room, runs the aggregate method, then
//! drains and broadcasts the resulting events before releasing the lock, so
//! subscribers observe events in the order the room accepted them.

use caseroom_core::aggregate::AggregateRoot;
use caseroom_core::clock::Clock;
use caseroom_core::command::Command;
use caseroom_core::error::DomainError;
use caseroom_core::rng::DeterministicRng;
use tracing::info;
use uuid::Uuid;

use crate::application::query_handlers::RoomView;
use crate::broadcast::Broadcaster;
use crate::domain::aggregates::{Room, RoomSeed, VoteOutcome};
use crate::domain::commands::{
    AdvancePhase, AttachValidation, CastVote, ConnectParticipant, CreateRoom,
    DisconnectConnection, JoinRoom, MarkEvidenceReviewed, MoveCursor, RecordSummary,
    ReplaceEvidence, SubmitHypothesis,
};
use crate::domain::events::RoomEvent;
use crate::domain::hypothesis::Hypothesis;
use crate::domain::incident::SummaryDocument;
use crate::domain::participant::Participant;
use crate::domain::phase::Phase;
use crate::presence::{Attachment, PresenceTracker};
use crate::protocol::ServerEvent;
use crate::store::{RoomHandle, RoomStore};

fn publish(room: &mut Room, broadcaster: &Broadcaster) -> Vec<RoomEvent> {
    let events = room.take_uncommitted_events();
    for event in &events {
        broadcaster.emit_to_room(room.id, &ServerEvent::from_room_event(&event.kind));
    }
    events
}

async fn execute<C, T>(
    command: &C,
    room_id: Uuid,
    store: &RoomStore,
    broadcaster: &Broadcaster,
    operation: impl FnOnce(&mut Room) -> Result<T, DomainError>,
) -> Result<T, DomainError>
where
    C: Command,
{
    let handle = store.get(room_id)?;
    let mut room = handle.lock().await;
    let outcome = operation(&mut room)?;
    let events = publish(&mut room, broadcaster);
    info!(
        correlation_id = %command.correlation_id(),
        command = command.command_type(),
        %room_id,
        events = events.len(),
        "command accepted"
    );
    Ok(outcome)
}

/// Handles the `CreateRoom` command: seeds evidence and hypotheses from the
/// analysis and registers the room.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if no room code could be allocated.
pub fn handle_create_room(
    command: &CreateRoom,
    clock: &dyn Clock,
    rng: &mut dyn DeterministicRng,
    store: &RoomStore,
) -> Result<RoomHandle, DomainError> {
    let (evidence, hypotheses) = command
        .analysis
        .as_ref()
        .map(|analysis| (analysis.seed_evidence(clock.now()), analysis.seed_hypotheses()))
        .unwrap_or_default();
    let seed = RoomSeed {
        incident_id: command.incident_id.clone(),
        incident: command.incident.clone(),
        analysis: command.analysis.clone(),
        evidence,
        hypotheses,
        auto_created: command.auto_created,
    };
    let handle = store.create_room(seed, rng, clock)?;
    info!(
        correlation_id = %command.correlation_id,
        room_id = %handle.id,
        incident_id = %command.incident_id,
        "room opened for incident"
    );
    Ok(handle)
}

/// Handles the `JoinRoom` command: admits a participant by name and returns
/// them with a full snapshot.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound`, `DomainError::NameTaken`, or
/// `DomainError::Validation` for a blank name.
pub async fn handle_join_room(
    command: &JoinRoom,
    clock: &dyn Clock,
    store: &RoomStore,
    broadcaster: &Broadcaster,
) -> Result<(Participant, RoomView), DomainError> {
    let handle = store.find_by_code(&command.code)?;
    execute(command, handle.id, store, broadcaster, |room| {
        let participant = room.admit_participant(
            Uuid::new_v4(),
            &command.name,
            command.role.unwrap_or_default(),
            command.correlation_id,
            clock,
        )?;
        Ok((participant, RoomView::from_room(room)))
    })
    .await
}

/// Handles the `ConnectParticipant` command: marks the participant online,
/// subscribes the connection to the room, tells the others and sends the
/// connection a snapshot.
///
/// A connection already attached elsewhere is released from its previous
/// room first.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound` or `DomainError::ParticipantNotFound`.
pub async fn handle_connect_participant(
    command: &ConnectParticipant,
    clock: &dyn Clock,
    store: &RoomStore,
    presence: &PresenceTracker,
    broadcaster: &Broadcaster,
) -> Result<RoomView, DomainError> {
    let attachment = Attachment {
        room_id: command.room_id,
        participant_id: command.participant_id,
    };
    let handle = store.get(command.room_id)?;

    if let Some(previous) = presence
        .attachment(command.connection_id)
        .filter(|previous| *previous != attachment)
    {
        {
            let room = handle.lock().await;
            if room.participant(command.participant_id).is_none() {
                return Err(DomainError::ParticipantNotFound(command.participant_id));
            }
        }
        presence.detach(command.connection_id);
        release_participant(previous, command.correlation_id, clock, store, presence, broadcaster)
            .await?;
    }

    let mut room = handle.lock().await;
    room.mark_connected(command.participant_id, command.correlation_id, clock)?;
    presence.attach(command.connection_id, attachment);
    for event in room.take_uncommitted_events() {
        broadcaster.emit_to_others(
            room.id,
            command.connection_id,
            &ServerEvent::from_room_event(&event.kind),
        );
    }
    let view = RoomView::from_room(&room);
    broadcaster.emit_to_connection(
        command.connection_id,
        ServerEvent::RoomSnapshot {
            room: Box::new(view.clone()),
        },
    );
    info!(
        correlation_id = %command.correlation_id,
        room_id = %command.room_id,
        participant_id = %command.participant_id,
        connection_id = %command.connection_id,
        "participant connected"
    );
    Ok(view)
}

/// Handles the `DisconnectConnection` command: forgets the connection and,
/// if it was the participant's last one, marks them offline and tells the
/// rest of the room.
///
/// Returns the participant that went offline, if any.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound` if the attached room has vanished.
pub async fn handle_disconnect_connection(
    command: &DisconnectConnection,
    clock: &dyn Clock,
    store: &RoomStore,
    presence: &PresenceTracker,
    broadcaster: &Broadcaster,
) -> Result<Option<Participant>, DomainError> {
    let Some(attachment) = presence.on_disconnect(command.connection_id) else {
        return Ok(None);
    };
    release_participant(attachment, command.correlation_id, clock, store, presence, broadcaster)
        .await
}

async fn release_participant(
    attachment: Attachment,
    correlation_id: Uuid,
    clock: &dyn Clock,
    store: &RoomStore,
    presence: &PresenceTracker,
    broadcaster: &Broadcaster,
) -> Result<Option<Participant>, DomainError> {
    let handle = store.get(attachment.room_id)?;
    let mut room = handle.lock().await;
    if presence.is_participant_connected(attachment.room_id, attachment.participant_id) {
        return Ok(None);
    }
    let participant = room.mark_disconnected(attachment.participant_id, correlation_id, clock)?;
    publish(&mut room, broadcaster);
    info!(
        %correlation_id,
        room_id = %attachment.room_id,
        participant_id = %attachment.participant_id,
        "participant went offline"
    );
    Ok(Some(participant))
}

/// Handles the `MoveCursor` command. The originating connection does not
/// receive its own echo.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound` or `DomainError::ParticipantNotFound`.
pub async fn handle_move_cursor(
    command: &MoveCursor,
    clock: &dyn Clock,
    store: &RoomStore,
    broadcaster: &Broadcaster,
) -> Result<(), DomainError> {
    let handle = store.get(command.room_id)?;
    let mut room = handle.lock().await;
    room.move_cursor(
        command.participant_id,
        command.position,
        command.correlation_id,
        clock,
    )?;
    for event in room.take_uncommitted_events() {
        broadcaster.emit_to_others(
            room.id,
            command.origin,
            &ServerEvent::from_room_event(&event.kind),
        );
    }
    Ok(())
}

/// Handles the `AdvancePhase` command.
///
/// # Errors
///
/// Returns `DomainError::InvalidTransition`, `DomainError::Forbidden`,
/// `DomainError::ConsensusNotReached`, or a lookup error.
pub async fn handle_advance_phase(
    command: &AdvancePhase,
    clock: &dyn Clock,
    store: &RoomStore,
    broadcaster: &Broadcaster,
) -> Result<Phase, DomainError> {
    execute(command, command.room_id, store, broadcaster, |room| {
        room.advance_phase(
            command.participant_id,
            command.target_phase,
            command.correlation_id,
            clock,
        )
    })
    .await
}

/// Handles the `ReplaceEvidence` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an invalid list or
/// `DomainError::RoomNotFound`.
pub async fn handle_replace_evidence(
    command: &ReplaceEvidence,
    clock: &dyn Clock,
    store: &RoomStore,
    broadcaster: &Broadcaster,
) -> Result<(), DomainError> {
    execute(command, command.room_id, store, broadcaster, |room| {
        room.replace_evidence(command.items.clone(), command.correlation_id, clock)
    })
    .await
}

/// Handles the `MarkEvidenceReviewed` command.
///
/// # Errors
///
/// Returns `DomainError::EvidenceNotFound` or `DomainError::RoomNotFound`.
pub async fn handle_mark_evidence_reviewed(
    command: &MarkEvidenceReviewed,
    clock: &dyn Clock,
    store: &RoomStore,
    broadcaster: &Broadcaster,
) -> Result<(), DomainError> {
    execute(command, command.room_id, store, broadcaster, |room| {
        room.mark_evidence_reviewed(&command.evidence_id, command.correlation_id, clock)
    })
    .await
}

/// Handles the `SubmitHypothesis` command.
///
/// # Errors
///
/// Returns `DomainError::Validation`, `DomainError::ParticipantNotFound`, or
/// `DomainError::RoomNotFound`.
pub async fn handle_submit_hypothesis(
    command: &SubmitHypothesis,
    clock: &dyn Clock,
    store: &RoomStore,
    broadcaster: &Broadcaster,
) -> Result<Hypothesis, DomainError> {
    let hypothesis_id = format!("theory-{}", Uuid::new_v4());
    execute(command, command.room_id, store, broadcaster, |room| {
        room.submit_hypothesis(
            command.participant_id,
            hypothesis_id,
            command.draft.clone(),
            command.correlation_id,
            clock,
        )
    })
    .await
}

/// Handles the `CastVote` command. A repeated vote is accepted without a
/// broadcast.
///
/// # Errors
///
/// Returns `DomainError::HypothesisNotFound`,
/// `DomainError::ParticipantNotFound`, or `DomainError::RoomNotFound`.
pub async fn handle_cast_vote(
    command: &CastVote,
    clock: &dyn Clock,
    store: &RoomStore,
    broadcaster: &Broadcaster,
) -> Result<VoteOutcome, DomainError> {
    execute(command, command.room_id, store, broadcaster, |room| {
        room.cast_vote(
            &command.hypothesis_id,
            command.participant_id,
            command.correlation_id,
            clock,
        )
    })
    .await
}

/// Handles the `AttachValidation` command.
///
/// # Errors
///
/// Returns `DomainError::HypothesisNotFound` or `DomainError::RoomNotFound`.
pub async fn handle_attach_validation(
    command: &AttachValidation,
    clock: &dyn Clock,
    store: &RoomStore,
    broadcaster: &Broadcaster,
) -> Result<(), DomainError> {
    execute(command, command.room_id, store, broadcaster, |room| {
        room.attach_validation(
            &command.hypothesis_id,
            command.validation.clone(),
            command.correlation_id,
            clock,
        )
    })
    .await
}

/// Handles the `RecordSummary` command. Returns the stored document, which
/// is the earlier one if the room already had a summary.
///
/// # Errors
///
/// Returns `DomainError::Validation` before consensus or
/// `DomainError::RoomNotFound`.
pub async fn handle_record_summary(
    command: &RecordSummary,
    clock: &dyn Clock,
    store: &RoomStore,
    broadcaster: &Broadcaster,
) -> Result<SummaryDocument, DomainError> {
    execute(command, command.room_id, store, broadcaster, |room| {
        room.record_summary(command.summary.clone(), command.correlation_id, clock)
    })
    .await
}
