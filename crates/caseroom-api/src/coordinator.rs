//! Session coordinator: binds HTTP requests and realtime connections to the
//! room command handlers and the external collaborators.
//!
//! Collaborator calls never run under a room lock. Each is bounded by the
//! configured timeout and falls back to the local adapter on failure.

use std::sync::PoisonError;

use caseroom_core::error::DomainError;
use caseroom_integrations::fallback::{CannedAnalyst, SampleIncidentSource, TemplateSummaryWriter};
use caseroom_integrations::guard::with_fallback;
use caseroom_session::application::command_handlers;
use caseroom_session::application::query_handlers::RoomView;
use caseroom_session::domain::commands::{
    AdvancePhase, AttachValidation, CastVote, ConnectParticipant, CreateRoom,
    DisconnectConnection, JoinRoom, MarkEvidenceReviewed, MoveCursor, RecordSummary,
    ReplaceEvidence, SubmitHypothesis,
};
use caseroom_session::domain::hypothesis::{Hypothesis, ValidationAnnotation};
use caseroom_session::domain::incident::{IncidentRecord, SummaryDocument};
use caseroom_session::domain::participant::{Participant, Role};
use caseroom_session::presence::{ConnectionId, EventSink};
use caseroom_session::protocol::{ClientCommand, ServerEvent};
use caseroom_session::store::RoomHandle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;

/// A newly opened room with the incident it investigates.
#[derive(Debug)]
pub struct OpenedRoom {
    /// Handle of the stored room.
    pub handle: RoomHandle,
    /// The incident record cached on the room.
    pub incident: IncidentRecord,
}

/// Fetches and analyzes the incident, then opens a room for it.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a blank incident id or
/// `DomainError::Infrastructure` if no room code could be allocated.
pub async fn open_room(
    state: &AppState,
    incident_id: &str,
    auto_created: bool,
) -> Result<OpenedRoom, DomainError> {
    let incident_id = incident_id.trim();
    if incident_id.is_empty() {
        return Err(DomainError::Validation("incident_id must not be blank".into()));
    }
    let limit = state.collaborators.timeout;

    let incident = with_fallback(
        "incident",
        limit,
        state.collaborators.incidents.fetch_incident(incident_id),
        || SampleIncidentSource::incident(incident_id),
    )
    .await;
    let analysis = with_fallback(
        "analysis",
        limit,
        state.collaborators.analyst.analyze_incident(&incident),
        CannedAnalyst::analysis,
    )
    .await;

    let command = CreateRoom {
        correlation_id: Uuid::new_v4(),
        incident_id: incident_id.to_owned(),
        incident: Some(incident.clone()),
        analysis: Some(analysis),
        auto_created,
    };
    let handle = {
        let mut rng = state.rng.lock().unwrap_or_else(PoisonError::into_inner);
        command_handlers::handle_create_room(
            &command,
            state.clock.as_ref(),
            &mut *rng,
            &state.store,
        )?
    };
    Ok(OpenedRoom { handle, incident })
}

/// Admits a participant to the room with `code`.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound`, `DomainError::NameTaken`, or
/// `DomainError::Validation`.
pub async fn join_room(
    state: &AppState,
    code: &str,
    name: &str,
    role: Option<Role>,
) -> Result<(Participant, RoomView), DomainError> {
    let command = JoinRoom {
        correlation_id: Uuid::new_v4(),
        code: code.to_owned(),
        name: name.to_owned(),
        role,
    };
    command_handlers::handle_join_room(&command, state.clock.as_ref(), &state.store, &state.broadcaster)
        .await
}

/// Generates the room's summary document once consensus is reached.
/// Later calls, including ones that arrive while the writer is still
/// running, return the stored document without asking the writer again.
///
/// # Errors
///
/// Returns `DomainError::Validation` before consensus or
/// `DomainError::RoomNotFound`.
pub async fn generate_summary(state: &AppState, room_id: Uuid) -> Result<SummaryDocument, DomainError> {
    let handle = state.store.get(room_id)?;
    let _generating = handle.lock_summary().await;
    let (incident, hypothesis, evidence) = {
        let room = handle.lock().await;
        if let Some(summary) = room.summary() {
            return Ok(summary.clone());
        }
        let hypothesis = room.consensus_hypothesis().cloned().ok_or_else(|| {
            DomainError::Validation("the room has not reached consensus yet".into())
        })?;
        let incident = room
            .incident()
            .cloned()
            .unwrap_or_else(|| SampleIncidentSource::incident(room.incident_id()));
        (incident, hypothesis, room.evidence().to_vec())
    };

    let summary = with_fallback(
        "summary",
        state.collaborators.timeout,
        state
            .collaborators
            .summaries
            .generate_summary(&incident, &hypothesis, &evidence),
        || TemplateSummaryWriter::document(&incident, &hypothesis),
    )
    .await;

    let command = RecordSummary {
        correlation_id: Uuid::new_v4(),
        room_id,
        summary,
    };
    command_handlers::handle_record_summary(&command, state.clock.as_ref(), &state.store, &state.broadcaster)
        .await
}

/// Scores a hypothesis against the room's current evidence and attaches
/// the annotation.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound` or `DomainError::HypothesisNotFound`.
pub async fn validate_hypothesis(
    state: &AppState,
    room_id: Uuid,
    hypothesis: &Hypothesis,
) -> Result<ValidationAnnotation, DomainError> {
    let handle = state.store.get(room_id)?;
    let evidence = handle.lock().await.evidence().to_vec();

    let validation = with_fallback(
        "analysis",
        state.collaborators.timeout,
        state
            .collaborators
            .analyst
            .validate_hypothesis(hypothesis, &evidence),
        CannedAnalyst::validation,
    )
    .await;

    let command = AttachValidation {
        correlation_id: Uuid::new_v4(),
        room_id,
        hypothesis_id: hypothesis.id.clone(),
        validation: validation.clone(),
    };
    command_handlers::handle_attach_validation(&command, state.clock.as_ref(), &state.store, &state.broadcaster)
        .await?;
    Ok(validation)
}

fn spawn_validation(state: AppState, room_id: Uuid, hypothesis: Hypothesis) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = validate_hypothesis(&state, room_id, &hypothesis).await {
            warn!(%room_id, hypothesis_id = %hypothesis.id, error = %err, "validation not attached");
        }
    })
}

/// Registers a new realtime connection and returns its id.
pub fn connection_opened(state: &AppState, sink: EventSink) -> ConnectionId {
    let connection_id = Uuid::new_v4();
    state.presence.register(connection_id, sink);
    debug!(%connection_id, "connection opened");
    connection_id
}

/// Forgets a closed connection, marking its participant offline if it was
/// their last one.
pub async fn connection_closed(state: &AppState, connection_id: ConnectionId) {
    let command = DisconnectConnection {
        correlation_id: Uuid::new_v4(),
        connection_id,
    };
    match command_handlers::handle_disconnect_connection(
        &command,
        state.clock.as_ref(),
        &state.store,
        &state.presence,
        &state.broadcaster,
    )
    .await
    {
        Ok(_) => debug!(%connection_id, "connection closed"),
        Err(err) => warn!(%connection_id, error = %err, "disconnect cleanup failed"),
    }
}

/// Executes one client command. A rejection is reported to the issuing
/// connection only.
pub async fn dispatch(state: &AppState, connection_id: ConnectionId, command: ClientCommand) {
    let name = command.name();
    if let Err(err) = execute(state, connection_id, command).await {
        info!(%connection_id, command = name, error = err.code(), "command rejected");
        state
            .broadcaster
            .emit_to_connection(connection_id, ServerEvent::rejected(name, &err));
    }
}

/// Reports an unparseable client message to the issuing connection.
pub fn reject_malformed(state: &AppState, connection_id: ConnectionId, reason: &str) {
    let err = DomainError::Validation(format!("malformed message: {reason}"));
    state
        .broadcaster
        .emit_to_connection(connection_id, ServerEvent::rejected("unknown", &err));
}

/// The participant a connection acts as, if it is attached to `room_id`.
fn acting_participant(
    state: &AppState,
    connection_id: ConnectionId,
    room_id: Uuid,
) -> Result<Uuid, DomainError> {
    state
        .presence
        .attachment(connection_id)
        .filter(|attachment| attachment.room_id == room_id)
        .map(|attachment| attachment.participant_id)
        .ok_or(DomainError::NotAttached(room_id))
}

async fn execute(
    state: &AppState,
    connection_id: ConnectionId,
    command: ClientCommand,
) -> Result<(), DomainError> {
    let correlation_id = Uuid::new_v4();
    let clock = state.clock.as_ref();

    match command {
        ClientCommand::JoinRoom {
            room_id,
            participant_id,
        } => {
            let command = ConnectParticipant {
                correlation_id,
                room_id,
                participant_id,
                connection_id,
            };
            command_handlers::handle_connect_participant(
                &command,
                clock,
                &state.store,
                &state.presence,
                &state.broadcaster,
            )
            .await?;
        }
        ClientCommand::MoveCursor { room_id, position } => {
            let command = MoveCursor {
                correlation_id,
                room_id,
                participant_id: acting_participant(state, connection_id, room_id)?,
                origin: connection_id,
                position,
            };
            command_handlers::handle_move_cursor(&command, clock, &state.store, &state.broadcaster)
                .await?;
        }
        ClientCommand::AdvancePhase {
            room_id,
            target_phase,
        } => {
            let command = AdvancePhase {
                correlation_id,
                room_id,
                participant_id: acting_participant(state, connection_id, room_id)?,
                target_phase,
            };
            command_handlers::handle_advance_phase(&command, clock, &state.store, &state.broadcaster)
                .await?;
        }
        ClientCommand::ReplaceEvidence { room_id, items } => {
            acting_participant(state, connection_id, room_id)?;
            let command = ReplaceEvidence {
                correlation_id,
                room_id,
                items,
            };
            command_handlers::handle_replace_evidence(&command, clock, &state.store, &state.broadcaster)
                .await?;
        }
        ClientCommand::MarkReviewed {
            room_id,
            evidence_id,
        } => {
            acting_participant(state, connection_id, room_id)?;
            let command = MarkEvidenceReviewed {
                correlation_id,
                room_id,
                evidence_id,
            };
            command_handlers::handle_mark_evidence_reviewed(
                &command,
                clock,
                &state.store,
                &state.broadcaster,
            )
            .await?;
        }
        ClientCommand::SubmitHypothesis {
            room_id,
            hypothesis,
        } => {
            let command = SubmitHypothesis {
                correlation_id,
                room_id,
                participant_id: acting_participant(state, connection_id, room_id)?,
                draft: hypothesis,
            };
            let hypothesis =
                command_handlers::handle_submit_hypothesis(&command, clock, &state.store, &state.broadcaster)
                    .await?;
            spawn_validation(state.clone(), room_id, hypothesis);
        }
        ClientCommand::CastVote {
            room_id,
            hypothesis_id,
        } => {
            let command = CastVote {
                correlation_id,
                room_id,
                participant_id: acting_participant(state, connection_id, room_id)?,
                hypothesis_id,
            };
            let outcome =
                command_handlers::handle_cast_vote(&command, clock, &state.store, &state.broadcaster)
                    .await?;
            if !outcome.recorded {
                state.broadcaster.emit_to_connection(
                    connection_id,
                    ServerEvent::HypothesisVoted {
                        hypothesis_id: command.hypothesis_id,
                        voters: outcome.voters,
                    },
                );
            }
        }
    }
    Ok(())
}
