//! Routes for creating, joining and inspecting case rooms.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use caseroom_session::application::query_handlers::{self, LeadingHypothesisView, RoomView};
use caseroom_session::domain::incident::SummaryDocument;
use caseroom_session::domain::participant::Role;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::coordinator;
use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    /// External incident to investigate.
    pub incident_id: String,
}

/// Response body for POST /.
#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    /// The new room.
    pub room_id: Uuid,
    /// Shareable join code.
    pub code: String,
    /// Link participants follow to join.
    pub join_url: String,
}

/// Request body for POST /join.
#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    /// Room code, any case.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Requested role; defaults to technical analyst.
    #[serde(default)]
    pub role: Option<Role>,
}

/// Response body for POST /join.
#[derive(Debug, Serialize)]
pub struct JoinRoomResponse {
    /// Identifier the participant presents when connecting.
    pub participant_id: Uuid,
    /// The joined room.
    pub room_id: Uuid,
    /// Snapshot taken right after admission.
    pub room: RoomView,
}

/// POST /
#[instrument(skip(state, request), fields(incident_id = %request.incident_id))]
async fn create_room(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateRoomRequest>,
) -> Result<Json<CreateRoomResponse>, ApiError> {
    let opened = coordinator::open_room(&state, &request.incident_id, false).await?;

    info!(room_id = %opened.handle.id, code = %opened.handle.code, "room created");

    Ok(Json(CreateRoomResponse {
        room_id: opened.handle.id,
        join_url: state.config.join_url(&opened.handle.code),
        code: opened.handle.code,
    }))
}

/// POST /join
#[instrument(skip(state, request), fields(code = %request.code))]
async fn join_room(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<JoinRoomRequest>,
) -> Result<Json<JoinRoomResponse>, ApiError> {
    let (participant, room) =
        coordinator::join_room(&state, &request.code, &request.name, request.role).await?;

    Ok(Json(JoinRoomResponse {
        participant_id: participant.id,
        room_id: room.room_id,
        room,
    }))
}

/// GET /{room_id}
#[instrument(skip(state))]
async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<RoomView>, ApiError> {
    let view = query_handlers::get_room_by_id(room_id, &state.store).await?;
    Ok(Json(view))
}

/// GET /{room_id}/leading-hypothesis
#[instrument(skip(state))]
async fn get_leading_hypothesis(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<LeadingHypothesisView>, ApiError> {
    let view = query_handlers::get_leading_hypothesis(room_id, &state.store).await?;
    Ok(Json(view))
}

/// POST /{room_id}/summary
#[instrument(skip(state))]
async fn generate_summary(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<SummaryDocument>, ApiError> {
    let summary = coordinator::generate_summary(&state, room_id).await?;
    Ok(Json(summary))
}

/// Returns the router for the room resources.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_room))
        .route("/join", post(join_room))
        .route("/{room_id}", get(get_room))
        .route("/{room_id}/leading-hypothesis", get(get_leading_hypothesis))
        .route("/{room_id}/summary", post(generate_summary))
}
