//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use caseroom_api::config::AppConfig;
use caseroom_api::coordinator;
use caseroom_api::routes;
use caseroom_api::state::{AppState, Collaborators};
use caseroom_core::clock::Clock;
use caseroom_core::rng::DeterministicRng;
use caseroom_session::presence::ConnectionId;
use caseroom_session::protocol::{ClientCommand, ServerEvent};
use caseroom_test_support::{FixedClock, MockRng};
use http_body_util::BodyExt;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// State with local collaborators and default configuration.
pub fn test_state() -> AppState {
    test_state_with(AppConfig::default(), Collaborators::fallback(Duration::from_secs(5)))
}

/// State with the given configuration and collaborators. Room codes come
/// from `MockRng`, so the first room is always `CASE-AAAA`.
pub fn test_state_with(config: AppConfig, collaborators: Collaborators) -> AppState {
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(MockRng));
    AppState::new(config, fixed_clock(), rng, collaborators)
}

/// Build the full app router over `state`. Uses the same route structure
/// as `main.rs`.
pub fn build_test_app(state: &AppState) -> Router {
    routes::app(state.clone())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    post_raw(app, uri, serde_json::to_vec(body).unwrap(), &[]).await
}

/// Send a POST request with a raw body and extra headers.
pub async fn post_raw(
    app: Router,
    uri: &str,
    body: Vec<u8>,
    headers: &[(&str, &str)],
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    send(app, builder.body(Body::from(body)).unwrap()).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Create a room through the HTTP API and return its id and code.
pub async fn create_room(state: &AppState, incident_id: &str) -> (Uuid, String) {
    let (status, json) = post_json(
        build_test_app(state),
        "/api/v1/rooms",
        &serde_json::json!({ "incident_id": incident_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    (
        json["room_id"].as_str().unwrap().parse().unwrap(),
        json["code"].as_str().unwrap().to_owned(),
    )
}

/// Join a room through the HTTP API and return the participant id.
pub async fn join(state: &AppState, code: &str, name: &str, role: &str) -> Uuid {
    let (status, json) = post_json(
        build_test_app(state),
        "/api/v1/rooms/join",
        &serde_json::json!({ "code": code, "name": name, "role": role }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    json["participant_id"].as_str().unwrap().parse().unwrap()
}

/// An in-memory realtime connection.
pub struct TestConnection {
    pub id: ConnectionId,
    pub events: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestConnection {
    /// Open a connection without attaching it.
    pub fn open(state: &AppState) -> Self {
        let (sink, events) = mpsc::unbounded_channel();
        let id = coordinator::connection_opened(state, sink);
        Self { id, events }
    }

    /// Open a connection and attach it as `participant_id`, discarding the
    /// snapshot.
    pub async fn attach(state: &AppState, room_id: Uuid, participant_id: Uuid) -> Self {
        let mut connection = Self::open(state);
        connection
            .send(
                state,
                ClientCommand::JoinRoom {
                    room_id,
                    participant_id,
                },
            )
            .await;
        let events = connection.drain();
        assert!(
            matches!(events.last(), Some(ServerEvent::RoomSnapshot { .. })),
            "expected snapshot, got {events:?}"
        );
        connection
    }

    /// Dispatch a command as this connection.
    pub async fn send(&self, state: &AppState, command: ClientCommand) {
        coordinator::dispatch(state, self.id, command).await;
    }

    /// Everything delivered so far.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Waits for the first event matching `predicate`, skipping others.
    pub async fn wait_for(&mut self, predicate: impl Fn(&ServerEvent) -> bool) -> ServerEvent {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = self.events.recv().await.expect("connection channel closed");
                if predicate(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }
}
