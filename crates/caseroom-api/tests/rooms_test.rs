mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use caseroom_api::config::AppConfig;
use caseroom_api::state::Collaborators;
use caseroom_test_support::{FailingCollaborator, SlowCollaborator};
use serde_json::json;

#[tokio::test]
async fn test_create_room_returns_code_and_join_url() {
    // Arrange
    let state = common::test_state();

    // Act
    let (status, json) = common::post_json(
        common::build_test_app(&state),
        "/api/v1/rooms",
        &json!({ "incident_id": "INC-2041" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["code"], "CASE-AAAA");
    assert_eq!(json["join_url"], "http://localhost:3000/game/CASE-AAAA");
    assert!(json["room_id"].as_str().is_some());
}

#[tokio::test]
async fn test_create_room_rejects_blank_incident_id() {
    // Arrange
    let state = common::test_state();

    // Act
    let (status, json) = common::post_json(
        common::build_test_app(&state),
        "/api/v1/rooms",
        &json!({ "incident_id": "   " }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_create_room_with_missing_field_is_a_validation_error() {
    // Arrange
    let state = common::test_state();

    // Act
    let (status, json) =
        common::post_json(common::build_test_app(&state), "/api/v1/rooms", &json!({})).await;

    // Assert
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
    assert!(json["message"].as_str().unwrap().contains("incident_id"));
    assert_eq!(state.store.len(), 0);
}

#[tokio::test]
async fn test_join_room_with_missing_fields_is_a_validation_error() {
    // Arrange
    let state = common::test_state();
    common::create_room(&state, "INC-2041").await;

    // Act
    let (status, json) =
        common::post_json(common::build_test_app(&state), "/api/v1/rooms/join", &json!({})).await;

    // Assert
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_join_room_with_unparseable_body_is_a_validation_error() {
    // Arrange
    let state = common::test_state();

    // Act
    let (status, json) = common::post_raw(
        common::build_test_app(&state),
        "/api/v1/rooms/join",
        b"{\"code\": ".to_vec(),
        &[],
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_new_room_snapshot_carries_seeded_evidence_and_hypotheses() {
    // Arrange
    let state = common::test_state();
    let (room_id, _) = common::create_room(&state, "INC-2041").await;

    // Act
    let (status, json) = common::get_json(
        common::build_test_app(&state),
        &format!("/api/v1/rooms/{room_id}"),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["phase"], "briefing");
    assert_eq!(json["incident_id"], "INC-2041");
    assert_eq!(json["incident"]["title"], "Database Connection Timeout");
    assert_eq!(json["evidence"].as_array().unwrap().len(), 9);
    assert_eq!(json["hypotheses"].as_array().unwrap().len(), 2);
    assert_eq!(json["participants"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_get_unknown_room_returns_not_found() {
    // Arrange
    let state = common::test_state();

    // Act
    let (status, json) = common::get_json(
        common::build_test_app(&state),
        &format!("/api/v1/rooms/{}", uuid::Uuid::new_v4()),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "room_not_found");
}

#[tokio::test]
async fn test_join_room_admits_participant_with_role() {
    // Arrange
    let state = common::test_state();
    let (room_id, code) = common::create_room(&state, "INC-2041").await;

    // Act
    let (status, json) = common::post_json(
        common::build_test_app(&state),
        "/api/v1/rooms/join",
        &json!({ "code": code.to_lowercase(), "name": "Alice Chen", "role": "lead_detective" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["room_id"], room_id.to_string());
    let participants = json["room"]["participants"].as_array().unwrap();
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0]["name"], "Alice Chen");
    assert_eq!(participants[0]["role"], "lead_detective");
    assert_eq!(participants[0]["id"], json["participant_id"]);
}

#[tokio::test]
async fn test_join_room_defaults_role_to_technical_analyst() {
    // Arrange
    let state = common::test_state();
    let (_, code) = common::create_room(&state, "INC-2041").await;

    // Act
    let (status, json) = common::post_json(
        common::build_test_app(&state),
        "/api/v1/rooms/join",
        &json!({ "code": code, "name": "Bob Martinez" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["room"]["participants"][0]["role"], "technical_analyst");
}

#[tokio::test]
async fn test_join_room_rejects_name_taken_in_any_case() {
    // Arrange
    let state = common::test_state();
    let (_, code) = common::create_room(&state, "INC-2041").await;
    common::join(&state, &code, "Alice Chen", "lead_detective").await;

    // Act
    let (status, json) = common::post_json(
        common::build_test_app(&state),
        "/api/v1/rooms/join",
        &json!({ "code": code, "name": "alice chen" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "name_taken");
}

#[tokio::test]
async fn test_join_room_with_unknown_code_returns_not_found() {
    // Arrange
    let state = common::test_state();

    // Act
    let (status, json) = common::post_json(
        common::build_test_app(&state),
        "/api/v1/rooms/join",
        &json!({ "code": "CASE-ZZZZ", "name": "Alice Chen" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "room_not_found");
}

#[tokio::test]
async fn test_leading_hypothesis_reports_threshold() {
    // Arrange
    let state = common::test_state();
    let (room_id, code) = common::create_room(&state, "INC-2041").await;
    common::join(&state, &code, "Alice Chen", "lead_detective").await;
    common::join(&state, &code, "Bob Martinez", "technical_analyst").await;

    // Act
    let (status, json) = common::get_json(
        common::build_test_app(&state),
        &format!("/api/v1/rooms/{room_id}/leading-hypothesis"),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["hypothesis"]["id"], "theory-ai-1");
    assert_eq!(json["votes"], 0);
    assert_eq!(json["online_participants"], 2);
    assert_eq!(json["required"], 2);
    assert_eq!(json["consensus_reached"], false);
}

#[tokio::test]
async fn test_summary_before_consensus_is_rejected() {
    // Arrange
    let state = common::test_state();
    let (room_id, _) = common::create_room(&state, "INC-2041").await;

    // Act
    let (status, json) = common::post_json(
        common::build_test_app(&state),
        &format!("/api/v1/rooms/{room_id}/summary"),
        &json!({}),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_failing_collaborators_fall_back_to_sample_case() {
    // Arrange
    let failing = Arc::new(FailingCollaborator);
    let collaborators = Collaborators {
        incidents: failing.clone(),
        analyst: failing.clone(),
        summaries: failing,
        timeout: Duration::from_secs(1),
    };
    let state = common::test_state_with(AppConfig::default(), collaborators);

    // Act
    let (room_id, _) = common::create_room(&state, "INC-404").await;
    let (_, json) = common::get_json(
        common::build_test_app(&state),
        &format!("/api/v1/rooms/{room_id}"),
    )
    .await;

    // Assert
    assert_eq!(json["incident"]["id"], "INC-404");
    assert_eq!(json["incident"]["title"], "Database Connection Timeout");
    assert_eq!(json["hypotheses"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_slow_collaborators_are_cut_off_by_timeout() {
    // Arrange
    let slow = Arc::new(SlowCollaborator(Duration::from_secs(30)));
    let collaborators = Collaborators {
        incidents: slow.clone(),
        analyst: slow.clone(),
        summaries: slow,
        timeout: Duration::from_millis(50),
    };
    let state = common::test_state_with(AppConfig::default(), collaborators);

    // Act
    let created = tokio::time::timeout(
        Duration::from_secs(5),
        common::create_room(&state, "INC-SLOW"),
    )
    .await;

    // Assert
    assert!(created.is_ok(), "room creation waited on a stalled collaborator");
}
