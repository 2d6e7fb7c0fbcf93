//! Incident-management webhook: opens a room when an incident resolves.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use caseroom_core::error::DomainError;
use hmac::{Hmac, Mac};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::Sha256;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::coordinator;
use crate::error::ApiError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying `sha256=<hex digest>` of the raw body.
pub const SIGNATURE_HEADER: &str = "x-incident-signature";

const RESOLVED_EVENT: &str = "incident.resolved";
const INVITED_ROLE: &str = "technical_analyst";

/// Query of the verification handshake.
#[derive(Debug, Deserialize)]
pub struct ChallengeQuery {
    /// Value to echo back.
    pub challenge: Option<String>,
}

/// Invite link for one incident responder.
#[derive(Debug, Serialize)]
pub struct ResponderInvite {
    /// Responder name.
    pub name: String,
    /// Join link with the name and role prefilled.
    pub join_url: String,
}

/// Response body when a room was opened.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// The new room.
    pub room_id: Uuid,
    /// Shareable join code.
    pub code: String,
    /// Link participants follow to join.
    pub join_url: String,
    /// The resolved incident.
    pub incident_id: String,
    /// Its title.
    pub incident_title: String,
    /// One link per responder.
    pub responder_invites: Vec<ResponderInvite>,
    /// Human-readable outcome.
    pub message: String,
}

/// Checks `header` against the HMAC-SHA256 of `body`. The digest comparison
/// is constant-time.
#[must_use]
pub fn signature_matches(secret: &str, body: &[u8], header: &str) -> bool {
    let Some(digest) = header
        .trim()
        .strip_prefix("sha256=")
        .and_then(|encoded| hex::decode(encoded).ok())
    else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&digest).is_ok()
}

fn invite_url(join_url: &str, name: &str) -> String {
    Url::parse_with_params(join_url, &[("player", name), ("role", INVITED_ROLE)])
        .map_or_else(|_| join_url.to_owned(), String::from)
}

fn incident_id_of(payload: &Value) -> Option<&str> {
    payload["incident"]["id"]
        .as_str()
        .or_else(|| payload["data"]["incident"]["id"].as_str())
        .filter(|id| !id.trim().is_empty())
}

/// GET /incident-resolved
async fn verify(Query(query): Query<ChallengeQuery>) -> Json<Value> {
    match query.challenge {
        Some(challenge) => Json(json!({ "challenge": challenge })),
        None => Json(json!({
            "message": "Case Room incident webhook",
            "events": [RESOLVED_EVENT],
            "status": "active",
        })),
    }
}

/// POST /incident-resolved
#[instrument(skip_all)]
async fn incident_resolved(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    if let Some(secret) = &state.config.webhook_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("missing webhook signature"))?;
        if !signature_matches(secret, &body, signature) {
            return Err(ApiError::Unauthorized("webhook signature mismatch"));
        }
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| DomainError::Validation(format!("webhook body must be JSON: {e}")))?;
    let event_type = payload["event_type"]
        .as_str()
        .or_else(|| payload["type"].as_str())
        .unwrap_or_default();
    if event_type != RESOLVED_EVENT {
        info!(event_type, "ignoring webhook event");
        return Ok(Json(json!({ "message": "event ignored", "event_type": event_type })));
    }
    let incident_id = incident_id_of(&payload)
        .ok_or_else(|| DomainError::Validation("webhook payload has no incident id".into()))?;

    let opened = coordinator::open_room(&state, incident_id, true).await?;
    let join_url = state.config.join_url(&opened.handle.code);
    let responder_invites: Vec<ResponderInvite> = opened
        .incident
        .responders
        .iter()
        .map(|responder| ResponderInvite {
            name: responder.name.clone(),
            join_url: invite_url(&join_url, &responder.name),
        })
        .collect();

    info!(
        room_id = %opened.handle.id,
        incident_id,
        invites = responder_invites.len(),
        "room opened from webhook"
    );

    let response = WebhookResponse {
        room_id: opened.handle.id,
        code: opened.handle.code,
        join_url,
        incident_id: incident_id.to_owned(),
        incident_title: opened.incident.title.clone(),
        message: format!("Case room opened for resolved incident: {}", opened.incident.title),
        responder_invites,
    };
    let body = serde_json::to_value(response)
        .map_err(|e| DomainError::Infrastructure(format!("failed to encode response: {e}")))?;
    Ok(Json(body))
}

/// Returns the router for incoming webhooks.
pub fn router() -> Router<AppState> {
    Router::new().route("/incident-resolved", get(verify).post(incident_resolved))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_signature_matches_valid_digest() {
        let body = br#"{"event_type":"incident.resolved"}"#;
        assert!(signature_matches("s3cret", body, &sign("s3cret", body)));
    }

    #[test]
    fn test_signature_rejects_wrong_secret_or_malformed_header() {
        let body = br#"{"event_type":"incident.resolved"}"#;
        assert!(!signature_matches("s3cret", body, &sign("other", body)));
        assert!(!signature_matches("s3cret", body, "sha256=zz"));
        assert!(!signature_matches("s3cret", body, "md5=abcd"));
    }

    #[test]
    fn test_invite_url_encodes_player_name() {
        let url = invite_url("http://localhost:3000/game/CASE-AB12", "Alice Chen");
        assert_eq!(
            url,
            "http://localhost:3000/game/CASE-AB12?player=Alice+Chen&role=technical_analyst"
        );
    }

    #[test]
    fn test_incident_id_is_read_from_either_envelope() {
        assert_eq!(incident_id_of(&json!({ "incident": { "id": "INC-1" } })), Some("INC-1"));
        assert_eq!(
            incident_id_of(&json!({ "data": { "incident": { "id": "INC-2" } } })),
            Some("INC-2")
        );
        assert_eq!(incident_id_of(&json!({ "incident": { "id": " " } })), None);
    }
}
