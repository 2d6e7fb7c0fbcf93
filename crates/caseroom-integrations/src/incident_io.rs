//! Live incident source for the incident.io v2 REST API.
//!
//! The incident itself must load; the timeline and action listings are
//! optional and degrade to empty lists when their requests fail.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use caseroom_session::domain::incident::{IncidentRecord, Responder, Severity, TimelineEvent};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::collaborator::IncidentSource;
use crate::error::IntegrationError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for incident.io.
#[derive(Debug, Clone)]
pub struct IncidentIoClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl IncidentIoClient {
    /// Creates a client for `base_url` (for example `https://api.incident.io`).
    ///
    /// # Errors
    ///
    /// Returns `IntegrationError::Request` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, IntegrationError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value, IntegrationError> {
        let resp = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(IntegrationError::Status { status, body });
        }
        Ok(resp.json().await?)
    }

    async fn optional_list(&self, path: &str, field: &str) -> Vec<Value> {
        match self.get_json(path).await {
            Ok(mut body) => match body.get_mut(field).map(Value::take) {
                Some(Value::Array(entries)) => entries,
                _ => Vec::new(),
            },
            Err(err) => {
                warn!(path, error = %err, "optional incident listing unavailable");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl IncidentSource for IncidentIoClient {
    async fn fetch_incident(&self, incident_id: &str) -> Result<IncidentRecord, IntegrationError> {
        let mut body = self.get_json(&format!("/v2/incidents/{incident_id}")).await?;
        let incident = body
            .get_mut("incident")
            .map(Value::take)
            .filter(Value::is_object)
            .ok_or_else(|| IntegrationError::Parse("response has no incident object".to_owned()))?;

        let timeline = self
            .optional_list(&format!("/v2/incidents/{incident_id}/timeline"), "timeline_entries")
            .await;
        let actions = self
            .optional_list(&format!("/v2/incidents/{incident_id}/actions"), "actions")
            .await;

        let record = map_incident(incident_id, &incident, &timeline, &actions, Utc::now());
        debug!(
            incident_id,
            timeline = record.timeline.len(),
            responders = record.responders.len(),
            "incident fetched"
        );
        Ok(record)
    }
}

/// First non-empty string found under any of `keys`.
fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| value[*key].as_str())
        .find(|text| !text.trim().is_empty())
}

fn timestamp(value: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter()
        .filter_map(|key| value[*key].as_str())
        .find_map(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|at| at.with_timezone(&Utc))
}

/// Maps an incident.io severity (a name or an object with a name) onto the
/// four-level scale.
#[must_use]
pub fn map_severity(severity: &Value) -> Severity {
    let name = match severity {
        Value::String(name) => Some(name.as_str()),
        Value::Object(_) => first_str(severity, &["name", "description"]),
        _ => None,
    };
    let Some(name) = name.map(str::to_lowercase) else {
        return Severity::Medium;
    };
    if name.contains("critical") || name.contains("p0") {
        Severity::Critical
    } else if name.contains("high") || name.contains("p1") {
        Severity::High
    } else if ["low", "p3", "p4"].iter().any(|marker| name.contains(marker)) {
        Severity::Low
    } else {
        Severity::Medium
    }
}

fn map_responder(index: usize, role: &Value, now: DateTime<Utc>) -> Responder {
    let user = if role["user"].is_object() {
        &role["user"]
    } else {
        &role["assignee"]
    };
    let role_name = role["role_type"]["name"]
        .as_str()
        .or_else(|| role["type"].as_str())
        .unwrap_or_default();

    let mut actions: Vec<String> = role["actions"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|action| first_str(action, &["description", "summary"]))
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();
    let lowered = role_name.to_lowercase();
    if lowered.contains("lead") {
        actions.extend(["Led incident response".to_owned(), "Coordinated team activities".to_owned()]);
    } else if lowered.contains("engineer") {
        actions.extend(["Investigated technical issues".to_owned(), "Implemented fixes".to_owned()]);
    }
    if actions.is_empty() {
        actions.push("Participated in incident response".to_owned());
    }

    Responder {
        id: first_str(role, &["id"]).map_or_else(|| format!("responder-{index}"), str::to_owned),
        name: first_str(user, &["name", "email"])
            .map_or_else(|| format!("Responder {}", index + 1), str::to_owned),
        role: if role_name.is_empty() {
            "Responder".to_owned()
        } else {
            role_name.to_owned()
        },
        actions,
        joined_at: timestamp(role, &["created_at", "assigned_at"]).unwrap_or(now),
    }
}

fn map_timeline_entry(index: usize, entry: &Value, now: DateTime<Utc>) -> TimelineEvent {
    TimelineEvent {
        id: first_str(entry, &["id"]).map_or_else(|| format!("timeline-{index}"), str::to_owned),
        timestamp: timestamp(entry, &["occurred_at", "created_at"]).unwrap_or(now),
        title: first_str(entry, &["event_type", "type"])
            .unwrap_or("Timeline Event")
            .to_owned(),
        description: first_str(entry, &["body", "description", "summary"])
            .unwrap_or_default()
            .to_owned(),
        kind: first_str(entry, &["event_type"]).unwrap_or("event").to_owned(),
        actor: first_str(&entry["actor"], &["name"])
            .or_else(|| first_str(&entry["user"], &["name"]))
            .map(str::to_owned),
    }
}

fn map_services(services: &Value) -> Vec<String> {
    services
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|service| match service {
                    Value::String(name) => Some(name.clone()),
                    other => first_str(other, &["name", "summary"]).map(str::to_owned),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn map_runbooks(actions: &[Value]) -> Vec<String> {
    let runbooks: BTreeSet<String> = actions
        .iter()
        .filter(|action| first_str(action, &["action_type", "type"]) == Some("runbook"))
        .map(|action| {
            first_str(action, &["description", "summary"])
                .unwrap_or("Runbook")
                .to_owned()
        })
        .collect();
    runbooks.into_iter().collect()
}

/// Maps the incident, timeline and action payloads onto an
/// [`IncidentRecord`]. Missing timestamps fall back to `now`.
#[must_use]
pub fn map_incident(
    incident_id: &str,
    incident: &Value,
    timeline: &[Value],
    actions: &[Value],
    now: DateTime<Utc>,
) -> IncidentRecord {
    IncidentRecord {
        id: first_str(incident, &["id"]).unwrap_or(incident_id).to_owned(),
        title: first_str(incident, &["name", "summary"])
            .unwrap_or("Untitled Incident")
            .to_owned(),
        description: first_str(incident, &["summary", "description"])
            .unwrap_or_default()
            .to_owned(),
        severity: map_severity(&incident["severity"]),
        status: first_str(incident, &["status"]).unwrap_or("resolved").to_owned(),
        created_at: timestamp(incident, &["created_at"]).unwrap_or(now),
        resolved_at: Some(timestamp(incident, &["resolved_at"]).unwrap_or(now)),
        responders: incident["roles"]
            .as_array()
            .map(|roles| {
                roles
                    .iter()
                    .enumerate()
                    .map(|(index, role)| map_responder(index, role, now))
                    .collect()
            })
            .unwrap_or_default(),
        timeline: timeline
            .iter()
            .enumerate()
            .map(|(index, entry)| map_timeline_entry(index, entry, now))
            .collect(),
        services: map_services(&incident["affected_services"]),
        runbooks: map_runbooks(actions),
        chat_channel: first_str(incident, &["slack_channel_id"])
            .unwrap_or_default()
            .to_owned(),
        chat_messages: Vec::new(),
    }
}
