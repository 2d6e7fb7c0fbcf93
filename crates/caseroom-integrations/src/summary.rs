//! Live summary writer backed by a chat completions API.

use std::fmt::Write as _;

use async_trait::async_trait;
use caseroom_session::domain::evidence::EvidenceItem;
use caseroom_session::domain::hypothesis::Hypothesis;
use caseroom_session::domain::incident::{
    ActionItem, ActionPriority, ActionStatus, IncidentRecord, SummaryDocument,
};
use serde::Deserialize;

use crate::chat::ChatClient;
use crate::collaborator::SummaryWriter;
use crate::error::IntegrationError;
use crate::fallback::TemplateSummaryWriter;

const SUMMARY_TEMPERATURE: f32 = 0.4;

/// Writes summary documents with a chat model.
///
/// The timeline section is always rendered locally from the incident record;
/// the model writes the narrative sections.
#[derive(Debug, Clone)]
pub struct ChatSummaryWriter {
    chat: ChatClient,
}

impl ChatSummaryWriter {
    /// Wraps a configured chat client.
    #[must_use]
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }
}

#[derive(Debug, Deserialize)]
struct SummaryReply {
    summary: String,
    #[serde(default)]
    root_cause: Option<String>,
    impact: String,
    resolution: String,
    #[serde(default)]
    action_items: Vec<ActionReply>,
    #[serde(default)]
    lessons: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ActionReply {
    description: String,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    priority: String,
}

fn parse_priority(value: &str) -> ActionPriority {
    match value.trim().to_ascii_lowercase().as_str() {
        "high" => ActionPriority::High,
        "low" => ActionPriority::Low,
        _ => ActionPriority::Medium,
    }
}

impl SummaryReply {
    fn into_document(self, incident: &IncidentRecord, hypothesis: &Hypothesis) -> SummaryDocument {
        let template = TemplateSummaryWriter::document(incident, hypothesis);
        let action_items = if self.action_items.is_empty() {
            template.action_items
        } else {
            self.action_items
                .into_iter()
                .enumerate()
                .map(|(index, action)| ActionItem {
                    id: format!("action-{}", index + 1),
                    description: action.description,
                    owner: action.owner,
                    priority: parse_priority(&action.priority),
                    status: ActionStatus::Open,
                    due_date: None,
                })
                .collect()
        };
        SummaryDocument {
            title: template.title,
            summary: self.summary,
            timeline: template.timeline,
            root_cause: self
                .root_cause
                .filter(|text| !text.trim().is_empty())
                .unwrap_or(template.root_cause),
            impact: self.impact,
            resolution: self.resolution,
            action_items,
            lessons: if self.lessons.is_empty() {
                template.lessons
            } else {
                self.lessons
            },
        }
    }
}

#[async_trait]
impl SummaryWriter for ChatSummaryWriter {
    async fn generate_summary(
        &self,
        incident: &IncidentRecord,
        hypothesis: &Hypothesis,
        evidence: &[EvidenceItem],
    ) -> Result<SummaryDocument, IntegrationError> {
        let reply: SummaryReply = self
            .chat
            .complete_json(&summary_prompt(incident, hypothesis, evidence), SUMMARY_TEMPERATURE)
            .await?;
        Ok(reply.into_document(incident, hypothesis))
    }
}

fn summary_prompt(incident: &IncidentRecord, hypothesis: &Hypothesis, evidence: &[EvidenceItem]) -> String {
    let resolved = incident
        .resolved_at
        .map_or_else(|| "unresolved".to_owned(), |at| at.to_rfc3339());
    let mut prompt = format!(
        "Generate a professional post-mortem document for this incident.\n\n\
         INCIDENT: {}\nSEVERITY: {}\nDURATION: {} to {resolved}\n\n\
         FINAL ROOT CAUSE: {}\nTHEORY DESCRIPTION: {}\n\nKEY EVIDENCE:\n",
        incident.title,
        incident.severity.as_str(),
        incident.created_at.to_rfc3339(),
        hypothesis.root_cause,
        hypothesis.description,
    );
    for item in evidence
        .iter()
        .filter(|item| hypothesis.supporting_evidence.contains(&item.id))
    {
        let _ = writeln!(prompt, "- {}: {}", item.title, item.content);
    }
    prompt.push_str("\nRESPONDERS:\n");
    for responder in &incident.responders {
        let _ = writeln!(
            prompt,
            "- {} ({}): {}",
            responder.name,
            responder.role,
            responder.actions.join(", ")
        );
    }
    prompt.push_str(
        "\nRespond with a JSON object {\"summary\", \"root_cause\", \"impact\", \"resolution\", \
         \"action_items\": [{\"description\", \"owner\", \"priority\": \"high\"|\"medium\"|\"low\"}], \
         \"lessons\": [string]}.",
    );
    prompt
}
