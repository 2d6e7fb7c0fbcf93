//! Live incident analyst backed by a chat completions API.

use std::fmt::Write as _;

use async_trait::async_trait;
use caseroom_session::domain::evidence::EvidenceItem;
use caseroom_session::domain::hypothesis::{Hypothesis, ValidationAnnotation};
use caseroom_session::domain::incident::{
    EvidenceCategory, IncidentAnalysis, IncidentRecord, ResponderProfile, SuggestedHypothesis,
};
use serde::Deserialize;

use crate::chat::ChatClient;
use crate::collaborator::IncidentAnalyst;
use crate::error::IntegrationError;
use crate::fallback::{ANALYST_NAME, format_duration};

const ANALYSIS_TEMPERATURE: f32 = 0.7;
const VALIDATION_TEMPERATURE: f32 = 0.3;
const EVIDENCE_EXCERPT_CHARS: usize = 200;

/// Analyst that prompts a chat model for a structured case analysis.
#[derive(Debug, Clone)]
pub struct ChatAnalyst {
    chat: ChatClient,
}

impl ChatAnalyst {
    /// Wraps a configured chat client.
    #[must_use]
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl IncidentAnalyst for ChatAnalyst {
    async fn analyze_incident(
        &self,
        incident: &IncidentRecord,
    ) -> Result<IncidentAnalysis, IntegrationError> {
        let reply: AnalysisReply = self
            .chat
            .complete_json(&analysis_prompt(incident), ANALYSIS_TEMPERATURE)
            .await?;
        Ok(reply.into_analysis())
    }

    async fn validate_hypothesis(
        &self,
        hypothesis: &Hypothesis,
        evidence: &[EvidenceItem],
    ) -> Result<ValidationAnnotation, IntegrationError> {
        let reply: ValidationReply = self
            .chat
            .complete_json(&validation_prompt(hypothesis, evidence), VALIDATION_TEMPERATURE)
            .await?;
        Ok(reply.into_annotation())
    }
}

#[derive(Debug, Deserialize)]
struct AnalysisReply {
    briefing: String,
    #[serde(default)]
    evidence_categories: Vec<CategoryReply>,
    #[serde(default)]
    hypotheses: Vec<SuggestionReply>,
    #[serde(default)]
    open_questions: Vec<String>,
    #[serde(default)]
    responder_profiles: Vec<ProfileReply>,
}

#[derive(Debug, Deserialize)]
struct CategoryReply {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    items: Vec<String>,
    #[serde(default = "default_significance")]
    significance: i64,
}

#[derive(Debug, Deserialize)]
struct SuggestionReply {
    title: String,
    #[serde(default)]
    description: String,
    root_cause: String,
    #[serde(default)]
    confidence: i64,
}

#[derive(Debug, Deserialize)]
struct ProfileReply {
    name: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    key_actions: Vec<String>,
    #[serde(default)]
    personality: String,
}

#[derive(Debug, Deserialize)]
struct ValidationReply {
    score: i64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    supporting_patterns: Vec<String>,
    #[serde(default)]
    contradictions: Vec<String>,
}

fn default_significance() -> i64 {
    5
}

fn clamp_u8(value: i64, min: u8, max: u8) -> u8 {
    u8::try_from(value.clamp(i64::from(min), i64::from(max))).unwrap_or(min)
}

impl AnalysisReply {
    fn into_analysis(self) -> IncidentAnalysis {
        IncidentAnalysis {
            analyst: ANALYST_NAME.to_owned(),
            briefing: self.briefing,
            evidence_categories: self
                .evidence_categories
                .into_iter()
                .filter(|category| !category.items.is_empty())
                .map(|category| EvidenceCategory {
                    name: category.name,
                    description: category.description,
                    items: category.items,
                    significance: clamp_u8(category.significance, 1, 10),
                })
                .collect(),
            suggested_hypotheses: self
                .hypotheses
                .into_iter()
                .enumerate()
                .map(|(index, suggestion)| SuggestedHypothesis {
                    id: format!("theory-ai-{}", index + 1),
                    title: suggestion.title,
                    description: suggestion.description,
                    root_cause: suggestion.root_cause,
                    supporting_evidence: Vec::new(),
                    confidence: clamp_u8(suggestion.confidence, 0, 100),
                    validation: None,
                })
                .collect(),
            open_questions: self.open_questions,
            responder_profiles: self
                .responder_profiles
                .into_iter()
                .enumerate()
                .map(|(index, profile)| ResponderProfile {
                    responder_id: format!("resp-{}", index + 1),
                    name: profile.name,
                    role: profile.role,
                    key_actions: profile.key_actions,
                    personality: profile.personality,
                    available: true,
                })
                .collect(),
        }
    }
}

impl ValidationReply {
    fn into_annotation(self) -> ValidationAnnotation {
        ValidationAnnotation {
            score: clamp_u8(self.score, 0, 100),
            reasoning: self.reasoning,
            supporting_patterns: self.supporting_patterns,
            contradictions: self.contradictions,
        }
    }
}

fn analysis_prompt(incident: &IncidentRecord) -> String {
    let duration = incident.resolved_at.map_or_else(
        || "unknown".to_owned(),
        |resolved_at| format_duration(incident.created_at, resolved_at),
    );

    let mut prompt = format!(
        "Analyze this resolved incident as {ANALYST_NAME}.\n\n\
         === CASE FILE ===\n\
         INCIDENT: {}\nDESCRIPTION: {}\nSEVERITY: {}\nDURATION: {duration}\nSTATUS: {}\n\n\
         === INCIDENT TIMELINE ===\n",
        incident.title,
        incident.description,
        incident.severity.as_str().to_uppercase(),
        incident.status,
    );
    for event in incident.timeline.iter().take(10) {
        let _ = writeln!(prompt, "{}: {}\n   {}", event.timestamp, event.title, event.description);
    }
    prompt.push_str("\n=== RESPONSE TEAM ===\n");
    for responder in &incident.responders {
        let _ = writeln!(
            prompt,
            "{} ({}): {}",
            responder.name,
            responder.role,
            responder.actions.join(", ")
        );
    }
    let _ = write!(
        prompt,
        "\n=== AFFECTED SERVICES ===\n{}\n\n=== COMMUNICATION TRAIL ===\n",
        incident.services.join(", ")
    );
    for message in incident.chat_messages.iter().take(8) {
        let _ = writeln!(prompt, "{} - {}: {}", message.timestamp, message.user, message.text);
    }
    prompt.push_str(
        "\nRespond with a JSON object with these fields:\n\
         - \"briefing\": a 2-3 paragraph narrative introducing the case\n\
         - \"evidence_categories\": 3-5 objects {\"name\", \"description\", \"items\": [string], \"significance\": 1-10}\n\
         - \"hypotheses\": 2-4 objects {\"title\", \"description\", \"root_cause\", \"confidence\": 60-90}\n\
         - \"open_questions\": 3-4 strings naming gaps that need deeper investigation\n\
         - \"responder_profiles\": objects {\"name\", \"role\", \"key_actions\": [string], \"personality\"}\n\
         Be respectful but thorough; focus on learning and prevention.",
    );
    prompt
}

fn validation_prompt(hypothesis: &Hypothesis, evidence: &[EvidenceItem]) -> String {
    let mut prompt = format!(
        "Analyze this theory against the evidence.\n\n\
         THEORY: {}\nDESCRIPTION: {}\nROOT CAUSE: {}\n\nEVIDENCE:\n",
        hypothesis.title, hypothesis.description, hypothesis.root_cause
    );
    for item in evidence {
        let excerpt: String = item.content.chars().take(EVIDENCE_EXCERPT_CHARS).collect();
        let _ = writeln!(prompt, "- {}: {excerpt}", item.title);
    }
    prompt.push_str(
        "\nRespond with a JSON object {\"score\": 0-100, \"reasoning\": string, \
         \"supporting_patterns\": [string], \"contradictions\": [string]}.",
    );
    prompt
}
