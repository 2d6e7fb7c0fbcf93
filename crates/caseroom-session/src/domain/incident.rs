//! Incident records, analyses and summary documents cached on a room.
//!
//! These are produced by external collaborators; the room only stores them
//! and derives its initial evidence and hypotheses from the analysis.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::evidence::{EvidenceItem, EvidenceKind, SIGNIFICANCE_RANGE};
use super::hypothesis::{Hypothesis, ProposedBy, ValidationAnnotation};

/// Incident severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Wire name of the severity.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A person who responded to the incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Responder {
    pub id: String,
    pub name: String,
    pub role: String,
    pub actions: Vec<String>,
    pub joined_at: DateTime<Utc>,
}

/// One entry of the incident timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

/// One message of the incident chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub text: String,
}

/// The source incident a room investigates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub responders: Vec<Responder>,
    pub timeline: Vec<TimelineEvent>,
    pub services: Vec<String>,
    pub runbooks: Vec<String>,
    pub chat_channel: String,
    pub chat_messages: Vec<ChatMessage>,
}

/// A group of related evidence suggested by the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceCategory {
    pub name: String,
    pub description: String,
    pub items: Vec<String>,
    pub significance: u8,
}

/// A hypothesis suggested by the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedHypothesis {
    pub id: String,
    pub title: String,
    pub description: String,
    pub root_cause: String,
    #[serde(default)]
    pub supporting_evidence: Vec<String>,
    pub confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationAnnotation>,
}

/// Profile of a responder as seen by the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponderProfile {
    pub responder_id: String,
    pub name: String,
    pub role: String,
    pub key_actions: Vec<String>,
    pub personality: String,
    pub available: bool,
}

/// Structured output of the analysis collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentAnalysis {
    /// Identity the analysis speaks as; used as the proposer of suggestions.
    pub analyst: String,
    pub briefing: String,
    pub evidence_categories: Vec<EvidenceCategory>,
    pub suggested_hypotheses: Vec<SuggestedHypothesis>,
    pub open_questions: Vec<String>,
    pub responder_profiles: Vec<ResponderProfile>,
}

impl IncidentAnalysis {
    /// An analysis with nothing in it, used when the collaborator produced
    /// nothing usable.
    #[must_use]
    pub fn empty(analyst: &str) -> Self {
        Self {
            analyst: analyst.to_owned(),
            briefing: String::new(),
            evidence_categories: Vec::new(),
            suggested_hypotheses: Vec::new(),
            open_questions: Vec::new(),
            responder_profiles: Vec::new(),
        }
    }

    /// Initial evidence list: one item per category entry. Categories whose
    /// names reduce to the same slug get a numeric suffix (`system_logs_2`),
    /// keeping every id distinct.
    #[must_use]
    pub fn seed_evidence(&self, now: DateTime<Utc>) -> Vec<EvidenceItem> {
        let mut used_slugs = HashSet::new();
        let mut items = Vec::new();
        for category in &self.evidence_categories {
            let slug = unique_slug(&category.name, &mut used_slugs);
            let significance = category
                .significance
                .clamp(*SIGNIFICANCE_RANGE.start(), *SIGNIFICANCE_RANGE.end());
            items.extend(category.items.iter().enumerate().map(|(index, entry)| {
                EvidenceItem {
                    id: format!("evidence-{slug}-{index}"),
                    kind: EvidenceKind::LogEntry,
                    title: entry.clone(),
                    content: format!("Evidence details for: {entry}"),
                    timestamp: now,
                    source: slug.clone(),
                    category: category.name.clone(),
                    reviewed: false,
                    assigned_to: None,
                    tags: Vec::new(),
                    significance: Some(significance),
                }
            }));
        }
        items
    }

    /// Initial hypotheses: every suggestion, proposed by the analyst, with no
    /// votes.
    #[must_use]
    pub fn seed_hypotheses(&self) -> Vec<Hypothesis> {
        self.suggested_hypotheses
            .iter()
            .map(|suggestion| Hypothesis {
                id: suggestion.id.clone(),
                title: suggestion.title.clone(),
                description: suggestion.description.clone(),
                root_cause: suggestion.root_cause.clone(),
                supporting_evidence: suggestion.supporting_evidence.clone(),
                confidence: suggestion.confidence.min(100),
                proposed_by: ProposedBy::Analysis {
                    name: self.analyst.clone(),
                },
                voters: Vec::new(),
                validation: suggestion.validation.clone(),
            })
            .collect()
    }
}

/// Priority of a follow-up action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    Low,
    Medium,
    High,
}

/// Progress of a follow-up action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Open,
    InProgress,
    Completed,
}

/// A follow-up action from the summary document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: String,
    pub description: String,
    pub owner: String,
    pub priority: ActionPriority,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

/// Structured summary produced once a room has reached consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryDocument {
    pub title: String,
    pub summary: String,
    pub timeline: String,
    pub root_cause: String,
    pub impact: String,
    pub resolution: String,
    pub action_items: Vec<ActionItem>,
    pub lessons: Vec<String>,
}

fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

fn unique_slug(name: &str, used: &mut HashSet<String>) -> String {
    let base = slugify(name);
    let mut slug = base.clone();
    let mut suffix = 2;
    while !used.insert(slug.clone()) {
        slug = format!("{base}_{suffix}");
        suffix += 1;
    }
    slug
}
