//! Local adapters used when a live collaborator is not configured or fails.
//!
//! Every method here is infallible and deterministic for a given input, so
//! a room can always be created and concluded without network access.

use async_trait::async_trait;
use caseroom_session::domain::evidence::EvidenceItem;
use caseroom_session::domain::hypothesis::{Hypothesis, ValidationAnnotation};
use caseroom_session::domain::incident::{
    ActionItem, ActionPriority, ActionStatus, ChatMessage, EvidenceCategory, IncidentAnalysis,
    IncidentRecord, Responder, ResponderProfile, Severity, SuggestedHypothesis, SummaryDocument,
    TimelineEvent,
};
use chrono::{DateTime, NaiveDate, Utc};

use crate::collaborator::{IncidentAnalyst, IncidentSource, SummaryWriter};
use crate::error::IntegrationError;

/// Identity the analysis speaks as.
pub const ANALYST_NAME: &str = "Detective Inspector Mortem";

/// Score attached when a hypothesis cannot be scored remotely.
pub const FALLBACK_VALIDATION_SCORE: u8 = 75;

/// Timeline entries included in a generated summary.
pub const SUMMARY_TIMELINE_LIMIT: usize = 10;

fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2024, 1, 15)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

/// Serves a sample resolved incident under whatever id is requested.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleIncidentSource;

impl SampleIncidentSource {
    /// The sample incident, carrying `incident_id`.
    #[must_use]
    pub fn incident(incident_id: &str) -> IncidentRecord {
        let responders = [
            (
                "resp-1",
                "Alice Chen",
                "Senior SRE",
                &[
                    "Investigated database connection logs",
                    "Analyzed connection pool metrics",
                    "Identified pool exhaustion pattern",
                    "Increased pool size configuration",
                    "Verified service recovery",
                ][..],
                at(14, 35, 0),
            ),
            (
                "resp-2",
                "Bob Martinez",
                "Backend Engineer",
                &[
                    "Reviewed recent deployment changes",
                    "Analyzed application performance metrics",
                    "Identified inefficient query patterns",
                    "Deployed database query optimizations",
                ][..],
                at(14, 42, 0),
            ),
            (
                "resp-3",
                "Sarah Kim",
                "Product Manager",
                &[
                    "Coordinated customer communications",
                    "Updated status page",
                    "Managed stakeholder updates",
                ][..],
                at(15, 0, 0),
            ),
        ]
        .into_iter()
        .map(|(id, name, role, actions, joined_at)| Responder {
            id: id.to_owned(),
            name: name.to_owned(),
            role: role.to_owned(),
            actions: strings(actions),
            joined_at,
        })
        .collect();

        let timeline = [
            ("evt-1", at(14, 30, 0), "Incident Detected", "Automated monitoring triggered high-severity alert for elevated error rates (15% 5xx errors)", "alert", None),
            ("evt-2", at(14, 32, 0), "PagerDuty Alert", "On-call SRE team notified via PagerDuty escalation", "notification", None),
            ("evt-3", at(14, 35, 0), "Alice Chen Joined", "Senior SRE Alice Chen acknowledged incident and began investigation", "responder_joined", Some("Alice Chen")),
            ("evt-4", at(14, 42, 0), "Bob Martinez Joined", "Backend Engineer Bob Martinez joined to investigate recent deployments", "responder_joined", Some("Bob Martinez")),
            ("evt-5", at(15, 0, 0), "Customer Communication", "Status page updated with incident details and estimated resolution time", "communication", Some("Sarah Kim")),
            ("evt-6", at(15, 15, 0), "Root Cause Identified", "Database connection pool exhaustion identified as primary cause", "diagnosis", None),
            ("evt-7", at(15, 30, 0), "Fix Applied", "Connection pool size increased and query optimizations deployed", "resolution_action", None),
            ("evt-8", at(16, 0, 0), "Services Recovering", "Error rates decreasing, services gradually returning to normal", "recovery", None),
            ("evt-9", at(16, 45, 0), "Incident Resolved", "All services fully operational, incident officially resolved", "resolution", None),
        ]
        .into_iter()
        .map(|(id, timestamp, title, description, kind, actor)| TimelineEvent {
            id: id.to_owned(),
            timestamp,
            title: title.to_owned(),
            description: description.to_owned(),
            kind: kind.to_owned(),
            actor: actor.map(str::to_owned),
        })
        .collect();

        let chat_messages = [
            ("msg-1", at(14, 31, 0), "incident-bot", "HIGH SEVERITY ALERT: user-api error rate 15% (threshold 5%)"),
            ("msg-3", at(14, 35, 30), "alice.chen", "Alice here, I'm on it. Checking database metrics now."),
            ("msg-4", at(14, 36, 15), "alice.chen", "Seeing connection timeouts in the database logs. Connection pool looks like it's hitting max capacity (100/100 connections)."),
            ("msg-6", at(14, 39, 0), "alice.chen", "This is looking like pool exhaustion. @bob.martinez can you check if anything changed in recent deployments?"),
            ("msg-7", at(14, 42, 30), "bob.martinez", "We did deploy the new user profile optimization this morning around 10 AM. Let me check if it introduced any new query patterns."),
            ("msg-8", at(14, 45, 0), "bob.martinez", "Found something! The new profile endpoint is making 3 separate DB queries instead of 1 optimized query."),
            ("msg-12", at(15, 15, 0), "alice.chen", "Connection pool size increased to 200. Deploying Bob's query optimization now."),
            ("msg-18", at(16, 45, 0), "alice.chen", "All green! Metrics have been stable for 30+ minutes. This incident can be marked as resolved."),
        ]
        .into_iter()
        .map(|(id, timestamp, user, text)| ChatMessage {
            id: id.to_owned(),
            timestamp,
            user: user.to_owned(),
            text: text.to_owned(),
        })
        .collect();

        IncidentRecord {
            id: incident_id.to_owned(),
            title: "Database Connection Timeout".to_owned(),
            description: "Primary database experiencing connection timeouts causing widespread 500 errors across user-facing services".to_owned(),
            severity: Severity::High,
            status: "resolved".to_owned(),
            created_at: at(14, 30, 0),
            resolved_at: Some(at(16, 45, 0)),
            responders,
            timeline,
            services: strings(&["user-api", "auth-service", "database-cluster", "web-frontend", "mobile-api"]),
            runbooks: strings(&[
                "Database Emergency Response Procedure",
                "Connection Pool Troubleshooting Guide",
                "High Severity Incident Response",
            ]),
            chat_channel: "#incident-2024-001-db-timeout".to_owned(),
            chat_messages,
        }
    }
}

#[async_trait]
impl IncidentSource for SampleIncidentSource {
    async fn fetch_incident(&self, incident_id: &str) -> Result<IncidentRecord, IntegrationError> {
        Ok(Self::incident(incident_id))
    }
}

/// Answers with a canned analysis and a fixed validation score.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedAnalyst;

impl CannedAnalyst {
    /// The canned analysis.
    #[must_use]
    pub fn analysis() -> IncidentAnalysis {
        let category = |name: &str, description: &str, items: &[&str], significance| EvidenceCategory {
            name: name.to_owned(),
            description: description.to_owned(),
            items: strings(items),
            significance,
        };
        let suggestion = |id: &str,
                          title: &str,
                          description: &str,
                          root_cause: &str,
                          confidence,
                          reasoning: &str,
                          supporting: &[&str],
                          contradictions: &[&str]| SuggestedHypothesis {
            id: id.to_owned(),
            title: title.to_owned(),
            description: description.to_owned(),
            root_cause: root_cause.to_owned(),
            supporting_evidence: Vec::new(),
            confidence,
            validation: Some(ValidationAnnotation {
                score: confidence,
                reasoning: reasoning.to_owned(),
                supporting_patterns: strings(supporting),
                contradictions: strings(contradictions),
            }),
        };
        let profile = |id: &str, name: &str, role: &str, actions: &[&str], personality: &str| {
            ResponderProfile {
                responder_id: id.to_owned(),
                name: name.to_owned(),
                role: role.to_owned(),
                key_actions: strings(actions),
                personality: personality.to_owned(),
                available: true,
            }
        };

        IncidentAnalysis {
            analyst: ANALYST_NAME.to_owned(),
            briefing: format!(
                "{ANALYST_NAME} here. We have a fascinating case before us: a database connection \
                 timeout that brought down our user API for over 2 hours. The evidence trail leads \
                 us through connection pool exhaustion, but there are curious timing anomalies that \
                 warrant deeper investigation. The suspects include a recent code deployment, \
                 increased user traffic, and a possible configuration change. Let's examine the clues..."
            ),
            evidence_categories: vec![
                category(
                    "System Logs",
                    "Database and application error logs showing the incident progression",
                    &["Connection timeout errors", "Pool exhaustion warnings", "Query performance logs"],
                    9,
                ),
                category(
                    "Communication Trail",
                    "Chat messages and responder actions during the incident",
                    &["Initial alerts", "Responder coordination", "Resolution steps"],
                    7,
                ),
                category(
                    "System Metrics",
                    "Performance metrics and monitoring data",
                    &["Connection pool utilization", "Response times", "Error rates"],
                    8,
                ),
            ],
            suggested_hypotheses: vec![
                suggestion(
                    "theory-ai-1",
                    "Connection Pool Exhaustion",
                    "Database connection pool reached maximum capacity due to long-running queries or connection leaks",
                    "Inefficient database queries causing connection pool starvation",
                    85,
                    "Strong evidence in logs supports pool exhaustion theory",
                    &["Connection timeout patterns", "Max pool size reached"],
                    &[],
                ),
                suggestion(
                    "theory-ai-2",
                    "Recent Deployment Issue",
                    "Code changes in recent deployment introduced inefficient database access patterns",
                    "New code deployment with unoptimized database queries",
                    70,
                    "Timing correlates with deployment, but no direct evidence yet",
                    &["Incident timing", "Deployment correlation"],
                    &["No obvious code issues identified"],
                ),
            ],
            open_questions: strings(&[
                "What specific changes occurred in the 30 minutes before the incident?",
                "Why didn't connection pool monitoring trigger earlier alerts?",
                "What was the exact sequence of events between 14:25-14:30?",
            ]),
            responder_profiles: vec![
                profile(
                    "resp-1",
                    "Alice Chen",
                    "SRE Lead",
                    &["First responder", "Database investigation", "Applied connection pool fix"],
                    "Methodical database expert with strong troubleshooting instincts",
                ),
                profile(
                    "resp-2",
                    "Bob Martinez",
                    "Backend Engineer",
                    &["Deployment analysis", "Code review", "Applied application fix"],
                    "Detail-oriented developer familiar with recent code changes",
                ),
            ],
        }
    }

    /// The fixed validation annotation.
    #[must_use]
    pub fn validation() -> ValidationAnnotation {
        ValidationAnnotation {
            score: FALLBACK_VALIDATION_SCORE,
            reasoning: "Evidence supports this theory with reasonable confidence.".to_owned(),
            supporting_patterns: Vec::new(),
            contradictions: Vec::new(),
        }
    }
}

#[async_trait]
impl IncidentAnalyst for CannedAnalyst {
    async fn analyze_incident(
        &self,
        _incident: &IncidentRecord,
    ) -> Result<IncidentAnalysis, IntegrationError> {
        Ok(Self::analysis())
    }

    async fn validate_hypothesis(
        &self,
        _hypothesis: &Hypothesis,
        _evidence: &[EvidenceItem],
    ) -> Result<ValidationAnnotation, IntegrationError> {
        Ok(Self::validation())
    }
}

/// Derives a summary document from the incident record and the winning
/// hypothesis.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSummaryWriter;

impl TemplateSummaryWriter {
    /// Builds the summary document.
    #[must_use]
    pub fn document(incident: &IncidentRecord, hypothesis: &Hypothesis) -> SummaryDocument {
        let duration = incident.resolved_at.map_or_else(
            || "Unknown duration".to_owned(),
            |resolved_at| format_duration(incident.created_at, resolved_at),
        );
        let severity = incident.severity.as_str();
        let description = if incident.description.is_empty() {
            "Incident investigation completed"
        } else {
            incident.description.as_str()
        };
        let services = if incident.services.is_empty() {
            "multiple services".to_owned()
        } else {
            incident.services.join(", ")
        };
        let responders = if incident.responders.is_empty() {
            "Investigation team".to_owned()
        } else {
            incident
                .responders
                .iter()
                .map(|responder| format!("{} ({})", responder.name, responder.role))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let action = |id: &str, description: &str, owner: &str, priority| ActionItem {
            id: id.to_owned(),
            description: description.to_owned(),
            owner: owner.to_owned(),
            priority,
            status: ActionStatus::Open,
            due_date: None,
        };

        SummaryDocument {
            title: format!("Post-Mortem: {}", incident.title),
            summary: format!(
                "{description}. The incident lasted {duration} with {severity} severity. Through \
                 collaborative investigation in a case room, the team identified the root cause \
                 and developed actionable prevention measures."
            ),
            timeline: timeline_section(&incident.timeline),
            root_cause: hypothesis.root_cause.clone(),
            impact: format!(
                "Service disruption lasted {duration}. Severity level: {severity}. Affected \
                 services: {services}. The incident was resolved through coordinated team \
                 response and systematic investigation."
            ),
            resolution: format!(
                "Resolution achieved through: {}. The investigation team worked collaboratively \
                 to identify the root cause and implement fixes. Key responders: {responders}.",
                hypothesis.description
            ),
            action_items: vec![
                action(
                    "action-1",
                    "Implement monitoring and alerting improvements to detect similar issues earlier",
                    "SRE Team",
                    ActionPriority::High,
                ),
                action(
                    "action-2",
                    "Update incident response procedures based on lessons learned",
                    "Engineering Team",
                    ActionPriority::Medium,
                ),
                action(
                    "action-3",
                    "Conduct team review of root cause prevention measures",
                    "Team Lead",
                    ActionPriority::Medium,
                ),
            ],
            lessons: strings(&[
                "Collaborative investigation improved team understanding of the incident",
                "Real-time evidence analysis accelerated root cause identification",
                "Multiple team perspectives led to more comprehensive solutions",
                "A shared case room made remote incident investigation effective",
                "Systematic theory testing prevented premature conclusions",
            ]),
        }
    }
}

#[async_trait]
impl SummaryWriter for TemplateSummaryWriter {
    async fn generate_summary(
        &self,
        incident: &IncidentRecord,
        hypothesis: &Hypothesis,
        _evidence: &[EvidenceItem],
    ) -> Result<SummaryDocument, IntegrationError> {
        Ok(Self::document(incident, hypothesis))
    }
}

/// Human-readable span: `Xh Ym` from one hour up, `Y minutes` below.
#[must_use]
pub fn format_duration(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let minutes = (end - start).num_minutes().max(0);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes} minutes")
    }
}

fn timeline_section(timeline: &[TimelineEvent]) -> String {
    if timeline.is_empty() {
        return "Timeline reconstruction in progress...".to_owned();
    }
    timeline
        .iter()
        .take(SUMMARY_TIMELINE_LIMIT)
        .map(|event| {
            format!(
                "{}: {}\n   {}",
                event.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                event.title,
                event.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
