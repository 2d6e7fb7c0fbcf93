//! Capability traits for the external collaborators.

use async_trait::async_trait;
use caseroom_session::domain::evidence::EvidenceItem;
use caseroom_session::domain::hypothesis::{Hypothesis, ValidationAnnotation};
use caseroom_session::domain::incident::{IncidentAnalysis, IncidentRecord, SummaryDocument};

use crate::error::IntegrationError;

/// Retrieves incident records from an incident-management system.
#[async_trait]
pub trait IncidentSource: Send + Sync {
    /// Fetches the incident with the given external id.
    async fn fetch_incident(&self, incident_id: &str) -> Result<IncidentRecord, IntegrationError>;
}

/// Produces structured analysis of incidents and scores hypotheses.
#[async_trait]
pub trait IncidentAnalyst: Send + Sync {
    /// Builds the briefing, evidence categories and suggested hypotheses.
    async fn analyze_incident(
        &self,
        incident: &IncidentRecord,
    ) -> Result<IncidentAnalysis, IntegrationError>;

    /// Scores a hypothesis against the room's evidence.
    async fn validate_hypothesis(
        &self,
        hypothesis: &Hypothesis,
        evidence: &[EvidenceItem],
    ) -> Result<ValidationAnnotation, IntegrationError>;
}

/// Writes the summary document once a room has reached consensus.
#[async_trait]
pub trait SummaryWriter: Send + Sync {
    /// Generates a summary from the incident and the winning hypothesis.
    async fn generate_summary(
        &self,
        incident: &IncidentRecord,
        hypothesis: &Hypothesis,
        evidence: &[EvidenceItem],
    ) -> Result<SummaryDocument, IntegrationError>;
}
