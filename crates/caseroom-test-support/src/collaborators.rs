//! Collaborator doubles: canned answers, call recording, failure and delay.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use caseroom_integrations::error::IntegrationError;
use caseroom_integrations::{IncidentAnalyst, IncidentSource, SummaryWriter};
use caseroom_session::domain::evidence::EvidenceItem;
use caseroom_session::domain::hypothesis::{Hypothesis, ValidationAnnotation};
use caseroom_session::domain::incident::{IncidentAnalysis, IncidentRecord, SummaryDocument};

/// Returns a fixed incident record, with the requested id.
#[derive(Debug, Clone)]
pub struct StubIncidentSource(pub IncidentRecord);

#[async_trait]
impl IncidentSource for StubIncidentSource {
    async fn fetch_incident(&self, incident_id: &str) -> Result<IncidentRecord, IntegrationError> {
        let mut record = self.0.clone();
        record.id = incident_id.to_owned();
        Ok(record)
    }
}

/// Returns a fixed analysis and annotation, recording which hypotheses were
/// validated.
#[derive(Debug)]
pub struct StubAnalyst {
    analysis: IncidentAnalysis,
    validation: ValidationAnnotation,
    validated: Mutex<Vec<String>>,
}

impl StubAnalyst {
    /// Create an analyst answering with `analysis` and `validation`.
    #[must_use]
    pub fn new(analysis: IncidentAnalysis, validation: ValidationAnnotation) -> Self {
        Self {
            analysis,
            validation,
            validated: Mutex::new(Vec::new()),
        }
    }

    /// Ids of the hypotheses validated so far, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn validated(&self) -> Vec<String> {
        self.validated.lock().unwrap().clone()
    }
}

#[async_trait]
impl IncidentAnalyst for StubAnalyst {
    async fn analyze_incident(
        &self,
        _incident: &IncidentRecord,
    ) -> Result<IncidentAnalysis, IntegrationError> {
        Ok(self.analysis.clone())
    }

    async fn validate_hypothesis(
        &self,
        hypothesis: &Hypothesis,
        _evidence: &[EvidenceItem],
    ) -> Result<ValidationAnnotation, IntegrationError> {
        self.validated.lock().unwrap().push(hypothesis.id.clone());
        Ok(self.validation.clone())
    }
}

/// Returns a fixed summary document and counts calls.
#[derive(Debug)]
pub struct StubSummaryWriter {
    document: SummaryDocument,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubSummaryWriter {
    /// Create a writer answering with `document`.
    #[must_use]
    pub fn new(document: SummaryDocument) -> Self {
        Self::with_delay(document, Duration::ZERO)
    }

    /// Create a writer that waits `delay` before answering.
    #[must_use]
    pub fn with_delay(document: SummaryDocument, delay: Duration) -> Self {
        Self {
            document,
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `generate_summary` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummaryWriter for StubSummaryWriter {
    async fn generate_summary(
        &self,
        _incident: &IncidentRecord,
        _hypothesis: &Hypothesis,
        _evidence: &[EvidenceItem],
    ) -> Result<SummaryDocument, IntegrationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.document.clone())
    }
}

/// Fails every call as an unavailable upstream. Useful for testing the
/// fallback paths.
#[derive(Debug, Clone, Copy)]
pub struct FailingCollaborator;

fn unavailable<T>() -> Result<T, IntegrationError> {
    Err(IntegrationError::Status {
        status: 503,
        body: "service unavailable".into(),
    })
}

#[async_trait]
impl IncidentSource for FailingCollaborator {
    async fn fetch_incident(&self, _incident_id: &str) -> Result<IncidentRecord, IntegrationError> {
        unavailable()
    }
}

#[async_trait]
impl IncidentAnalyst for FailingCollaborator {
    async fn analyze_incident(
        &self,
        _incident: &IncidentRecord,
    ) -> Result<IncidentAnalysis, IntegrationError> {
        unavailable()
    }

    async fn validate_hypothesis(
        &self,
        _hypothesis: &Hypothesis,
        _evidence: &[EvidenceItem],
    ) -> Result<ValidationAnnotation, IntegrationError> {
        unavailable()
    }
}

#[async_trait]
impl SummaryWriter for FailingCollaborator {
    async fn generate_summary(
        &self,
        _incident: &IncidentRecord,
        _hypothesis: &Hypothesis,
        _evidence: &[EvidenceItem],
    ) -> Result<SummaryDocument, IntegrationError> {
        unavailable()
    }
}

/// Sleeps for the configured delay before failing. Paired with a shorter
/// collaborator timeout to exercise the timeout path.
#[derive(Debug, Clone, Copy)]
pub struct SlowCollaborator(pub Duration);

impl SlowCollaborator {
    async fn stall<T>(&self) -> Result<T, IntegrationError> {
        tokio::time::sleep(self.0).await;
        Err(IntegrationError::Timeout(self.0))
    }
}

#[async_trait]
impl IncidentSource for SlowCollaborator {
    async fn fetch_incident(&self, _incident_id: &str) -> Result<IncidentRecord, IntegrationError> {
        self.stall().await
    }
}

#[async_trait]
impl IncidentAnalyst for SlowCollaborator {
    async fn analyze_incident(
        &self,
        _incident: &IncidentRecord,
    ) -> Result<IncidentAnalysis, IntegrationError> {
        self.stall().await
    }

    async fn validate_hypothesis(
        &self,
        _hypothesis: &Hypothesis,
        _evidence: &[EvidenceItem],
    ) -> Result<ValidationAnnotation, IntegrationError> {
        self.stall().await
    }
}

#[async_trait]
impl SummaryWriter for SlowCollaborator {
    async fn generate_summary(
        &self,
        _incident: &IncidentRecord,
        _hypothesis: &Hypothesis,
        _evidence: &[EvidenceItem],
    ) -> Result<SummaryDocument, IntegrationError> {
        self.stall().await
    }
}
