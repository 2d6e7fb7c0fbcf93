//! Shared application state.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use caseroom_core::clock::{Clock, SystemClock};
use caseroom_core::rng::{DeterministicRng, SystemRng};
use caseroom_integrations::analyst::ChatAnalyst;
use caseroom_integrations::chat::ChatClient;
use caseroom_integrations::fallback::{CannedAnalyst, SampleIncidentSource, TemplateSummaryWriter};
use caseroom_integrations::incident_io::IncidentIoClient;
use caseroom_integrations::summary::ChatSummaryWriter;
use caseroom_integrations::{IncidentAnalyst, IncidentSource, SummaryWriter};
use caseroom_session::broadcast::Broadcaster;
use caseroom_session::presence::PresenceTracker;
use caseroom_session::store::RoomStore;
use tracing::info;

use crate::config::AppConfig;
use crate::error::AppError;

/// The external collaborators and the bound on each call.
#[derive(Clone)]
pub struct Collaborators {
    /// Incident records.
    pub incidents: Arc<dyn IncidentSource>,
    /// Analysis and hypothesis validation.
    pub analyst: Arc<dyn IncidentAnalyst>,
    /// Summary documents.
    pub summaries: Arc<dyn SummaryWriter>,
    /// Upper bound on every call.
    pub timeout: Duration,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Local adapters only.
    #[must_use]
    pub fn fallback(timeout: Duration) -> Self {
        Self {
            incidents: Arc::new(SampleIncidentSource),
            analyst: Arc::new(CannedAnalyst),
            summaries: Arc::new(TemplateSummaryWriter),
            timeout,
        }
    }

    /// Live adapters where credentials are configured, local ones elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if an HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let mut collaborators = Self::fallback(config.collaborator_timeout);

        if let Some(api) = &config.incident_api {
            let client = IncidentIoClient::new(&api.base_url, &api.api_key)
                .map_err(|e| AppError::Config(format!("incident API client: {e}")))?;
            collaborators.incidents = Arc::new(client);
            info!(base_url = %api.base_url, "using live incident source");
        }
        if let Some(api) = &config.analysis_api {
            let chat = ChatClient::new(&api.base_url, &api.api_key, &api.model)
                .map_err(|e| AppError::Config(format!("analysis API client: {e}")))?;
            collaborators.analyst = Arc::new(ChatAnalyst::new(chat.clone()));
            collaborators.summaries = Arc::new(ChatSummaryWriter::new(chat));
            info!(model = %api.model, "using live analyst and summary writer");
        }
        Ok(collaborators)
    }
}

/// Application state shared across all request handlers and connections.
#[derive(Clone)]
pub struct AppState {
    /// Clock for event timestamps.
    pub clock: Arc<dyn Clock>,
    /// RNG for room codes.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// All active rooms.
    pub store: Arc<RoomStore>,
    /// Live connections and their subscriptions.
    pub presence: Arc<PresenceTracker>,
    /// Room event fan-out.
    pub broadcaster: Broadcaster,
    /// External collaborators.
    pub collaborators: Collaborators,
    /// Server configuration.
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("rooms", &self.store.len())
            .field("collaborators", &self.collaborators)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create new application state with an empty room store.
    #[must_use]
    pub fn new(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        rng: Arc<Mutex<dyn DeterministicRng + Send>>,
        collaborators: Collaborators,
    ) -> Self {
        let presence = Arc::new(PresenceTracker::new());
        Self {
            clock,
            rng,
            store: Arc::new(RoomStore::new()),
            broadcaster: Broadcaster::new(Arc::clone(&presence)),
            presence,
            collaborators,
            config: Arc::new(config),
        }
    }

    /// Production state: system clock, OS-seeded RNG and configured
    /// collaborators.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a collaborator cannot be built.
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let collaborators = Collaborators::from_config(&config)?;
        Ok(Self::new(
            config,
            Arc::new(SystemClock),
            Arc::new(Mutex::new(SystemRng::new())),
            collaborators,
        ))
    }
}
