//! Server configuration read from the environment.

use std::time::Duration;

use crate::error::AppError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_INCIDENT_API_BASE_URL: &str = "https://api.incident.io";
const DEFAULT_ANALYSIS_API_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ANALYSIS_MODEL: &str = "gpt-4";
const DEFAULT_COLLABORATOR_TIMEOUT_SECS: u64 = 20;

/// Connection settings of the incident-management API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentApiConfig {
    /// API root.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
}

/// Connection settings of the chat completions API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisApiConfig {
    /// API root.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model name.
    pub model: String,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Base URL used in join links.
    pub public_base_url: String,
    /// Live incident source; `None` selects the sample incident.
    pub incident_api: Option<IncidentApiConfig>,
    /// Live analysis and summary writer; `None` selects the local adapters.
    pub analysis_api: Option<AnalysisApiConfig>,
    /// Upper bound on every collaborator call.
    pub collaborator_timeout: Duration,
    /// Shared secret for webhook signatures; `None` disables verification.
    pub webhook_secret: Option<String>,
    /// OTLP collector endpoint; `None` disables trace export.
    pub otlp_endpoint: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_owned(),
            incident_api: None,
            analysis_api: None,
            collaborator_timeout: Duration::from_secs(DEFAULT_COLLABORATOR_TIMEOUT_SECS),
            webhook_secret: None,
            otlp_endpoint: None,
        }
    }
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable holds an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let port = match var("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => defaults.port,
        };
        let collaborator_timeout = match var("COLLABORATOR_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(AppError::Config(format!(
                        "COLLABORATOR_TIMEOUT_SECS must be a positive integer, got {raw}"
                    )));
                }
            },
            None => defaults.collaborator_timeout,
        };

        let incident_api = var("INCIDENT_API_KEY").map(|api_key| IncidentApiConfig {
            base_url: var("INCIDENT_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_INCIDENT_API_BASE_URL.to_owned()),
            api_key,
        });
        let analysis_api = var("ANALYSIS_API_KEY").map(|api_key| AnalysisApiConfig {
            base_url: var("ANALYSIS_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ANALYSIS_API_BASE_URL.to_owned()),
            api_key,
            model: var("ANALYSIS_MODEL").unwrap_or_else(|| DEFAULT_ANALYSIS_MODEL.to_owned()),
        });

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            public_base_url: var("PUBLIC_BASE_URL")
                .map_or(defaults.public_base_url, |url| url.trim_end_matches('/').to_owned()),
            incident_api,
            analysis_api,
            collaborator_timeout,
            webhook_secret: var("WEBHOOK_SECRET"),
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// Link participants follow to join the room with `code`.
    #[must_use]
    pub fn join_url(&self, code: &str) -> String {
        format!("{}/game/{code}", self.public_base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_empty_environment_uses_defaults_and_fallbacks() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.port, 3001);
        assert!(config.incident_api.is_none());
        assert!(config.analysis_api.is_none());
    }

    #[test]
    fn test_present_keys_select_live_collaborators() {
        // Arrange
        let pairs = [
            ("INCIDENT_API_KEY", "inc-key"),
            ("ANALYSIS_API_KEY", "llm-key"),
            ("ANALYSIS_MODEL", "gpt-4o"),
            ("PUBLIC_BASE_URL", "https://caseroom.example/"),
            ("COLLABORATOR_TIMEOUT_SECS", "5"),
        ];

        // Act
        let config = config_from(&pairs).unwrap();

        // Assert
        let incident_api = config.incident_api.unwrap();
        assert_eq!(incident_api.base_url, "https://api.incident.io");
        assert_eq!(incident_api.api_key, "inc-key");
        let analysis_api = config.analysis_api.unwrap();
        assert_eq!(analysis_api.model, "gpt-4o");
        assert_eq!(config.collaborator_timeout, Duration::from_secs(5));
        assert_eq!(config.public_base_url, "https://caseroom.example");
    }

    #[test]
    fn test_blank_key_counts_as_unset() {
        let config = config_from(&[("ANALYSIS_API_KEY", "  ")]).unwrap();
        assert!(config.analysis_api.is_none());
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        assert!(matches!(config_from(&[("PORT", "http")]), Err(AppError::Config(_))));
        assert!(matches!(
            config_from(&[("COLLABORATOR_TIMEOUT_SECS", "0")]),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_join_url_uses_public_base_url() {
        let config = AppConfig::default();
        assert_eq!(config.join_url("CASE-AB12"), "http://localhost:3000/game/CASE-AB12");
    }
}
