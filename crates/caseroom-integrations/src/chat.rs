//! Minimal client for an OpenAI-compatible chat completions API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::IntegrationError;
use crate::fallback::ANALYST_NAME;

/// Per-request HTTP timeout. Callers also bound the whole call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

fn persona() -> String {
    format!(
        "You are {ANALYST_NAME}, a seasoned incident investigator. You review production \
         incidents like a detective reviews a case: methodical, precise and focused on \
         evidence. Always answer with a single JSON object and nothing else."
    )
}

/// Sends prompts to a chat completions endpoint and decodes JSON replies.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    /// Creates a client for `base_url` (for example `https://api.openai.com/v1`).
    ///
    /// # Errors
    ///
    /// Returns `IntegrationError::Request` if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, IntegrationError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// The configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends `prompt` and decodes the reply content as `T`.
    ///
    /// # Errors
    ///
    /// Returns `IntegrationError::Request` on transport failure,
    /// `IntegrationError::Status` on a non-success status and
    /// `IntegrationError::Parse` if the reply is not the expected JSON.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        temperature: f32,
    ) -> Result<T, IntegrationError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": persona() },
                { "role": "user", "content": prompt },
            ],
            "temperature": temperature,
            "response_format": { "type": "json_object" },
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(IntegrationError::Status { status, body });
        }

        let resp_json: Value = resp.json().await?;
        let content = extract_content(&resp_json)?;
        debug!(model = %self.model, bytes = content.len(), "chat completion received");
        Ok(serde_json::from_str(content)?)
    }
}

/// Pulls the first choice's message text out of a completions response.
fn extract_content(response: &Value) -> Result<&str, IntegrationError> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| IntegrationError::Parse("completion has no message content".to_owned()))
}
