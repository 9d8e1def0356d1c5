//! OpenAI provider implementation using the `/v1/chat/completions` API.

use serde::{Deserialize, Serialize};

use super::{check_http_response, CompletionRequest, LlmProvider, OracleError, OracleResponse};
use crate::types::ChatMessage;

const DEFAULT_API_BASE: &str = "https://api.openai.com";

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// OpenAI chat completions API request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<OpenAiMessage>,
    /// Maximum completion tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// A message in OpenAI chat format.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiMessage {
    /// Role (`system`, `user`, `assistant`).
    pub role: String,
    /// Plain text content.
    pub content: String,
}

/// OpenAI chat completions API response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiResponse {
    /// Response choices.
    pub choices: Vec<OpenAiChoice>,
    /// Model that served the response.
    pub model: String,
}

/// A response choice from OpenAI.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiChoice {
    /// Assistant message for this choice.
    pub message: OpenAiResponseMessage,
}

/// Assistant message from OpenAI.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiResponseMessage {
    /// Text content (absent for refusals on some models).
    pub content: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// OpenAI chat completions API provider.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider against the default API base.
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_API_BASE, model, api_key)
    }

    /// Create a provider against a custom API base (compatible servers).
    pub fn with_base_url(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Build an OpenAI API request from a completion request.
#[doc(hidden)]
pub fn build_request(model: &str, request: &CompletionRequest) -> OpenAiRequest {
    let messages = request
        .messages
        .iter()
        .map(|m: &ChatMessage| OpenAiMessage {
            role: m.role.as_str().to_owned(),
            content: m.content.clone(),
        })
        .collect();

    OpenAiRequest {
        model: model.to_owned(),
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    }
}

/// Parse an OpenAI API response into an oracle response.
///
/// # Errors
///
/// Returns `OracleError::Parse` if the body cannot be deserialized or the
/// first choice carries no text content.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<OracleResponse, OracleError> {
    let resp: OpenAiResponse =
        serde_json::from_str(body).map_err(|e| OracleError::Parse(e.to_string()))?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| OracleError::Parse("missing choices[0]".to_owned()))?;

    let text = choice
        .message
        .content
        .ok_or_else(|| OracleError::Parse("choices[0].message has no content".to_owned()))?;

    Ok(OracleResponse {
        text,
        model: resp.model,
    })
}

// ---------------------------------------------------------------------------
// Trait impl
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<OracleResponse, OracleError> {
        let api_request = build_request(&self.model, &request);
        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", self.api_key))
            .json(&api_request)
            .send()
            .await?;

        let payload = check_http_response(response).await?;
        parse_response(&payload)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
