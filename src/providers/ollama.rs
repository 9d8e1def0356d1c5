//! Ollama provider implementation using the `/api/chat` API.
//!
//! Lets the full pipeline run against a local model with no API key.

use serde::{Deserialize, Serialize};

use super::{check_http_response, CompletionRequest, LlmProvider, OracleError, OracleResponse};

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Ollama chat API request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OllamaRequest {
    /// Model name.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<OllamaMessage>,
    /// Streaming disabled; the oracle contract is one blob.
    pub stream: bool,
    /// Generation options.
    pub options: OllamaOptions,
}

/// A message in Ollama chat format.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct OllamaMessage {
    /// Role (`system`, `user`, `assistant`).
    pub role: String,
    /// Plain text content.
    pub content: String,
}

/// Ollama generation options.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OllamaOptions {
    /// Maximum tokens to generate.
    pub num_predict: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Ollama chat API response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OllamaResponse {
    /// Model that served the response.
    pub model: String,
    /// Assistant message.
    pub message: OllamaMessage,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Ollama local chat provider.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider (e.g. base url `http://localhost:11434`).
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }
}

/// Build an Ollama API request from a completion request.
#[doc(hidden)]
pub fn build_request(model: &str, request: &CompletionRequest) -> OllamaRequest {
    OllamaRequest {
        model: model.to_owned(),
        messages: request
            .messages
            .iter()
            .map(|m| OllamaMessage {
                role: m.role.as_str().to_owned(),
                content: m.content.clone(),
            })
            .collect(),
        stream: false,
        options: OllamaOptions {
            num_predict: request.max_tokens,
            temperature: request.temperature,
        },
    }
}

/// Parse an Ollama API response into an oracle response.
///
/// # Errors
///
/// Returns `OracleError::Parse` if the body cannot be deserialized.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<OracleResponse, OracleError> {
    let resp: OllamaResponse =
        serde_json::from_str(body).map_err(|e| OracleError::Parse(e.to_string()))?;
    Ok(OracleResponse {
        text: resp.message.content,
        model: resp.model,
    })
}

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<OracleResponse, OracleError> {
        let api_request = build_request(&self.model, &request);
        let url = format!("{}/api/chat", self.base_url);

        let response = self.client.post(&url).json(&api_request).send().await?;

        // A 404 from Ollama means the model is not pulled.
        if response.status().as_u16() == 404 {
            return Err(OracleError::Unavailable(format!(
                "model '{}' not found on Ollama server",
                self.model
            )));
        }

        let payload = check_http_response(response).await?;
        parse_response(&payload)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    #[test]
    fn test_build_request_disables_streaming() {
        let req = build_request(
            "llama3",
            &CompletionRequest {
                messages: vec![ChatMessage::user("hi")],
                max_tokens: 256,
                temperature: 0.3,
            },
        );
        assert!(!req.stream);
        assert_eq!(req.options.num_predict, 256);
        assert_eq!(req.messages[0].role, "user");
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{"model":"llama3","message":{"role":"assistant","content":"Hello!"}}"#;
        let resp = parse_response(body).expect("should parse");
        assert_eq!(resp.text, "Hello!");
        assert_eq!(resp.model, "llama3");
    }

    #[test]
    fn test_parse_response_invalid() {
        assert!(matches!(
            parse_response("{\"oops\": true}"),
            Err(OracleError::Parse(_))
        ));
    }
}
