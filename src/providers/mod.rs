//! Oracle provider abstraction layer.
//!
//! Defines the [`LlmProvider`] trait and the shared request/response types
//! used by all provider implementations. The oracle contract is minimal:
//! an ordered list of `{role, text}` messages in, a single text blob out.
//!
//! Two providers are implemented:
//! - [`openai::OpenAiProvider`] — OpenAI `/v1/chat/completions` API
//! - [`ollama::OllamaProvider`] — Ollama `/api/chat` API
//!
//! [`retry::RetryingOracle`] wraps any provider with bounded retry for
//! transient failures.

use async_trait::async_trait;
use regex::Regex;

use crate::types::ChatMessage;

pub mod ollama;
pub mod openai;
pub mod retry;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use retry::{RetryPolicy, RetryingOracle};

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

/// A request to the oracle for a completion.
///
/// The message list is the full ordered payload, including any system
/// instruction as the first element; there is no separate system slot.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Ordered conversation payload.
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens in the response.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// The oracle's response: one text blob, no streaming.
#[derive(Debug, Clone)]
pub struct OracleResponse {
    /// Raw generated text, possibly wrapped in formatting artifacts.
    pub text: String,
    /// The model identifier that served this response.
    pub model: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by oracle providers.
///
/// These cover transport, auth, rate-limit, and response-shape failures.
/// Content-level failures (the oracle returned text that does not validate)
/// belong to [`crate::extract::ExtractError`] instead.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// HTTP transport failure.
    #[error("oracle request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response body did not match the provider's wire schema.
    #[error("oracle response parse error: {0}")]
    Parse(String),
    /// Upstream provider responded with an error status.
    #[error("oracle returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// Provider cannot satisfy the request with current configuration.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    /// Bounded retry gave up after repeated transient failures.
    #[error("oracle retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Message of the final failure.
        last: String,
    },
}

impl OracleError {
    /// Whether this failure is transient and worth retrying.
    ///
    /// Transport failures, rate limits (429), and server errors (5xx)
    /// qualify. Parse failures, auth failures, and other client errors
    /// do not; retrying an identical bad request cannot help.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::Parse(_) | Self::Unavailable(_) | Self::RetriesExhausted { .. } => false,
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers (shared by all providers)
// ---------------------------------------------------------------------------

/// Check HTTP response status and return the body text or a structured error.
///
/// # Errors
///
/// Returns `OracleError::Request` on transport failure,
/// `OracleError::HttpStatus` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, OracleError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(OracleError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

fn sanitize_http_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    // API keys must never reach logs or user-facing error text.
    let mut sanitized = collapsed;
    for pattern in [r"sk-[A-Za-z0-9_\-]{20,}", r"Bearer [A-Za-z0-9_\-\.]{16,}"] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Core oracle interface.
///
/// Implementations must be `Send + Sync` so the orchestrator can hold one
/// behind an `Arc` across async call boundaries.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Request a completion from the oracle.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] on API, network, or wire-parse failure.
    async fn complete(&self, request: CompletionRequest) -> Result<OracleResponse, OracleError>;

    /// The model identifier string this provider is instantiated for.
    fn model_id(&self) -> &str;
}
