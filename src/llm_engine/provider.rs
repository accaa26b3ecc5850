//! Text-generation oracle trait and types
//!
//! Defines the common interface for the remote text-generation service used
//! by topic detection, question generation and summary analysis.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error types for oracle operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LlmError {
    /// Service not reachable (network down, timeout)
    ProviderUnavailable(String),
    /// API key missing or invalid
    AuthenticationFailed(String),
    /// Request failed (non-success status, malformed response envelope)
    RequestFailed(String),
    /// Invalid request parameters
    InvalidRequest(String),
    /// Provider not configured
    NotInitialized,
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ProviderUnavailable(msg) => write!(f, "Provider unavailable: {}", msg),
            LlmError::AuthenticationFailed(msg) => write!(f, "Authentication failed: {}", msg),
            LlmError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
            LlmError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            LlmError::NotInitialized => write!(f, "Provider not initialized"),
        }
    }
}

impl std::error::Error for LlmError {}

/// Request for a single-prompt completion
///
/// The pipeline always sends exactly one user-role prompt; detection and
/// summary prompts run cooler than question generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier understood by the provider
    pub model: String,
    /// The user-role prompt
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate (None = provider default)
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature,
            max_tokens: None,
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text content
    pub content: String,
    /// Model that generated the response
    pub model: String,
    /// Number of tokens in the prompt
    pub prompt_tokens: Option<u32>,
    /// Number of tokens generated
    pub completion_tokens: Option<u32>,
}

/// The trait every oracle backend implements
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "groq")
    fn provider_name(&self) -> &'static str;

    /// Run a completion request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
