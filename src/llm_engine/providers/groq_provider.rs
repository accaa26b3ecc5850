//! Groq API provider
//!
//! Talks to an OpenAI-compatible chat completions endpoint
//! (default: api.groq.com)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::llm_engine::provider::{
    CompletionRequest, CompletionResponse, LlmError, LlmProvider,
};

/// Chat message in the OpenAI wire format
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

/// Chat completion response body
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<ChatCompletionUsage>,
}

/// Groq provider configuration
#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: String::new(),
            timeout_secs: 60,
        }
    }
}

impl GroqConfig {
    /// Read the API key (and optional base url) from the environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            config.api_key = key;
        }
        if let Ok(url) = std::env::var("GROQ_BASE_URL") {
            config.base_url = url;
        }
        config
    }
}

/// Groq oracle provider
pub struct GroqProvider {
    config: GroqConfig,
    client: Client,
}

impl GroqProvider {
    pub fn new(config: GroqConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    pub fn with_default_config() -> Self {
        Self::new(GroqConfig::default())
    }

    async fn send_once(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let body = ChatCompletionRequest {
            model: request.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    LlmError::ProviderUnavailable(format!("Cannot reach oracle: {}", e))
                } else {
                    LlmError::RequestFailed(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LlmError::AuthenticationFailed(format!(
                "Oracle rejected credentials ({})",
                status
            )));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(LlmError::ProviderUnavailable(format!(
                    "Oracle returned {}: {}",
                    status, error_text
                )));
            }
            return Err(LlmError::RequestFailed(format!(
                "Oracle returned {}: {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::RequestFailed(format!("Invalid response: {}", e)))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::RequestFailed("Oracle returned no choices".to_string()))?;

        Ok(CompletionResponse {
            content: choice.message.content,
            model: completion.model.unwrap_or_else(|| request.model.clone()),
            prompt_tokens: completion.usage.as_ref().and_then(|u| u.prompt_tokens),
            completion_tokens: completion.usage.as_ref().and_then(|u| u.completion_tokens),
        })
    }

    fn is_transient(err: &LlmError) -> bool {
        matches!(err, LlmError::ProviderUnavailable(_))
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn provider_name(&self) -> &'static str {
        "groq"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if self.config.api_key.is_empty() {
            return Err(LlmError::NotInitialized);
        }

        match self.send_once(&request).await {
            Err(err) if Self::is_transient(&err) => {
                // One retry on transient failures, then surface the error
                log::warn!("Oracle request failed ({}), retrying once", err);
                self.send_once(&request).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GroqProvider::is_transient(&LlmError::ProviderUnavailable(
            "timeout".to_string()
        )));
        assert!(!GroqProvider::is_transient(&LlmError::RequestFailed(
            "400".to_string()
        )));
        assert!(!GroqProvider::is_transient(
            &LlmError::AuthenticationFailed("401".to_string())
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_not_initialized() {
        let provider = GroqProvider::with_default_config();
        let request = CompletionRequest::new("llama3-70b-8192", "hola", 0.2);
        match provider.complete(request).await {
            Err(LlmError::NotInitialized) => {}
            other => panic!("Expected NotInitialized, got {:?}", other),
        }
    }
}
