//! LLM service for the clarification engine
//!
//! Thin client for the Anthropic Messages API. The [`Completion`] trait is
//! the seam the LLM engine depends on, so engine logic can be tested against
//! a mock instead of the network.

use crate::error::{ElicitError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Configuration for LLM service
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Anthropic API key
    pub api_key: String,

    /// Model to use
    pub model: String,

    /// Max tokens for responses
    pub max_tokens: usize,

    /// Temperature for sampling
    pub temperature: f32,
}

/// Single-prompt text completion
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Completion: Send + Sync {
    /// Complete `prompt`, stopping before any of `stop`
    async fn complete(&self, prompt: &str, stop: &[String]) -> Result<String>;
}

/// LLM service backed by the Anthropic Messages API
pub struct LlmService {
    config: LlmConfig,
    client: reqwest::Client,
}

/// Anthropic API message format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    text: String,
}

impl LlmService {
    /// Create a new LLM service with custom config
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ElicitError::Config(config::ConfigError::Message(
                "API key not set".to_string(),
            )));
        }

        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_request(&self, prompt: &str, stop: &[String]) -> AnthropicRequest {
        AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stop_sequences: stop.to_vec(),
        }
    }
}

#[async_trait]
impl Completion for LlmService {
    async fn complete(&self, prompt: &str, stop: &[String]) -> Result<String> {
        debug!("Calling Anthropic API ({} prompt chars)", prompt.len());

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&self.build_request(prompt, stop))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ElicitError::LlmApi(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ElicitError::LlmApi(format!("Failed to parse response: {}", e)))?;

        let text: String = api_response
            .content
            .iter()
            .map(|c| c.text.as_str())
            .collect();

        if text.trim().is_empty() {
            return Err(ElicitError::LlmApi("Empty response from API".to_string()));
        }
        Ok(text)
    }
}
