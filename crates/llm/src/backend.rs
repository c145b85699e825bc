//! Claude backend
//!
//! Implements the Anthropic Messages API for the single request/response
//! calls this pipeline makes (classification, notifications, mid-call
//! reasoning, call summaries). No tool use, no streaming: every call site
//! needs the full response before it can act.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use fixline_core::{GenerateRequest, TextGenerator};

use crate::LlmError;

/// Configuration for the Claude backend
#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    /// API key (from ANTHROPIC_API_KEY or config)
    pub api_key: String,
    pub model: String,
    pub max_tokens: usize,
    /// Temperature (0.0 - 1.0)
    pub temperature: f32,
    pub timeout: Duration,
    /// API endpoint (for testing or proxy)
    pub endpoint: String,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            model: "claude-3-5-haiku-20241022".to_string(),
            max_tokens: 1024,
            temperature: 0.3,
            timeout: Duration::from_secs(30),
            endpoint: "https://api.anthropic.com".to_string(),
        }
    }
}

impl ClaudeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 1.0);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl From<&fixline_config::LlmConfig> for ClaudeConfig {
    fn from(cfg: &fixline_config::LlmConfig) -> Self {
        let api_key = if cfg.api_key.is_empty() {
            std::env::var("ANTHROPIC_API_KEY").unwrap_or_default()
        } else {
            cfg.api_key.clone()
        };
        Self {
            api_key,
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            timeout: Duration::from_secs(cfg.timeout_secs),
            endpoint: cfg.endpoint.clone(),
        }
    }
}

/// Claude Messages API client
pub struct ClaudeBackend {
    config: ClaudeConfig,
    client: Client,
}

impl ClaudeBackend {
    pub fn new(config: ClaudeConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Configuration(
                "ANTHROPIC_API_KEY not set. Set it via environment or config.".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    async fn complete(&self, request: &GenerateRequest) -> Result<String, LlmError> {
        let body = ClaudeRequest {
            model: self.config.model.clone(),
            max_tokens: request.max_tokens.min(self.config.max_tokens),
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            system: request.system.clone(),
            temperature: Some(self.config.temperature),
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.endpoint))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let response: ClaudeApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let mut text = String::new();
        for block in response.content {
            let ClaudeContentBlock::Text { text: t } = block;
            text.push_str(&t);
        }

        if text.is_empty() {
            return Err(LlmError::InvalidResponse("empty completion".to_string()));
        }

        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for ClaudeBackend {
    async fn generate(&self, request: GenerateRequest) -> fixline_core::Result<String> {
        let text = self.complete(&request).await?;
        tracing::debug!(model = %self.config.model, chars = text.len(), "Completion received");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// =============================================================================
// Claude API types
// =============================================================================

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: usize,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeApiResponse {
    content: Vec<ClaudeContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeContentBlock {
    Text { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ClaudeConfig::new("test-key")
            .with_model("claude-sonnet-4-20250514")
            .with_max_tokens(2048)
            .with_temperature(0.5);

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.model, "claude-sonnet-4-20250514");
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.temperature, 0.5);
    }

    #[test]
    fn test_temperature_clamped() {
        let config = ClaudeConfig::new("k").with_temperature(3.0);
        assert_eq!(config.temperature, 1.0);
    }

    #[test]
    fn test_backend_requires_api_key() {
        let config = ClaudeConfig {
            api_key: String::new(),
            ..Default::default()
        };
        assert!(ClaudeBackend::new(config).is_err());
    }

    #[test]
    fn test_request_serialization() {
        let request = ClaudeRequest {
            model: "claude-3-5-haiku-20241022".to_string(),
            max_tokens: 1024,
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: "Hello".to_string(),
            }],
            system: Some("You are helpful".to_string()),
            temperature: Some(0.3),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("claude-3-5-haiku-20241022"));
        assert!(json.contains("Hello"));
        assert!(json.contains("You are helpful"));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "content": [
                {"type": "text", "text": "Hello!"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }"#;

        let response: ClaudeApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.content.len(), 1);
    }
}
