//! The generative-model seam.
//!
//! Every call into a text-generation service goes through `TextGenerator`,
//! so the classifier, the call agent, and the orchestrator can be exercised
//! with mocks and the backend swapped by configuration.

use async_trait::async_trait;

/// A single generation request: system instructions plus one user prompt.
///
/// Conversation history is rendered into the prompt by the caller; the
/// boundary itself is stateless request/response.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: usize,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: 1024,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Text generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the request.
    async fn generate(&self, request: GenerateRequest) -> crate::Result<String>;

    /// Backend identifier for logs
    fn model_name(&self) -> &str;
}
