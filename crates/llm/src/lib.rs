//! Text-generation boundary
//!
//! Single request/response calls to a Claude-compatible Messages API, plus
//! extraction of structured payloads from model responses that may wrap the
//! payload in prose or code fences.

pub mod backend;
pub mod extract;

pub use backend::{ClaudeBackend, ClaudeConfig};
pub use extract::{extract_json_payload, parse_structured};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No structured payload in response")]
    NoPayload,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

impl From<LlmError> for fixline_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::NoPayload | LlmError::InvalidResponse(_) => {
                fixline_core::Error::MalformedResponse(err.to_string())
            }
            other => fixline_core::Error::Generation(other.to_string()),
        }
    }
}
