//! Call Agent
//!
//! Everything around a call that is not the live audio relay: building the
//! call's system prompt, answering mid-call reasoning requests, detecting
//! voicemail, turning a finished transcript into a durable outcome,
//! persisting call records, and scheduling retries.

pub mod prompts;
pub mod reasoning;
pub mod records;
pub mod response;
pub mod retry;
pub mod summary;
pub mod voicemail;

pub use prompts::system_prompt;
pub use reasoning::{request_reasoning, REASONING_FALLBACK};
pub use records::CallRecorder;
pub use response::{generate_response, BusinessNotification};
pub use retry::{backoff_delay, RetryAttempt, RetryScheduler};
pub use summary::{degraded_outcome, summarize_call};
pub use voicemail::detect_voicemail;

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<fixline_persistence::PersistenceError> for AgentError {
    fn from(err: fixline_persistence::PersistenceError) -> Self {
        AgentError::Persistence(err.to_string())
    }
}
