//! Shared error types

use thiserror::Error;

/// Errors shared across the pipeline crates
#[derive(Error, Debug)]
pub enum Error {
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using the shared error
pub type Result<T> = std::result::Result<T, Error>;
