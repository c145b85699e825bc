//! Fixline server
//!
//! The session bridge (telephony media stream ⇄ voice service relay) and
//! the HTTP surface around it: lead intake, call initiation, health, and
//! metrics.

pub mod bridge;
pub mod http;
pub mod metrics;
pub mod session;
pub mod setup;
pub mod state;
pub mod telephony;
pub mod voice;

pub use http::create_router;
pub use metrics::{init_metrics, metrics_handler};
pub use session::{BridgeState, CallSession, SessionTable};
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session error: {0}")]
    Session(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Voice service error: {0}")]
    VoiceService(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Session(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::Protocol(_) | ServerError::InvalidRequest(_) => {
                axum::http::StatusCode::BAD_REQUEST
            }
            ServerError::VoiceService(_)
            | ServerError::InvalidDocument(_)
            | ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
