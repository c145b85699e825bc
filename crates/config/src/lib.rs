//! Configuration for fixline
//!
//! Settings are layered: `config/default.yaml`, then `config/{env}.yaml`,
//! then `FIXLINE_`-prefixed environment variables, highest last.

pub mod settings;

pub use settings::{
    load_settings, BridgeConfig, ClassifierConfig, LlmConfig, MatcherConfig, ObservabilityConfig,
    RetryConfig, ServerConfig, Settings, TelephonyConfig, VoiceServiceConfig,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
