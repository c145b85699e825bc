//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Lead classifier configuration
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Business matcher configuration
    #[serde(default)]
    pub matcher: MatcherConfig,

    /// Session bridge configuration
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Call retry configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Text-generation backend configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Voice-generation service configuration
    #[serde(default)]
    pub voice: VoiceServiceConfig,

    /// Telephony provider configuration
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP/WebSocket server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty means same-origin only
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_port() -> u16 {
    8080
}

fn default_max_sessions() -> usize {
    200
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            cors_origins: Vec::new(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Lead classifier configuration.
///
/// `quality_threshold` gates matching: leads scoring below it are terminal
/// low-quality and never reach the matcher. It is a configuration input, not
/// a constant; the shipped `config/default.yaml` sets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
    /// Cap on requirement phrases kept per lead
    #[serde(default = "default_max_requirements")]
    pub max_requirements: usize,
}

fn default_quality_threshold() -> f64 {
    5.0
}

fn default_max_requirements() -> usize {
    8
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            quality_threshold: default_quality_threshold(),
            max_requirements: default_max_requirements(),
        }
    }
}

/// Business matcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Maximum effective radius for the proximity component, in miles
    #[serde(default = "default_max_radius")]
    pub max_radius_miles: f64,
    /// Points awarded at zero distance, tapering to zero at the radius
    #[serde(default = "default_proximity_weight")]
    pub proximity_weight: u32,
    /// Points per rating star (rating in [0,5])
    #[serde(default = "default_rating_weight")]
    pub rating_weight: u32,
    /// Flat boost for emergency leads matched to emergency-capable businesses
    #[serde(default = "default_emergency_boost")]
    pub emergency_boost: u32,
    /// Base points for passing the category gate
    #[serde(default = "default_category_base")]
    pub category_base: u32,
}

fn default_max_radius() -> f64 {
    25.0
}

fn default_proximity_weight() -> u32 {
    35
}

fn default_rating_weight() -> u32 {
    5
}

fn default_emergency_boost() -> u32 {
    15
}

fn default_category_base() -> u32 {
    20
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_radius_miles: default_max_radius(),
            proximity_weight: default_proximity_weight(),
            rating_weight: default_rating_weight(),
            emergency_boost: default_emergency_boost(),
            category_base: default_category_base(),
        }
    }
}

/// Session bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Hard call-duration ceiling enforced by the bridge itself
    #[serde(default = "default_max_call_secs")]
    pub max_call_duration_secs: u64,
    /// Grace delay after voicemail detection before forced hangup
    #[serde(default = "default_voicemail_grace_secs")]
    pub voicemail_grace_secs: u64,
    /// Ceiling on one relayed frame send before the session is torn down
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Ceiling on the post-call summary generation
    #[serde(default = "default_summary_timeout_secs")]
    pub summary_timeout_secs: u64,
}

fn default_max_call_secs() -> u64 {
    300
}

fn default_voicemail_grace_secs() -> u64 {
    3
}

fn default_send_timeout_ms() -> u64 {
    5000
}

fn default_summary_timeout_secs() -> u64 {
    20
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_call_duration_secs: default_max_call_secs(),
            voicemail_grace_secs: default_voicemail_grace_secs(),
            send_timeout_ms: default_send_timeout_ms(),
            summary_timeout_secs: default_summary_timeout_secs(),
        }
    }
}

/// Call retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// First retry delay; doubles per attempt
    #[serde(default = "default_base_delay_minutes")]
    pub base_delay_minutes: u64,
    /// Attempts beyond this are dropped
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_base_delay_minutes() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_minutes: default_base_delay_minutes(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Text-generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// API key; falls back to ANTHROPIC_API_KEY when empty
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
}

fn default_llm_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_llm_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_llm_max_tokens() -> usize {
    1024
}

fn default_llm_temperature() -> f32 {
    0.3
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key: String::new(),
            timeout_secs: default_llm_timeout_secs(),
            max_tokens: default_llm_max_tokens(),
            temperature: default_llm_temperature(),
        }
    }
}

/// Voice-generation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceServiceConfig {
    #[serde(default = "default_voice_url")]
    pub url: String,
    /// API key; falls back to VOICE_SERVICE_API_KEY when empty
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_voice_identity")]
    pub voice: String,
    /// Audio codec for both directions of the media stream
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
    /// Server-side voice-activity-detection silence window, milliseconds
    #[serde(default = "default_vad_silence_ms")]
    pub vad_silence_ms: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_voice_url() -> String {
    "wss://voice.example.com/v1/realtime".to_string()
}

fn default_voice_identity() -> String {
    "alloy".to_string()
}

fn default_audio_format() -> String {
    "g711_ulaw".to_string()
}

fn default_vad_silence_ms() -> u32 {
    500
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for VoiceServiceConfig {
    fn default() -> Self {
        Self {
            url: default_voice_url(),
            api_key: String::new(),
            voice: default_voice_identity(),
            audio_format: default_audio_format(),
            vad_silence_ms: default_vad_silence_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Telephony provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    /// Public WebSocket URL the provider opens the media stream to
    #[serde(default = "default_stream_url")]
    pub stream_url: String,
    /// Short greeting spoken while the stream connects
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_stream_url() -> String {
    "wss://localhost:8080/media-stream".to_string()
}

fn default_greeting() -> String {
    "Please hold while we connect you.".to_string()
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            stream_url: default_stream_url(),
            greeting: default_greeting(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl Settings {
    /// Validate cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=10.0).contains(&self.classifier.quality_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "classifier.quality_threshold".to_string(),
                message: format!(
                    "must be within [0, 10], got {}",
                    self.classifier.quality_threshold
                ),
            });
        }
        if self.matcher.max_radius_miles <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "matcher.max_radius_miles".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.bridge.max_call_duration_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "bridge.max_call_duration_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Load settings from files and environment.
///
/// Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("FIXLINE")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.retry.base_delay_minutes, 30);
        assert!((settings.classifier.quality_threshold - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut settings = Settings::default();
        settings.classifier.quality_threshold = 12.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_duration() {
        let mut settings = Settings::default();
        settings.bridge.max_call_duration_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_deserialize_partial_yaml() {
        let yaml = r#"
            classifier:
              quality_threshold: 6.5
            bridge:
              max_call_duration_secs: 180
        "#;
        let settings: Settings = serde_yaml_from_str(yaml);
        assert!((settings.classifier.quality_threshold - 6.5).abs() < f64::EPSILON);
        assert_eq!(settings.bridge.max_call_duration_secs, 180);
        // untouched sections keep their defaults
        assert_eq!(settings.server.port, 8080);
    }

    // Small helper so the test reads like the config files do, without a
    // direct serde_yaml dependency: route through the config crate.
    fn serde_yaml_from_str(yaml: &str) -> Settings {
        let cfg = Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap();
        cfg.try_deserialize().unwrap()
    }
}
