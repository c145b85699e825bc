//! Telephony media-stream events
//!
//! The provider delivers JSON-framed events over the media stream. They are
//! parsed once, here, into a closed set of tagged variants; nothing past
//! this boundary touches untyped JSON.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::ServerError;

/// Events on the telephony media stream, both directions.
///
/// Inbound: `start`, `media`, `stop`. Outbound the bridge emits `media`
/// with the same framing, and `stop` to request graceful hangup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    Start { start: StartFrame },
    Media { media: MediaFrame },
    Stop,
}

/// Payload of the `start` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartFrame {
    /// Telephony call identifier; keys the live session table
    pub call_id: String,
    /// Media stream identifier
    pub stream_id: String,
}

/// Payload of a `media` event: base64-encoded audio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFrame {
    pub payload: String,
}

impl MediaFrame {
    pub fn from_audio(audio: &[u8]) -> Self {
        Self {
            payload: BASE64.encode(audio),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, ServerError> {
        BASE64
            .decode(&self.payload)
            .map_err(|e| ServerError::Protocol(format!("bad media payload: {}", e)))
    }
}

/// Parse one inbound text frame.
pub fn parse_event(text: &str) -> Result<StreamEvent, ServerError> {
    serde_json::from_str(text).map_err(|e| ServerError::Protocol(format!("bad stream event: {}", e)))
}

/// Serialize an outbound event.
pub fn encode_event(event: &StreamEvent) -> String {
    // StreamEvent serialization cannot fail: no maps, no non-string keys
    serde_json::to_string(event).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_event() {
        let json = r#"{"event":"start","start":{"call_id":"CA123","stream_id":"MS456"}}"#;
        let event = parse_event(json).unwrap();
        match event {
            StreamEvent::Start { start } => {
                assert_eq!(start.call_id, "CA123");
                assert_eq!(start.stream_id, "MS456");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_media_event_and_decode() {
        let payload = BASE64.encode(b"audio-bytes");
        let json = format!(r#"{{"event":"media","media":{{"payload":"{}"}}}}"#, payload);
        let event = parse_event(&json).unwrap();
        match event {
            StreamEvent::Media { media } => {
                assert_eq!(media.decode().unwrap(), b"audio-bytes");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_stop_event() {
        let event = parse_event(r#"{"event":"stop"}"#).unwrap();
        assert!(matches!(event, StreamEvent::Stop));
    }

    #[test]
    fn test_malformed_event_rejected() {
        assert!(parse_event("not json").is_err());
        assert!(parse_event(r#"{"event":"restart"}"#).is_err());
        assert!(parse_event(r#"{"event":"start"}"#).is_err());
    }

    #[test]
    fn test_bad_base64_rejected() {
        let frame = MediaFrame {
            payload: "!!!not-base64!!!".to_string(),
        };
        assert!(frame.decode().is_err());
    }

    #[test]
    fn test_outbound_media_roundtrip() {
        let out = StreamEvent::Media {
            media: MediaFrame::from_audio(b"\x01\x02\x03"),
        };
        let encoded = encode_event(&out);
        let back = parse_event(&encoded).unwrap();
        match back {
            StreamEvent::Media { media } => assert_eq!(media.decode().unwrap(), vec![1, 2, 3]),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_outbound_stop_shape() {
        assert_eq!(encode_event(&StreamEvent::Stop), r#"{"event":"stop"}"#);
    }
}
