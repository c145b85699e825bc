//! Voice-generation service client
//!
//! One outbound WebSocket per call. The connection is configured once with
//! codec, voice identity, instructions, and turn-detection parameters, then
//! consumes audio-append and instruction messages and emits transcript/
//! audio-delta/reasoning-request/response-complete/error events, parsed
//! here into typed variants.

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use fixline_config::VoiceServiceConfig;

use crate::ServerError;

/// Messages the bridge sends to the voice service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceCommand {
    /// Per-call session configuration, sent once after connect
    SessionUpdate { session: SessionConfig },
    /// Caller audio, base64 in the stream codec
    AudioAppend { audio: String },
    /// Mid-call steering instruction, answering a reasoning request
    Instruction { text: String },
}

/// Session configuration for one call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub audio_format: String,
    pub voice: String,
    /// The call agent's system prompt
    pub instructions: String,
    pub turn_detection: TurnDetection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
    pub silence_ms: u32,
}

/// Events the voice service emits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceEvent {
    /// Generated audio, base64 in the stream codec
    AudioDelta { delta: String },
    /// Incremental transcript text for one side of the conversation
    TranscriptDelta { role: VoiceRole, text: String },
    /// The model hit a decision outside the scripted flow and wants an
    /// instruction
    ReasoningRequest { situation: String, question: String },
    /// The current model response finished playing out
    ResponseComplete,
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceRole {
    Assistant,
    User,
}

/// What the reader task delivers to the bridge
#[derive(Debug)]
pub enum VoiceUpstream {
    Event(VoiceEvent),
    /// The connection closed or failed; no further events will arrive
    Closed { error: Option<String> },
}

/// Handle to one live voice-service connection
#[derive(Clone)]
pub struct VoiceClient {
    cmd_tx: mpsc::Sender<VoiceCommand>,
}

impl VoiceClient {
    /// Relay one base64 audio frame. Fails when the writer task is gone,
    /// which the bridge treats as the connection having closed.
    pub async fn append_audio(&self, audio: String) -> Result<(), ServerError> {
        self.send(VoiceCommand::AudioAppend { audio }).await
    }

    /// Send a mid-call steering instruction.
    pub async fn send_instruction(&self, text: String) -> Result<(), ServerError> {
        self.send(VoiceCommand::Instruction { text }).await
    }

    async fn send(&self, command: VoiceCommand) -> Result<(), ServerError> {
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| ServerError::VoiceService("voice connection closed".to_string()))
    }
}

/// Connect to the voice service and configure the session.
///
/// Returns the client handle and the upstream event channel. Dropping the
/// client closes the writer task, which closes the connection.
pub async fn connect(
    config: &VoiceServiceConfig,
    instructions: &str,
) -> Result<(VoiceClient, mpsc::Receiver<VoiceUpstream>), ServerError> {
    let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
    let (ws_stream, _) = timeout(connect_timeout, connect_async(config.url.as_str()))
        .await
        .map_err(|_| ServerError::VoiceService("voice service connect timeout".to_string()))?
        .map_err(|e| ServerError::VoiceService(format!("voice service connect: {}", e)))?;

    let (mut write, mut read) = ws_stream.split();

    // Configure the session before any audio flows.
    let setup = VoiceCommand::SessionUpdate {
        session: SessionConfig {
            audio_format: config.audio_format.clone(),
            voice: config.voice.clone(),
            instructions: instructions.to_string(),
            turn_detection: TurnDetection {
                kind: "server_vad".to_string(),
                silence_ms: config.vad_silence_ms,
            },
        },
    };
    let setup_json = serde_json::to_string(&setup)
        .map_err(|e| ServerError::Internal(format!("encode session config: {}", e)))?;
    write
        .send(Message::Text(setup_json))
        .await
        .map_err(|e| ServerError::VoiceService(format!("send session config: {}", e)))?;

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<VoiceCommand>(256);
    let (event_tx, event_rx) = mpsc::channel::<VoiceUpstream>(256);

    // Writer task: forwards commands until every client handle drops.
    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            let json = match serde_json::to_string(&cmd) {
                Ok(j) => j,
                Err(e) => {
                    tracing::warn!("Failed to serialize voice command: {}", e);
                    continue;
                }
            };
            if write.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
        let _ = write.send(Message::Close(None)).await;
    });

    // Reader task: parses events, reports close exactly once.
    tokio::spawn(async move {
        loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<VoiceEvent>(&text) {
                    Ok(event) => {
                        if event_tx.send(VoiceUpstream::Event(event)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!("Unrecognized voice event: {} - {}", e, text);
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    let _ = event_tx.send(VoiceUpstream::Closed { error: None }).await;
                    break;
                }
                Some(Err(e)) => {
                    let _ = event_tx
                        .send(VoiceUpstream::Closed {
                            error: Some(e.to_string()),
                        })
                        .await;
                    break;
                }
                Some(Ok(_)) => {}
            }
        }
    });

    Ok((VoiceClient { cmd_tx }, event_rx))
}
