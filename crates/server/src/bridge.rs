//! Session bridge
//!
//! One task per call. The bridge accepts the inbound telephony media
//! stream, pairs it with an outbound voice-service connection, relays audio
//! both ways in arrival order, tracks the transcript, and guarantees that
//! every call which starts streaming ends with exactly one persisted
//! outcome.
//!
//! State machine per call: AWAITING_START → STREAMING → ENDING → CLOSED,
//! with ERROR absorbing from any point. ENDING is reached by a telephony
//! stop, either connection closing or failing, voicemail grace expiry, the
//! hard duration ceiling, or process shutdown.

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

use fixline_agent::{degraded_outcome, summarize_call, system_prompt};
use fixline_core::{CallOutcome, OutcomeStatus, Speaker};
use fixline_persistence::CallContextStore;

use crate::metrics;
use crate::session::{BridgeState, CallSession};
use crate::state::AppState;
use crate::telephony::{encode_event, parse_event, MediaFrame, StartFrame, StreamEvent};
use crate::voice::{self, VoiceEvent, VoiceRole, VoiceUpstream};
use crate::ServerError;

/// How long the bridge waits for the start event before giving up on a
/// connection that never identifies its call.
const START_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a session left STREAMING
#[derive(Debug, Clone)]
pub enum EndReason {
    TelephonyStop,
    TelephonyClosed,
    TransportError(String),
    VoiceClosed,
    VoiceError(String),
    Voicemail,
    DurationCeiling,
    Shutdown,
    ProtocolError(String),
}

impl EndReason {
    fn as_str(&self) -> &'static str {
        match self {
            Self::TelephonyStop => "telephony_stop",
            Self::TelephonyClosed => "telephony_closed",
            Self::TransportError(_) => "transport_error",
            Self::VoiceClosed => "voice_closed",
            Self::VoiceError(_) => "voice_error",
            Self::Voicemail => "voicemail",
            Self::DurationCeiling => "duration_ceiling",
            Self::Shutdown => "shutdown",
            Self::ProtocolError(_) => "protocol_error",
        }
    }
}

type WsSender = Arc<tokio::sync::Mutex<SplitSink<WebSocket, Message>>>;

/// Handle one inbound media-stream connection for its whole lifetime.
pub async fn handle_media_stream(socket: WebSocket, state: AppState) {
    let (sender, mut receiver) = socket.split();
    let sender: WsSender = Arc::new(tokio::sync::Mutex::new(sender));

    // AWAITING_START: nothing is known about this connection until the
    // start event names the call.
    let start = match await_start(&mut receiver).await {
        Ok(start) => start,
        Err(e) => {
            tracing::warn!(error = %e, "Media stream closed before start event");
            return;
        }
    };

    // The call context was registered at call initiation; a stream with no
    // context is not a call we placed.
    let context = match state.contexts.get(&start.call_id).await {
        Ok(Some(context)) => context,
        Ok(None) => {
            tracing::warn!(call_id = %start.call_id, "No call context for stream, hanging up");
            send_stop(&sender, &state).await;
            return;
        }
        Err(e) => {
            tracing::error!(call_id = %start.call_id, error = %e, "Context lookup failed");
            send_stop(&sender, &state).await;
            return;
        }
    };

    let session = Arc::new(CallSession::new(
        start.call_id.clone(),
        start.stream_id.clone(),
        context,
    ));
    if let Err(e) = state.sessions.insert(session.clone()) {
        tracing::warn!(call_id = %start.call_id, error = %e, "Rejecting duplicate stream");
        send_stop(&sender, &state).await;
        return;
    }
    metrics::record_call_started();
    metrics::set_active_sessions(state.sessions.count());

    let instructions = system_prompt(&session.context);

    // Open the outbound connection and configure the voice session. From
    // here on the session must produce exactly one outcome, whatever fails.
    let (voice_client, voice_rx) = match voice::connect(&state.config.voice, &instructions).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(call_id = %session.telephony_call_id, error = %e, "Voice service unavailable");
            session.set_state(BridgeState::Error);
            send_stop(&sender, &state).await;
            complete_session(&state, &session, EndReason::VoiceError(e.to_string())).await;
            close_socket(&sender).await;
            return;
        }
    };
    session.set_state(BridgeState::Streaming);
    tracing::info!(
        call_id = %session.telephony_call_id,
        stream_id = %session.stream_id,
        call_type = session.context.call_type.as_str(),
        "Session streaming"
    );

    // First end reason wins; everything else is ignored.
    let (end_tx, mut end_rx) = mpsc::channel::<EndReason>(4);

    // Outbound relay: voice events back to the telephony side, in arrival
    // order, on their own task so a slow direction cannot reorder the other.
    let outbound_task = tokio::spawn(relay_voice_events(
        voice_rx,
        session.clone(),
        sender.clone(),
        end_tx.clone(),
        voice_client.clone(),
        state.llm.clone(),
        Duration::from_secs(state.config.bridge.voicemail_grace_secs),
        Duration::from_millis(state.config.bridge.send_timeout_ms),
    ));

    // The hard duration ceiling is the bridge's own timer, not advice to
    // the model.
    let deadline = tokio::time::sleep(Duration::from_secs(
        state.config.bridge.max_call_duration_secs,
    ));
    tokio::pin!(deadline);

    let mut shutdown = state.shutdown.clone();

    // Inbound relay and end-condition watch.
    let reason = loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match parse_event(&text) {
                        Ok(StreamEvent::Media { media }) => {
                            match media.decode() {
                                Ok(bytes) => {
                                    session.record_audio(&bytes);
                                    // relay as it arrives; the payload is
                                    // already in the stream codec. Bounded:
                                    // a stuck voice connection must not
                                    // stall the inbound relay indefinitely.
                                    let budget = Duration::from_millis(
                                        state.config.bridge.send_timeout_ms,
                                    );
                                    match timeout(
                                        budget,
                                        voice_client.append_audio(media.payload),
                                    )
                                    .await
                                    {
                                        Ok(Ok(())) => {}
                                        Ok(Err(_)) => break EndReason::VoiceClosed,
                                        Err(_) => {
                                            break EndReason::TransportError(
                                                "voice send timeout".to_string(),
                                            )
                                        }
                                    }
                                }
                                Err(e) => {
                                    session.set_state(BridgeState::Error);
                                    break EndReason::ProtocolError(e.to_string());
                                }
                            }
                        }
                        Ok(StreamEvent::Stop) => break EndReason::TelephonyStop,
                        Ok(StreamEvent::Start { .. }) => {
                            tracing::debug!(call_id = %session.telephony_call_id, "Duplicate start ignored");
                        }
                        Err(e) => {
                            session.set_state(BridgeState::Error);
                            break EndReason::ProtocolError(e.to_string());
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break EndReason::TelephonyClosed,
                Some(Err(e)) => {
                    session.set_state(BridgeState::Error);
                    break EndReason::TransportError(e.to_string());
                }
                Some(Ok(_)) => {}
            },
            Some(reason) = end_rx.recv() => break reason,
            _ = &mut deadline => break EndReason::DurationCeiling,
            changed = shutdown.changed() => {
                // a dropped sender means the process is exiting too
                if changed.is_err() || *shutdown.borrow() {
                    break EndReason::Shutdown;
                }
            }
        }
    };

    outbound_task.abort();
    drop(voice_client);

    // Graceful hangup request before tearing down.
    send_stop(&sender, &state).await;
    complete_session(&state, &session, reason).await;
    close_socket(&sender).await;
}

/// ENDING → CLOSED: summarize, persist exactly one outcome, update the
/// lead, drop the session from the live table.
pub async fn complete_session(
    state: &AppState,
    session: &Arc<CallSession>,
    reason: EndReason,
) -> CallOutcome {
    session.set_state(BridgeState::Ending);
    tracing::info!(
        call_id = %session.telephony_call_id,
        reason = reason.as_str(),
        elapsed_secs = session.elapsed().as_secs(),
        "Session ending"
    );

    let transcript = session.transcript_snapshot();
    let voicemail = session.voicemail_detected() || matches!(reason, EndReason::Voicemail);

    let summary_budget = Duration::from_secs(state.config.bridge.summary_timeout_secs);
    let outcome = match timeout(
        summary_budget,
        summarize_call(&state.llm, &session.context, &transcript, voicemail),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!(
                call_id = %session.telephony_call_id,
                "Summary generation exceeded its budget, using degraded outcome"
            );
            degraded_outcome(&session.context, &transcript)
        }
    };

    state
        .recorder
        .save_call_record(&session.context, &outcome, Some(&session.telephony_call_id), 1)
        .await;
    state.recorder.update_lead_status(&session.context, &outcome).await;

    // Unanswered calls earn a retry; the scheduler enforces the backoff
    // and the attempt cap.
    if matches!(
        outcome.status,
        OutcomeStatus::NoAnswer | OutcomeStatus::Voicemail
    ) {
        state
            .retries
            .record_failure(session.context.call_id, session.context.clone());
    }

    if let Err(e) = state.contexts.remove(&session.telephony_call_id).await {
        tracing::warn!(call_id = %session.telephony_call_id, error = %e, "Context cleanup failed");
    }
    state.sessions.remove(&session.telephony_call_id);
    session.set_state(BridgeState::Closed);

    metrics::record_call_completed(outcome_label(outcome.status));
    metrics::set_active_sessions(state.sessions.count());

    tracing::info!(
        call_id = %session.telephony_call_id,
        status = ?outcome.status,
        turns = outcome.transcript.len(),
        "Session closed"
    );

    outcome
}

fn outcome_label(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::GoalAchieved => "goal_achieved",
        OutcomeStatus::NoAnswer => "no_answer",
        OutcomeStatus::Voicemail => "voicemail",
        OutcomeStatus::Declined => "declined",
        OutcomeStatus::Error => "error",
    }
}

/// Wait for the start event that identifies the call.
async fn await_start(
    receiver: &mut SplitStream<WebSocket>,
) -> Result<StartFrame, ServerError> {
    let deadline = tokio::time::sleep(START_TIMEOUT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match parse_event(&text)? {
                        StreamEvent::Start { start } => return Ok(start),
                        other => {
                            tracing::debug!("Ignoring pre-start event: {:?}", other);
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(ServerError::Protocol("closed before start".to_string()));
                }
                Some(Err(e)) => {
                    return Err(ServerError::Protocol(e.to_string()));
                }
                Some(Ok(_)) => {}
            },
            _ = &mut deadline => {
                return Err(ServerError::Protocol("no start event within timeout".to_string()));
            }
        }
    }
}

/// Outbound relay loop: voice-service events to the telephony side.
#[allow(clippy::too_many_arguments)]
async fn relay_voice_events(
    mut voice_rx: mpsc::Receiver<VoiceUpstream>,
    session: Arc<CallSession>,
    sender: WsSender,
    end_tx: mpsc::Sender<EndReason>,
    voice_client: crate::voice::VoiceClient,
    llm: Arc<dyn fixline_core::TextGenerator>,
    voicemail_grace: Duration,
    send_timeout: Duration,
) {
    loop {
        let upstream = match voice_rx.recv().await {
            Some(upstream) => upstream,
            None => {
                let _ = end_tx.send(EndReason::VoiceClosed).await;
                return;
            }
        };

        match upstream {
            VoiceUpstream::Event(VoiceEvent::AudioDelta { delta }) => {
                let frame = encode_event(&StreamEvent::Media {
                    media: MediaFrame { payload: delta },
                });
                let send = async {
                    let mut s = sender.lock().await;
                    s.send(Message::Text(frame)).await
                };
                match timeout(send_timeout, send).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        let _ = end_tx.send(EndReason::TransportError(e.to_string())).await;
                        return;
                    }
                    Err(_) => {
                        // a stuck outbound connection must not stall the
                        // session past its bound
                        let _ = end_tx
                            .send(EndReason::TransportError("outbound send timeout".to_string()))
                            .await;
                        return;
                    }
                }
            }
            VoiceUpstream::Event(VoiceEvent::TranscriptDelta { role, text }) => {
                let speaker = match role {
                    VoiceRole::Assistant => Speaker::Assistant,
                    VoiceRole::User => Speaker::User,
                };
                if session.append_transcript(speaker, &text) {
                    tracing::info!(
                        call_id = %session.telephony_call_id,
                        "Voicemail detected, hangup armed"
                    );
                    // Fallback hangup in case no response-complete follows
                    // the greeting.
                    let end_tx = end_tx.clone();
                    let fallback = voicemail_grace + Duration::from_secs(10);
                    tokio::spawn(async move {
                        tokio::time::sleep(fallback).await;
                        let _ = end_tx.send(EndReason::Voicemail).await;
                    });
                }
            }
            VoiceUpstream::Event(VoiceEvent::ReasoningRequest { situation, question }) => {
                // Reasoning runs off the relay loop so audio keeps flowing;
                // a failure inside yields the safe fallback, never an error.
                let llm = llm.clone();
                let client = voice_client.clone();
                let history = session.transcript_snapshot();
                let call_id = session.telephony_call_id.clone();
                tokio::spawn(async move {
                    let instruction =
                        fixline_agent::request_reasoning(&llm, &history, &situation, &question)
                            .await;
                    tracing::debug!(call_id = %call_id, "Reasoning instruction ready");
                    let _ = client.send_instruction(instruction).await;
                });
            }
            VoiceUpstream::Event(VoiceEvent::ResponseComplete) => {
                if session.voicemail_detected() {
                    // let the greeting finish playing out, then hang up
                    tokio::time::sleep(voicemail_grace).await;
                    let _ = end_tx.send(EndReason::Voicemail).await;
                    return;
                }
            }
            VoiceUpstream::Event(VoiceEvent::Error { message }) => {
                let _ = end_tx.send(EndReason::VoiceError(message)).await;
                return;
            }
            VoiceUpstream::Closed { error } => {
                let reason = match error {
                    Some(e) => EndReason::VoiceError(e),
                    None => EndReason::VoiceClosed,
                };
                let _ = end_tx.send(reason).await;
                return;
            }
        }
    }
}

async fn send_stop(sender: &WsSender, state: &AppState) {
    let stop = encode_event(&StreamEvent::Stop);
    let send = async {
        let mut s = sender.lock().await;
        s.send(Message::Text(stop)).await
    };
    let budget = Duration::from_millis(state.config.bridge.send_timeout_ms);
    if timeout(budget, send).await.is_err() {
        tracing::debug!("Stop frame send timed out");
    }
}

async fn close_socket(sender: &WsSender) {
    let mut s = sender.lock().await;
    let _ = s.close().await;
}
