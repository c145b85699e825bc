//! Live call sessions
//!
//! One `CallSession` per live telephony connection, owned by its bridge
//! task. The session table is the only structure shared between sessions:
//! concurrent insert/lookup/remove keyed by the telephony call id.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fixline_agent::detect_voicemail;
use fixline_core::{append_delta, CallContext, Speaker, Turn};

/// Per-call state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    AwaitingStart,
    Streaming,
    Ending,
    Closed,
    /// Absorbing error state; always followed by the ending path
    Error,
}

/// The mutable in-memory state of one active call
pub struct CallSession {
    /// Telephony call identifier; keys the session table
    pub telephony_call_id: String,
    /// Media stream identifier from the start event
    pub stream_id: String,
    /// The immutable call brief; read-only during the call
    pub context: CallContext,
    pub started_at: Instant,
    state: Mutex<BridgeState>,
    transcript: Mutex<Vec<Turn>>,
    /// Raw inbound audio, kept for the call recording
    audio: Mutex<Vec<u8>>,
    voicemail_detected: Mutex<bool>,
}

impl CallSession {
    pub fn new(telephony_call_id: String, stream_id: String, context: CallContext) -> Self {
        Self {
            telephony_call_id,
            stream_id,
            context,
            started_at: Instant::now(),
            state: Mutex::new(BridgeState::AwaitingStart),
            transcript: Mutex::new(Vec::new()),
            audio: Mutex::new(Vec::new()),
            voicemail_detected: Mutex::new(false),
        }
    }

    pub fn state(&self) -> BridgeState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: BridgeState) {
        *self.state.lock() = state;
    }

    /// Append a transcript delta, coalescing with the previous turn when the
    /// speaker is unchanged, and run voicemail detection on the delta.
    /// Returns true when this delta newly flagged voicemail.
    pub fn append_transcript(&self, speaker: Speaker, delta: &str) -> bool {
        append_delta(&mut self.transcript.lock(), speaker, delta);

        if speaker == Speaker::User && detect_voicemail(delta) {
            let mut flag = self.voicemail_detected.lock();
            if !*flag {
                *flag = true;
                return true;
            }
        }
        false
    }

    pub fn voicemail_detected(&self) -> bool {
        *self.voicemail_detected.lock()
    }

    pub fn transcript_snapshot(&self) -> Vec<Turn> {
        self.transcript.lock().clone()
    }

    pub fn record_audio(&self, bytes: &[u8]) {
        self.audio.lock().extend_from_slice(bytes);
    }

    pub fn recorded_audio_len(&self) -> usize {
        self.audio.lock().len()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// The live session table.
///
/// The only shared mutable structure in the bridge; every other piece of
/// per-call state is owned by its session's task.
#[derive(Default)]
pub struct SessionTable {
    sessions: RwLock<HashMap<String, Arc<CallSession>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session. Exactly one session may exist per telephony call
    /// id; a duplicate insert is rejected.
    pub fn insert(&self, session: Arc<CallSession>) -> Result<(), crate::ServerError> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&session.telephony_call_id) {
            return Err(crate::ServerError::Session(format!(
                "session already live for call {}",
                session.telephony_call_id
            )));
        }
        tracing::info!(call_id = %session.telephony_call_id, "Session created");
        sessions.insert(session.telephony_call_id.clone(), session);
        Ok(())
    }

    pub fn get(&self, telephony_call_id: &str) -> Option<Arc<CallSession>> {
        self.sessions.read().get(telephony_call_id).cloned()
    }

    pub fn remove(&self, telephony_call_id: &str) -> Option<Arc<CallSession>> {
        let removed = self.sessions.write().remove(telephony_call_id);
        if removed.is_some() {
            tracing::info!(call_id = %telephony_call_id, "Session removed");
        }
        removed
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}
