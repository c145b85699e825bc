//! Application state
//!
//! Shared state across all handlers and bridge sessions.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use fixline_agent::{CallRecorder, RetryScheduler};
use fixline_config::Settings;
use fixline_core::TextGenerator;
use fixline_persistence::CallContextStore;
use fixline_pipeline::LeadPipeline;

use crate::session::SessionTable;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    /// Lead orchestrator
    pub pipeline: Arc<LeadPipeline>,
    /// Live session table
    pub sessions: Arc<SessionTable>,
    /// Pending call contexts keyed by telephony call id
    pub contexts: Arc<dyn CallContextStore>,
    /// Post-call persistence
    pub recorder: Arc<CallRecorder>,
    /// Text-generation backend for reasoning and summaries
    pub llm: Arc<dyn TextGenerator>,
    /// Call retry scheduling with exponential backoff
    pub retries: Arc<RetryScheduler>,
    /// Process start, for the health endpoint
    pub started_at: Instant,
    /// Flipped to true when graceful shutdown begins; every live session
    /// watches it and runs its ending path
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        config: Arc<Settings>,
        pipeline: Arc<LeadPipeline>,
        contexts: Arc<dyn CallContextStore>,
        recorder: Arc<CallRecorder>,
        llm: Arc<dyn TextGenerator>,
        retries: Arc<RetryScheduler>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            pipeline,
            sessions: Arc::new(SessionTable::new()),
            contexts,
            recorder,
            llm,
            retries,
            started_at: Instant::now(),
            shutdown,
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
