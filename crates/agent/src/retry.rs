//! Call retry scheduling
//!
//! Exponential backoff with a hard attempt cap. Attempts beyond the cap are
//! dropped with a log line, never silently retried forever.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use fixline_config::RetryConfig;
use fixline_core::CallContext;

/// Delay before retry attempt `attempt` (1-based), or `None` when the
/// attempt is past the cap. The base delay doubles per attempt:
/// 30, 60, 120 minutes with the default configuration.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Option<Duration> {
    if attempt == 0 || attempt > config.max_attempts {
        return None;
    }
    let minutes = config.base_delay_minutes.saturating_mul(1u64 << (attempt - 1));
    Some(Duration::from_secs(minutes * 60))
}

/// A scheduled retry, delivered on the scheduler's channel when due.
#[derive(Debug, Clone)]
pub struct RetryAttempt {
    pub call_id: Uuid,
    pub context: CallContext,
    pub attempt: u32,
}

/// Schedules call re-attempts with exponential backoff.
///
/// Due attempts are delivered on the channel handed to `new`; the consumer
/// decides what placing the call means.
pub struct RetryScheduler {
    config: RetryConfig,
    due_tx: mpsc::Sender<RetryAttempt>,
    pending: Arc<Mutex<usize>>,
    /// Failed attempts seen per call, for callers that track outcomes
    /// rather than attempt numbers
    failures: Mutex<HashMap<Uuid, u32>>,
}

impl RetryScheduler {
    pub fn new(config: RetryConfig) -> (Self, mpsc::Receiver<RetryAttempt>) {
        let (due_tx, due_rx) = mpsc::channel(64);
        (
            Self {
                config,
                due_tx,
                pending: Arc::new(Mutex::new(0)),
                failures: Mutex::new(HashMap::new()),
            },
            due_rx,
        )
    }

    /// Record one failed attempt for a call and queue the matching retry.
    /// The first failure schedules attempt 1 (base delay), the second
    /// attempt 2 (doubled), and so on until the cap drops the rest.
    pub fn record_failure(&self, call_id: Uuid, context: CallContext) {
        let attempt = {
            let mut failures = self.failures.lock();
            let count = failures.entry(call_id).or_insert(0);
            *count += 1;
            *count
        };
        self.queue_retry(call_id, context, attempt);
    }

    /// Schedule attempt `attempt` for a call. Past the cap the request is
    /// dropped with a log line.
    pub fn queue_retry(&self, call_id: Uuid, context: CallContext, attempt: u32) {
        let delay = match backoff_delay(&self.config, attempt) {
            Some(d) => d,
            None => {
                tracing::warn!(
                    call_id = %call_id,
                    attempt,
                    max_attempts = self.config.max_attempts,
                    "Retry attempt past cap, dropping"
                );
                return;
            }
        };

        tracing::info!(
            call_id = %call_id,
            attempt,
            delay_minutes = delay.as_secs() / 60,
            "Retry scheduled"
        );

        *self.pending.lock() += 1;
        let due_tx = self.due_tx.clone();
        let pending = self.pending.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            *pending.lock() -= 1;
            let _ = due_tx
                .send(RetryAttempt {
                    call_id,
                    context,
                    attempt,
                })
                .await;
        });
    }

    /// Number of retries waiting on their backoff timer.
    pub fn pending(&self) -> usize {
        *self.pending.lock()
    }
}
