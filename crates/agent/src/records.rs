//! Post-call persistence
//!
//! Idempotent writes keyed by call id and lead id. The call is already over
//! when these run: failures are logged and surfaced to operators, never
//! retried inline, and never allowed to affect call behavior.

use chrono::Utc;
use std::sync::Arc;

use fixline_core::{CallContext, CallOutcome, LeadStatus, OutcomeStatus};
use fixline_persistence::{CallRecord, CallRecordStore, LeadStore};

/// Persists call outcomes and the post-call lead status write.
pub struct CallRecorder {
    records: Arc<dyn CallRecordStore>,
    leads: Arc<dyn LeadStore>,
}

impl CallRecorder {
    pub fn new(records: Arc<dyn CallRecordStore>, leads: Arc<dyn LeadStore>) -> Self {
        Self { records, leads }
    }

    /// Save the durable record for a completed call. Idempotent: the store
    /// upserts by call id, so a repeated save leaves one record.
    pub async fn save_call_record(
        &self,
        context: &CallContext,
        outcome: &CallOutcome,
        telephony_call_id: Option<&str>,
        attempt: u32,
    ) {
        let record = CallRecord {
            call_id: context.call_id,
            lead_id: context.lead_id,
            telephony_call_id: telephony_call_id.map(String::from),
            outcome: outcome.clone(),
            attempt,
            recorded_at: Utc::now(),
        };

        if let Err(e) = self.records.save(&record).await {
            tracing::error!(
                call_id = %context.call_id,
                error = %e,
                "Failed to save call record"
            );
        }
    }

    /// Update the lead's status from the call outcome. This is the Call
    /// Agent's only lead-status write and happens strictly after the
    /// orchestrator's, never concurrently with it.
    pub async fn update_lead_status(&self, context: &CallContext, outcome: &CallOutcome) {
        let status = match outcome.status {
            OutcomeStatus::GoalAchieved => LeadStatus::Converted,
            OutcomeStatus::Declined => LeadStatus::Closed,
            // no_answer / voicemail / error leave the lead contacted; a
            // retry may still land
            _ => return,
        };

        if let Err(e) = self.leads.update_status(context.lead_id, status).await {
            tracing::error!(
                lead_id = %context.lead_id,
                status = status.as_str(),
                error = %e,
                "Failed to update lead status after call"
            );
        }
    }
}
