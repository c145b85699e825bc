//! Call summarization
//!
//! One generation call turns the final transcript into a structured
//! `CallOutcome`. This is the last chance to produce something durable for
//! a call that already happened, so every failure path degrades to an
//! error-status outcome instead of propagating.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use fixline_core::{
    render_transcript, CallContext, CallOutcome, GenerateRequest, InterestLevel, NextAction,
    OutcomeStatus, TextGenerator, Turn,
};
use fixline_llm::parse_structured;

const SUMMARY_SYSTEM: &str = "\
You summarize completed phone calls into structured data. Respond with a \
single JSON object and nothing else. Fields: \
status (one of goal_achieved, no_answer, voicemail, declined, error), \
summary (two sentences at most), \
interest_level (high, medium, low, or none), \
appointment_time (ISO 8601 timestamp, omit when none was agreed), \
quote_amount (number, omit when none was discussed), \
next_action (one of no_action, retry_call, send_details, \
schedule_appointment, mark_converted, remove_from_list).";

#[derive(Debug, Deserialize)]
struct RawSummary {
    status: String,
    summary: String,
    #[serde(default)]
    interest_level: Option<String>,
    #[serde(default)]
    appointment_time: Option<String>,
    #[serde(default)]
    quote_amount: Option<f64>,
    #[serde(default)]
    next_action: Option<String>,
}

/// Summarize a completed call into its durable outcome.
///
/// `voicemail_detected` short-circuits generation: a voicemail greeting is
/// not a conversation worth a model round-trip. An empty transcript means
/// nobody spoke; that is a no-answer, also without generation.
pub async fn summarize_call(
    llm: &Arc<dyn TextGenerator>,
    context: &CallContext,
    transcript: &[Turn],
    voicemail_detected: bool,
) -> CallOutcome {
    if voicemail_detected {
        return fixed_outcome(
            context,
            transcript,
            OutcomeStatus::Voicemail,
            "Reached voicemail; no conversation took place.",
            NextAction::RetryCall,
        );
    }

    if transcript.is_empty() {
        return fixed_outcome(
            context,
            transcript,
            OutcomeStatus::NoAnswer,
            "Call ended with no conversation.",
            NextAction::RetryCall,
        );
    }

    let prompt = format!(
        "Call objective: {}\nCall type: {}\nTranscript:\n{}",
        context.objective,
        context.call_type.as_str(),
        render_transcript(transcript)
    );
    let request = GenerateRequest::new(prompt)
        .with_system(SUMMARY_SYSTEM.to_string())
        .with_max_tokens(512);

    let response = match llm.generate(request).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(call_id = %context.call_id, error = %e, "Summary generation failed");
            return degraded_outcome(context, transcript);
        }
    };

    let raw: RawSummary = match parse_structured(&response) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(call_id = %context.call_id, error = %e, "Summary response unparseable");
            return degraded_outcome(context, transcript);
        }
    };

    CallOutcome {
        call_id: context.call_id,
        status: OutcomeStatus::parse_lenient(&raw.status),
        summary: raw.summary,
        transcript: transcript.to_vec(),
        interest_level: raw
            .interest_level
            .as_deref()
            .map(InterestLevel::parse_lenient)
            .unwrap_or_default(),
        appointment_time: raw
            .appointment_time
            .as_deref()
            .and_then(parse_timestamp),
        quote_amount: raw.quote_amount,
        next_action: raw
            .next_action
            .as_deref()
            .map(NextAction::parse_lenient)
            .unwrap_or_default(),
        completed_at: Utc::now(),
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn fixed_outcome(
    context: &CallContext,
    transcript: &[Turn],
    status: OutcomeStatus,
    summary: &str,
    next_action: NextAction,
) -> CallOutcome {
    CallOutcome {
        call_id: context.call_id,
        status,
        summary: summary.to_string(),
        transcript: transcript.to_vec(),
        interest_level: InterestLevel::None,
        appointment_time: None,
        quote_amount: None,
        next_action,
        completed_at: Utc::now(),
    }
}

/// The degraded outcome: status error, generic summary, transcript kept.
/// Public because the bridge falls back to it when summary generation
/// exceeds its time budget.
pub fn degraded_outcome(context: &CallContext, transcript: &[Turn]) -> CallOutcome {
    fixed_outcome(
        context,
        transcript,
        OutcomeStatus::Error,
        "Call completed but the summary could not be generated.",
        NextAction::NoAction,
    )
}
