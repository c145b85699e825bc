//! Call types: the immutable per-call brief, the transcript, and the durable
//! outcome a completed call leaves behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lead::{BudgetRange, ServiceCategory, Urgency};

/// Why a call is being placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    QualifyLead,
    ConfirmAppointment,
    FollowUp,
    ConsumerCallback,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QualifyLead => "qualify_lead",
            Self::ConfirmAppointment => "confirm_appointment",
            Self::FollowUp => "follow_up",
            Self::ConsumerCallback => "consumer_callback",
        }
    }
}

/// The immutable brief for one autonomous call.
///
/// Created before the call starts; the live session only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallContext {
    pub call_id: Uuid,
    pub call_type: CallType,
    /// What this call is trying to accomplish, in one sentence
    pub objective: String,
    pub lead_id: Uuid,
    pub lead_description: String,
    pub category: ServiceCategory,
    pub urgency: Urgency,
    pub budget: Option<BudgetRange>,
    pub location_zip: Option<String>,
    /// Business or consumer the call is placed to
    pub callee_name: String,
    pub target_phone: String,
}

/// Who is speaking in a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Assistant,
    User,
}

/// One turn of a call transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append a transcript delta, coalescing consecutive same-speaker deltas
/// into one turn. Transcript deltas arrive word-by-word from the voice
/// service; a turn boundary is a speaker change.
pub fn append_delta(transcript: &mut Vec<Turn>, speaker: Speaker, delta: &str) {
    if delta.is_empty() {
        return;
    }
    match transcript.last_mut() {
        Some(turn) if turn.speaker == speaker => {
            turn.text.push_str(delta);
        }
        _ => transcript.push(Turn::new(speaker, delta)),
    }
}

/// Render a transcript as "Speaker: text" lines for prompts and summaries.
pub fn render_transcript(transcript: &[Turn]) -> String {
    let mut out = String::new();
    for turn in transcript {
        let who = match turn.speaker {
            Speaker::Assistant => "Assistant",
            Speaker::User => "Callee",
        };
        out.push_str(who);
        out.push_str(": ");
        out.push_str(turn.text.trim());
        out.push('\n');
    }
    out
}

/// Terminal status of a completed call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    GoalAchieved,
    NoAnswer,
    Voicemail,
    Declined,
    Error,
}

impl OutcomeStatus {
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "goal_achieved" | "success" | "achieved" => Self::GoalAchieved,
            "no_answer" | "no-answer" => Self::NoAnswer,
            "voicemail" => Self::Voicemail,
            "declined" | "not_interested" => Self::Declined,
            _ => Self::Error,
        }
    }
}

/// How interested the callee sounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InterestLevel {
    High,
    Medium,
    Low,
    #[default]
    None,
}

impl InterestLevel {
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::None,
        }
    }
}

/// Recommended follow-up after a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    #[default]
    NoAction,
    RetryCall,
    SendDetails,
    ScheduleAppointment,
    MarkConverted,
    RemoveFromList,
}

impl NextAction {
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "retry_call" | "retry" | "call_back" => Self::RetryCall,
            "send_details" | "send_info" => Self::SendDetails,
            "schedule_appointment" | "schedule" => Self::ScheduleAppointment,
            "mark_converted" | "converted" => Self::MarkConverted,
            "remove_from_list" | "do_not_call" => Self::RemoveFromList,
            _ => Self::NoAction,
        }
    }
}

/// The durable result of a completed call.
///
/// Produced exactly once per call that reaches its end, even on error; the
/// degraded form still carries the partial transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallOutcome {
    pub call_id: Uuid,
    pub status: OutcomeStatus,
    pub summary: String,
    pub transcript: Vec<Turn>,
    pub interest_level: InterestLevel,
    pub appointment_time: Option<DateTime<Utc>>,
    pub quote_amount: Option<f64>,
    pub next_action: NextAction,
    pub completed_at: DateTime<Utc>,
}
