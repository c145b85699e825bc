//! Business notifications
//!
//! Stateless: one generation call per (lead, business) pair. A malformed
//! message sent to a business is worse than a failed send, so generation
//! failure propagates instead of falling back to canned text.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use fixline_core::{Business, GenerateRequest, Lead, TextGenerator, Urgency};
use fixline_llm::parse_structured;

use crate::AgentError;

/// The notification delivered to a matched business (delivery itself is an
/// external concern).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessNotification {
    pub subject: String,
    pub message: String,
    pub call_to_action: String,
}

const RESPONSE_SYSTEM: &str = "\
You write short lead notifications for service businesses. Respond with a \
single JSON object and nothing else. Fields: subject (one line), message \
(two or three sentences), call_to_action (one sentence). Quote the \
consumer's location and budget figures exactly as given; do not round or \
reword them. Match the tone to the stated urgency.";

/// Generate the notification for one matched business.
pub async fn generate_response(
    llm: &Arc<dyn TextGenerator>,
    lead: &Lead,
    business: &Business,
) -> Result<BusinessNotification, AgentError> {
    let c = &lead.classification;
    let mut facts = format!(
        "Business: {}\nService: {}\nUrgency: {}\nConsumer request: {}\n",
        business.name, c.category, c.urgency.as_str(), lead.description
    );
    if let Some(zip) = &c.location_zip {
        facts.push_str(&format!("Location: {}\n", zip));
    }
    if let Some(budget) = &c.budget {
        match budget.max {
            Some(max) => facts.push_str(&format!("Budget: ${:.0} to ${:.0}\n", budget.min, max)),
            None => facts.push_str(&format!("Budget: from ${:.0}\n", budget.min)),
        }
    }
    if !c.requirements.is_empty() {
        facts.push_str(&format!("Key requirements: {}\n", c.requirements.join("; ")));
    }

    let request = GenerateRequest::new(facts)
        .with_system(RESPONSE_SYSTEM.to_string())
        .with_max_tokens(512);

    let response = llm
        .generate(request)
        .await
        .map_err(|e| AgentError::Generation(e.to_string()))?;

    let mut notification: BusinessNotification =
        parse_structured(&response).map_err(|e| AgentError::Malformed(e.to_string()))?;

    // The urgent subject is a contract, not a hope: enforce it even when the
    // model ignored the instruction.
    if c.urgency == Urgency::Emergency && !is_visibly_urgent(&notification.subject) {
        notification.subject = format!("URGENT: {}", notification.subject);
    }

    Ok(notification)
}

fn is_visibly_urgent(subject: &str) -> bool {
    let lower = subject.to_lowercase();
    lower.contains("urgent") || lower.contains("emergency") || lower.contains("asap")
}
