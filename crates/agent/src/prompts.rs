//! System prompt composition
//!
//! A call's system prompt is a deterministic composition: base policy,
//! call-type script, objection handling. No generation call is involved;
//! the same context always yields the same prompt.

use fixline_core::{CallContext, CallType};

/// Base policy included in every call, regardless of type.
const BASE_POLICY: &str = "\
You are an automated assistant calling on behalf of the fixline home-services \
marketplace. Rules you must follow on every call:
- Identify yourself as an automated AI assistant within your first sentence.
- If the person asks not to be called, apologize, confirm they will not be \
contacted again, and end the call immediately.
- Keep the call within the stated time limit; wrap up politely as it nears.
- Never invent prices, availability, or commitments beyond the brief below.
- Be concise: one question at a time, plain language, no jargon.";

const OBJECTION_BLOCK: &str = "\
Handling objections:
- \"How did you get my number?\": the consumer submitted a service request \
through fixline and asked to be connected.
- \"Is this a sales call?\": no, you are following up on their own request \
or confirming details they asked for.
- Hesitation or mistrust: offer to have a human follow up instead, and note \
that preference for the summary.
- Hostility or a clear refusal: thank them and end the call.";

fn script_for(call_type: CallType) -> &'static str {
    match call_type {
        CallType::QualifyLead => {
            "Call goal: qualify the lead.\n\
             Confirm the problem described in the brief still needs attention, \
             when the work is needed, whether the stated budget is accurate, and \
             whether they want a service provider to contact them. Collect any \
             detail a provider would need to quote the job."
        }
        CallType::ConfirmAppointment => {
            "Call goal: confirm the appointment.\n\
             State the appointment time from the brief and ask for a yes/no \
             confirmation. If it no longer works, offer to have it rescheduled \
             and capture their preferred window."
        }
        CallType::FollowUp => {
            "Call goal: follow up on earlier contact.\n\
             Ask whether the work was completed, whether they were satisfied, \
             and whether anything else is needed. Do not re-pitch services they \
             declined."
        }
        CallType::ConsumerCallback => {
            "Call goal: return the consumer's callback request.\n\
             They asked to be called back about their service request. Answer \
             their questions from the brief and capture what they want to happen \
             next."
        }
    }
}

/// Compose the full system prompt for a call.
pub fn system_prompt(context: &CallContext) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(BASE_POLICY);
    prompt.push_str("\n\n");
    prompt.push_str(script_for(context.call_type));
    prompt.push_str("\n\n");
    prompt.push_str(OBJECTION_BLOCK);
    prompt.push_str("\n\nCall brief:\n");
    prompt.push_str(&format!("- Calling: {}\n", context.callee_name));
    prompt.push_str(&format!("- Objective: {}\n", context.objective));
    prompt.push_str(&format!(
        "- Service category: {}\n",
        context.category
    ));
    prompt.push_str(&format!("- Urgency: {}\n", context.urgency.as_str()));
    prompt.push_str(&format!(
        "- Consumer's request: {}\n",
        context.lead_description
    ));
    if let Some(budget) = &context.budget {
        match budget.max {
            Some(max) => prompt.push_str(&format!(
                "- Stated budget: ${:.0} to ${:.0}\n",
                budget.min, max
            )),
            None => prompt.push_str(&format!("- Stated budget: from ${:.0}\n", budget.min)),
        }
    }
    if let Some(zip) = &context.location_zip {
        prompt.push_str(&format!("- Location: {}\n", zip));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixline_core::{BudgetRange, ServiceCategory, Urgency};
    use uuid::Uuid;

    fn context(call_type: CallType) -> CallContext {
        CallContext {
            call_id: Uuid::new_v4(),
            call_type,
            objective: "confirm the job is still needed".into(),
            lead_id: Uuid::new_v4(),
            lead_description: "water heater leaking".into(),
            category: ServiceCategory::Plumbing,
            urgency: Urgency::Emergency,
            budget: Some(BudgetRange { min: 0.0, max: Some(500.0) }),
            location_zip: Some("46032".into()),
            callee_name: "Ajax Plumbing".into(),
            target_phone: "+13175550100".into(),
        }
    }

    #[test]
    fn test_prompt_contains_base_policy() {
        let prompt = system_prompt(&context(CallType::QualifyLead));
        assert!(prompt.contains("automated AI assistant"));
        assert!(prompt.contains("not to be called"));
        assert!(prompt.contains("time limit"));
    }

    #[test]
    fn test_prompt_contains_brief_fields() {
        let prompt = system_prompt(&context(CallType::QualifyLead));
        assert!(prompt.contains("Ajax Plumbing"));
        assert!(prompt.contains("water heater leaking"));
        assert!(prompt.contains("46032"));
        assert!(prompt.contains("$500"));
    }

    #[test]
    fn test_call_types_yield_distinguishable_prompts() {
        let prompts: Vec<String> = [
            CallType::QualifyLead,
            CallType::ConfirmAppointment,
            CallType::FollowUp,
            CallType::ConsumerCallback,
        ]
        .iter()
        .map(|t| system_prompt(&context(*t)))
        .collect();

        for i in 0..prompts.len() {
            for j in (i + 1)..prompts.len() {
                assert_ne!(prompts[i], prompts[j], "prompts {} and {} identical", i, j);
            }
        }
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let ctx = context(CallType::FollowUp);
        assert_eq!(system_prompt(&ctx), system_prompt(&ctx));
    }
}
