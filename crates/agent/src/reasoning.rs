//! Mid-call reasoning
//!
//! Used for decisions outside the scripted flow while a call is live. A
//! reasoning failure must never crash the call, so every failure path
//! returns the safe fallback instruction instead of an error.

use std::sync::Arc;

use fixline_core::{render_transcript, GenerateRequest, TextGenerator, Turn};

/// Instruction returned when reasoning is unavailable.
pub const REASONING_FALLBACK: &str =
    "Continue with the standard script. Acknowledge what was said and return to the call goal.";

const REASONING_SYSTEM: &str = "\
You advise a live phone assistant mid-call. Reply with one short instruction \
(a sentence or two) the assistant can act on immediately. No preamble.";

/// Maximum transcript turns included in the reasoning prompt; the call is
/// live, the prompt must stay bounded.
const MAX_HISTORY_TURNS: usize = 12;

/// Ask for an off-script instruction. Infallible by design.
pub async fn request_reasoning(
    llm: &Arc<dyn TextGenerator>,
    history: &[Turn],
    situation: &str,
    question: &str,
) -> String {
    let tail_start = history.len().saturating_sub(MAX_HISTORY_TURNS);
    let prompt = format!(
        "Recent conversation:\n{}\nSituation: {}\nQuestion: {}",
        render_transcript(&history[tail_start..]),
        situation,
        question
    );

    let request = GenerateRequest::new(prompt)
        .with_system(REASONING_SYSTEM.to_string())
        .with_max_tokens(256);

    match llm.generate(request).await {
        Ok(instruction) if !instruction.trim().is_empty() => instruction.trim().to_string(),
        Ok(_) => {
            tracing::warn!("Reasoning returned empty instruction, using fallback");
            REASONING_FALLBACK.to_string()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Reasoning request failed, using fallback");
            REASONING_FALLBACK.to_string()
        }
    }
}
