//! Voicemail detection
//!
//! Keyword match against a fixed set of voicemail indicators. False
//! positives cost a wasted call, not correctness, so the set leans broad.

use once_cell::sync::Lazy;

static VOICEMAIL_INDICATORS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "leave a message",
        "leave your message",
        "leave your name and number",
        "after the beep",
        "after the tone",
        "at the tone",
        "voicemail",
        "voice mail",
        "mailbox",
        "is not available",
        "unable to take your call",
        "can't take your call",
        "cannot take your call",
        "record your message",
        "please record",
    ]
});

/// Check a transcript fragment for voicemail indicators.
pub fn detect_voicemail(text: &str) -> bool {
    let lower = text.to_lowercase();
    VOICEMAIL_INDICATORS.iter().any(|kw| lower.contains(kw))
}
