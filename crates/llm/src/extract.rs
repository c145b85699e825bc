//! Structured payload extraction
//!
//! Models wrap structured payloads in prose or code fences more often than
//! not. Extraction locates the embedded JSON object instead of assuming the
//! whole response is one.

use serde::de::DeserializeOwned;

use crate::LlmError;

/// Locate the JSON object embedded in a model response.
///
/// Checks ```json fences first, then falls back to the first balanced
/// `{...}` span. Returns the raw slice without parsing it.
pub fn extract_json_payload(response: &str) -> Option<&str> {
    if let Some(fenced) = extract_fenced(response) {
        return Some(fenced);
    }
    extract_balanced_object(response)
}

/// Parse the embedded payload into a concrete type.
pub fn parse_structured<T: DeserializeOwned>(response: &str) -> Result<T, LlmError> {
    let payload = extract_json_payload(response).ok_or(LlmError::NoPayload)?;
    serde_json::from_str(payload).map_err(|e| LlmError::InvalidResponse(e.to_string()))
}

fn extract_fenced(response: &str) -> Option<&str> {
    let fence_start = response.find("```")?;
    let after_fence = &response[fence_start + 3..];
    // skip an optional language tag up to the newline
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let fence_end = body.find("```")?;
    let candidate = body[..fence_end].trim();
    if candidate.starts_with('{') {
        Some(candidate)
    } else {
        None
    }
}

fn extract_balanced_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let bytes = response.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&response[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
