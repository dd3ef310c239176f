//! Decoder output hygiene.
//!
//! Raw engine segments carry non-speech annotations: bracketed tags like
//! `[BLANK_AUDIO]` or `[ Background Conversations ]` and bare hallucination
//! markers. Both are stripped before a segment reaches the merge engine; a
//! segment that cleans to empty means the window held no usable speech.

/// Removes `[` ... `]` spans, including partial ones.
///
/// An unterminated opening bracket drops the rest of the string, matching
/// how decoders emit truncated annotations at window edges.
pub fn strip_bracketed(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_bracket = false;

    for ch in text.chars() {
        match ch {
            '[' => in_bracket = true,
            ']' if in_bracket => in_bracket = false,
            _ if !in_bracket => result.push(ch),
            _ => {}
        }
    }

    result
}

/// Cleans one decoded segment: bracketed spans out, markers out, trimmed.
pub fn clean_segment(text: &str, markers: &[String]) -> String {
    let mut cleaned = strip_bracketed(text);
    for marker in markers {
        if !marker.is_empty() {
            cleaned = cleaned.replace(marker.as_str(), "");
        }
    }
    cleaned.trim().to_string()
}
