//! Input clamping applied before anything is embedded in a prompt.

/// Collapses whitespace runs to one space, trims, and keeps at most `max`
/// characters. A trailing space exposed by the cut is dropped so the result
/// is stable under repeated application. Absent request fields arrive here
/// as empty strings and come back empty.
pub fn truncate(text: &str, max: usize) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match normalized.char_indices().nth(max) {
        Some((cut, _)) => normalized[..cut].trim_end().to_string(),
        None => normalized,
    }
}
