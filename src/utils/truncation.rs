const MAX_ERROR_LENGTH: usize = 2_000;

/// Cut `text` to at most `max_chars` characters, never splitting a
/// character. A marker noting how much was dropped is appended when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => {
            let dropped = text[byte_idx..].chars().count();
            format!("{}\n... [truncated {} chars]", &text[..byte_idx], dropped)
        }
    }
}

/// Error strings kept in action history and debug bundles.
pub fn truncate_error(error: &str) -> String {
    match error.char_indices().nth(MAX_ERROR_LENGTH) {
        None => error.to_string(),
        Some((byte_idx, _)) => format!("{}...", &error[..byte_idx]),
    }
}
