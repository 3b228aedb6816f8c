//! Recovers the JSON object from free-form model text.

const FENCE: &str = "```";

/// Strip code fences and isolate the outermost `{ ... }` range.
///
/// Purely textual: the result is the best guess at a JSON object and is not
/// validated here. Never fails.
pub fn normalize(raw: &str) -> String {
    let mut text = raw.trim();

    if text.starts_with(FENCE) {
        // Drop the opening marker line, including any language tag
        text = match text.find('\n') {
            Some(newline) => &text[newline + 1..],
            None => &text[FENCE.len()..],
        };
        if let Some(stripped) = text.trim_end().strip_suffix(FENCE) {
            text = stripped;
        }
        text = text.trim();
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}
