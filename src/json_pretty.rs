//! Plain-text JSON formatting for the drawer.

use serde_json::Value;

/// Format JSON as indented plain text.
pub fn pretty(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| "{}".to_string())
}

/// Format JSON with truncation for oversized payloads.
///
/// Limits output to `max_bytes` so a pathological enrichment payload cannot
/// swamp the drawer; cuts on a line boundary to avoid dangling JSON.
pub fn pretty_safe(v: &Value, max_bytes: usize) -> String {
    let formatted = pretty(v);
    if formatted.len() <= max_bytes {
        return formatted;
    }
    let cut = formatted
        .char_indices()
        .take_while(|(i, _)| *i < max_bytes)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(0);
    let last_newline = formatted[..cut].rfind('\n').unwrap_or(cut);
    format!(
        "{}\n... (truncated - {} total bytes)",
        &formatted[..last_newline],
        formatted.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn small_payloads_pass_through() {
        let v = json!({"theme": "IT"});
        assert_eq!(pretty_safe(&v, 1024), pretty(&v));
    }

    #[test]
    fn oversized_payloads_are_cut_on_a_line() {
        let v = json!({"items": (0..200).map(|i| format!("row-{i}")).collect::<Vec<_>>()});
        let out = pretty_safe(&v, 256);
        assert!(out.len() < pretty(&v).len());
        assert!(out.contains("truncated"));
    }
}
