//! Shared helpers for JSON extraction and text cleanup.

use regex::Regex;
use std::fmt::Display;
use std::sync::LazyLock;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static regex"));

// =============================================================================
// JSON Value Extraction Helpers
// =============================================================================

#[inline]
pub fn json_string(value: &serde_json::Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(String::from)
}

/// Extract a string array, skipping non-string entries
#[inline]
pub fn json_string_array(value: &serde_json::Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|s| s.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[inline]
pub fn json_f64(value: &serde_json::Value, key: &str, default: f64) -> f64 {
    value.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
}

// =============================================================================
// Text
// =============================================================================

/// Collapse runs of whitespace (including newlines) into single spaces
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip markup tags and decode the handful of entities search APIs emit
pub fn strip_html(s: &str) -> String {
    let stripped = HTML_TAG.replace_all(s, "");
    let decoded = stripped
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    collapse_whitespace(&decoded)
}

/// Truncate to `max` characters, appending "..." when anything was cut
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

// =============================================================================
// Error Logging Helpers
// =============================================================================

/// Keep the value, or log the error at warn level and drop it.
pub fn log_filter_warn<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("{}: {}", context, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_helpers() {
        let v = json!({"name": "x", "tags": ["a", 1, "b"], "score": 0.5});
        assert_eq!(json_string(&v, "name").as_deref(), Some("x"));
        assert_eq!(json_string(&v, "missing"), None);
        assert_eq!(json_string_array(&v, "tags"), vec!["a", "b"]);
        assert_eq!(json_f64(&v, "score", 0.0), 0.5);
        assert_eq!(json_f64(&v, "name", 0.1), 0.1);
    }

    #[test]
    fn test_strip_html() {
        let raw = r#"The <span class="searchmatch">meaning</span> of &quot;life&quot;"#;
        assert_eq!(strip_html(raw), "The meaning of \"life\"");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello...");
        assert_eq!(truncate_chars("héllo wörld", 4), "héll...");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a\n\n b\t c "), "a b c");
    }
}
