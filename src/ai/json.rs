//! JSON extraction from model output
//!
//! Models asked for JSON still wrap it in code fences, add a sentence of
//! preamble, or stop mid-object. Extraction tries, in order: a direct parse of
//! the fence-stripped text, a repaired parse (trailing commas dropped, open
//! strings and brackets closed), and finally the outermost `{...}` span.

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{ErrorCategory, ResearchError, Result};

/// Parse a JSON value out of raw model output
pub fn extract_json_from_response(content: &str) -> Result<Value> {
    let cleaned = preprocess(content);

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }

    debug!("Initial JSON parse failed, attempting repair");
    let repaired = close_open_structures(&strip_trailing_commas(&cleaned));
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        warn!("Model output needed JSON repair");
        return Ok(value);
    }

    if let Some(span) = outermost_object(&cleaned)
        && let Ok(value) = serde_json::from_str::<Value>(&strip_trailing_commas(span))
    {
        warn!("JSON extracted from mixed model output");
        return Ok(value);
    }

    Err(ResearchError::llm_with_category(
        ErrorCategory::ParseError,
        format!(
            "Model output is not valid JSON. Preview: {}...",
            cleaned.chars().take(200).collect::<String>()
        ),
    ))
}

fn preprocess(raw: &str) -> String {
    let s = raw.trim().trim_start_matches('\u{feff}');
    let s = match s.strip_prefix("```") {
        Some(rest) => rest.split_once('\n').map(|(_, body)| body).unwrap_or(""),
        None => s,
    };
    let s = s.trim_end();
    s.strip_suffix("```").unwrap_or(s).trim().to_string()
}

fn strip_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escape = false;

    for (i, &ch) in chars.iter().enumerate() {
        if escape {
            escape = false;
            out.push(ch);
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            ',' if !in_string => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if matches!(next, Some(']') | Some('}')) {
                    continue;
                }
            }
            _ => {}
        }
        out.push(ch);
    }
    out
}

fn close_open_structures(s: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for ch in s.chars() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => stack.push('}'),
            '[' if !in_string => stack.push(']'),
            '}' | ']' if !in_string => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut out = s.to_string();
    if in_string {
        out.push('"');
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

fn outermost_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (end > start).then(|| &s[start..=end])
}
