//! Lenient parsing of model output. Even with `json_object` response
//! format the content sometimes arrives fenced, with typographic quotes,
//! trailing commas, or truncated mid-stream; parsing tries the raw text
//! first and only then applies repairs.

use crate::error::{AppError, AppResult};
use once_cell::sync::Lazy;
use regex::Regex;

static SMART_QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[“”]").expect("valid regex"));
static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\s*[}\]])").expect("valid regex"));

pub fn parse_model_json(raw: &str) -> AppResult<serde_json::Value> {
    let s = strip_fences(raw.trim());

    if let Ok(value) = serde_json::from_str(&s) {
        return Ok(value);
    }

    let mut repaired = s.replace(['\n', '\r'], " ");
    repaired = SMART_QUOTES.replace_all(&repaired, "\"").into_owned();
    repaired = repaired.replace('\'', "\"");
    repaired = TRAILING_COMMA.replace_all(&repaired, "$1").into_owned();

    if let Ok(value) = serde_json::from_str(&repaired) {
        return Ok(value);
    }

    // Last resort: drop anything after the final closing brace.
    if let Some(last_brace) = repaired.rfind('}') {
        if let Ok(value) = serde_json::from_str(&repaired[..=last_brace]) {
            return Ok(value);
        }
    }

    Err(AppError::ModelOutput(format!(
        "unparseable model response: {}",
        truncate(raw, 200)
    )))
}

fn strip_fences(s: &str) -> String {
    if !s.starts_with("```") {
        return s.to_string();
    }

    let inner = s.trim_matches('`');
    match (inner.find('{'), inner.rfind('}')) {
        (Some(start), Some(end)) if start < end => inner[start..=end].to_string(),
        _ => inner.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
