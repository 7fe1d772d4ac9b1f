//! Secret redaction for printed documents
//!
//! LLM configs routinely carry provider credentials. Anything printed by
//! the CLI passes through [`redact_secrets`] unless explicitly revealed.

use serde_json::Value;

/// Replacement text for redacted values
pub const REDACTED: &str = "[REDACTED]";

/// Key segment runs that mark a value as secret.
///
/// Keys are split into lowercase segments on `_`, `-`, `.` and camelCase
/// boundaries, so `OPENAI_API_KEY` and `apiKey` match `api key` while
/// `max_tokens` does not match `token`.
const SECRET_SEGMENTS: &[&[&str]] = &[
    &["password"],
    &["passwd"],
    &["token"],
    &["secret"],
    &["private", "key"],
    &["api", "key"],
    &["apikey"],
    &["credential"],
];

/// Redact secrets in place, returning the redacted key paths.
///
/// Only non-null scalars are replaced; a secret-looking key holding an
/// object or array is descended into instead.
pub fn redact_secrets(value: &mut Value) -> Vec<String> {
    let mut redactions = Vec::new();
    redact_value(value, "", &mut redactions);
    redactions
}

fn redact_value(value: &mut Value, path: &str, redactions: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                let scalar = !(child.is_object() || child.is_array() || child.is_null());
                if scalar && is_secret_key(key) {
                    *child = Value::String(REDACTED.to_string());
                    redactions.push(child_path);
                } else {
                    redact_value(child, &child_path, redactions);
                }
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter_mut().enumerate() {
                redact_value(item, &format!("{path}[{index}]"), redactions);
            }
        }
        _ => {}
    }
}

fn is_secret_key(key: &str) -> bool {
    let segments = key_segments(key);
    SECRET_SEGMENTS.iter().any(|run| {
        segments
            .windows(run.len())
            .any(|window| window.iter().zip(run.iter()).all(|(a, b)| a == b))
    })
}

fn key_segments(key: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in key.chars() {
        if matches!(c, '_' | '-' | '.' | ' ') {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        segments.push(current);
    }
    // Plural forms count as the singular segment
    segments
        .into_iter()
        .map(|segment| match segment.strip_suffix('s') {
            Some(singular) if singular == "credential" || singular == "secret" => {
                singular.to_string()
            }
            _ => segment,
        })
        .collect()
}
