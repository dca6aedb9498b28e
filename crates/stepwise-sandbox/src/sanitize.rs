//! Output sanitization applied to every tool result before it leaves the sandbox.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Replacement for object values under a sensitive key.
pub const REDACTED: &str = "REDACTED";

const SENSITIVE_KEY_FRAGMENTS: &[&str] = &["password", "api_key", "secret", "token"];

fn credential_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(api_key|password|token)=([^\s&]+)").expect("valid regex")
    })
}

/// Redact `key=value` credential pairs inside free text.
pub fn sanitize_text(text: &str) -> String {
    credential_pattern()
        .replace_all(text, "$1=[REDACTED]")
        .into_owned()
}

pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEY_FRAGMENTS.iter().any(|fragment| key.contains(fragment))
}

/// Redact credentials from a tool result.
///
/// Strings get pattern redaction. Object values whose key names a credential
/// become `REDACTED`. Objects and arrays are walked recursively.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_text(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| {
                    let value = if is_sensitive_key(&key) {
                        Value::String(REDACTED.to_string())
                    } else {
                        sanitize(value)
                    };
                    (key, value)
                })
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}
