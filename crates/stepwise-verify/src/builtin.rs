//! Built-in verifiers.
//!
//! Each verifier reads its criteria from the `expected` argument:
//!
//! | Type          | `expected`                                   |
//! |---------------|----------------------------------------------|
//! | `json-schema` | a JSON Schema document; only `type`, `required` and `properties.*.type` are enforced |
//! | `regex`       | a pattern string, or `{ "pattern": "..." }`   |
//! | `exact-match` | the value the result must equal              |
//! | `passthrough` | ignored                                      |

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::{json, Value};

use stepwise_contracts::{
    tool::{schema_violations, JsonType},
    verify::VerificationResult,
};

use crate::registry::Verifier;

/// The closed set of verifier types shipped with the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinVerifier {
    JsonSchema,
    Regex,
    ExactMatch,
    Passthrough,
}

impl BuiltinVerifier {
    pub const ALL: [BuiltinVerifier; 4] = [
        BuiltinVerifier::JsonSchema,
        BuiltinVerifier::Regex,
        BuiltinVerifier::ExactMatch,
        BuiltinVerifier::Passthrough,
    ];

    /// The registry type name.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinVerifier::JsonSchema => "json-schema",
            BuiltinVerifier::Regex => "regex",
            BuiltinVerifier::ExactMatch => "exact-match",
            BuiltinVerifier::Passthrough => "passthrough",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }

    /// Build the verifier instance for this type.
    pub fn instantiate(&self) -> Box<dyn Verifier> {
        match self {
            BuiltinVerifier::JsonSchema => Box::new(JsonSchemaVerifier),
            BuiltinVerifier::Regex => Box::new(RegexVerifier),
            BuiltinVerifier::ExactMatch => Box::new(ExactMatchVerifier),
            BuiltinVerifier::Passthrough => Box::new(PassthroughVerifier),
        }
    }
}

// ── json-schema ───────────────────────────────────────────────────────────────

/// Validates with `jsonschema` against the shallow form of the expected
/// schema: top-level `type`, `required` and each property's `type`. Nested
/// schemas are not descended into.
pub struct JsonSchemaVerifier;

impl Verifier for JsonSchemaVerifier {
    fn verify(&self, result: &Value, expected: &Value) -> VerificationResult {
        if expected.is_null() {
            return VerificationResult::pass();
        }
        VerificationResult::from_errors(schema_violations(expected, result))
    }
}

// ── regex ─────────────────────────────────────────────────────────────────────

/// Requires a string result that matches a string pattern.
pub struct RegexVerifier;

impl Verifier for RegexVerifier {
    fn verify(&self, result: &Value, expected: &Value) -> VerificationResult {
        let pattern = match expected {
            Value::String(p) => p.as_str(),
            other => match other.get("pattern").and_then(Value::as_str) {
                Some(p) => p,
                None => return VerificationResult::fail("regex verifier requires a string pattern"),
            },
        };

        let Some(text) = result.as_str() else {
            return VerificationResult::fail(format!(
                "regex verifier requires a string result, got {}",
                JsonType::name_of(result)
            ));
        };

        match Regex::new(pattern) {
            Ok(re) if re.is_match(text) => VerificationResult::pass(),
            Ok(_) => VerificationResult::fail(format!("result does not match pattern '{pattern}'")),
            Err(e) => VerificationResult::fail(format!("invalid pattern '{pattern}': {e}")),
        }
    }
}

// ── exact-match ───────────────────────────────────────────────────────────────

/// Compares canonical JSON serializations of result and expected.
pub struct ExactMatchVerifier;

impl Verifier for ExactMatchVerifier {
    fn verify(&self, result: &Value, expected: &Value) -> VerificationResult {
        let actual = canonical_json(result);
        let wanted = canonical_json(expected);
        if actual == wanted {
            VerificationResult::pass()
        } else {
            VerificationResult::fail("result does not exactly match the expected value")
                .with_details(json!({ "expected": wanted, "actual": actual }))
        }
    }
}

/// Serialize `value` with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    fn sorted(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let ordered: BTreeMap<&String, Value> =
                    map.iter().map(|(k, v)| (k, sorted(v))).collect();
                let mut out = serde_json::Map::new();
                for (k, v) in ordered {
                    out.insert(k.clone(), v);
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
            other => other.clone(),
        }
    }
    sorted(value).to_string()
}

// ── passthrough ───────────────────────────────────────────────────────────────

/// Never fails. Wire a tool to this when "always succeed" is the intended policy.
pub struct PassthroughVerifier;

impl Verifier for PassthroughVerifier {
    fn verify(&self, _result: &Value, _expected: &Value) -> VerificationResult {
        VerificationResult::pass()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_schema_checks_required_and_types() {
        let schema = json!({
            "type": "object",
            "required": ["results"],
            "properties": {
                "results": { "type": "array" },
                "total": { "type": "integer" }
            }
        });

        assert!(JsonSchemaVerifier.verify(&json!({ "results": [], "total": 3 }), &schema).passed);

        let report = JsonSchemaVerifier.verify(&json!({ "total": "three" }), &schema);
        assert!(!report.passed);
        assert_eq!(report.errors.len(), 2, "errors: {:?}", report.errors);
    }

    #[test]
    fn json_schema_does_not_descend_into_nested_schemas() {
        let schema = json!({
            "type": "object",
            "properties": {
                "inner": { "type": "object", "required": ["deep"] }
            }
        });
        assert!(JsonSchemaVerifier.verify(&json!({ "inner": {} }), &schema).passed);
    }

    #[test]
    fn json_schema_top_level_type_mismatch() {
        let report = JsonSchemaVerifier.verify(&json!("text"), &json!({ "type": "number" }));
        assert!(!report.passed);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("\"number\""), "{:?}", report.errors);
    }

    #[test]
    fn json_schema_reports_malformed_schema() {
        let report = JsonSchemaVerifier.verify(&json!({}), &json!({ "type": 7 }));
        assert!(!report.passed);
        assert!(report.errors[0].starts_with("invalid JSON Schema document"));
    }

    #[test]
    fn regex_requires_string_result_and_pattern() {
        assert!(RegexVerifier.verify(&json!("order-1234"), &json!({ "pattern": r"^order-\d+$" })).passed);
        assert!(RegexVerifier.verify(&json!("order-1234"), &json!(r"\d{4}")).passed);

        let no_match = RegexVerifier.verify(&json!("refund"), &json!(r"^order-"));
        assert!(!no_match.passed);

        let bad_result = RegexVerifier.verify(&json!(42), &json!(r"\d+"));
        assert!(bad_result.errors[0].contains("string result"));

        let bad_pattern = RegexVerifier.verify(&json!("x"), &json!({ "pattern": 7 }));
        assert!(bad_pattern.errors[0].contains("string pattern"));

        let invalid = RegexVerifier.verify(&json!("x"), &json!("(unclosed"));
        assert!(invalid.errors[0].contains("invalid pattern"));
    }

    #[test]
    fn exact_match_ignores_key_order() {
        let a = json!({ "b": 1, "a": { "y": [1, 2], "x": null } });
        let b = json!({ "a": { "x": null, "y": [1, 2] }, "b": 1 });
        assert!(ExactMatchVerifier.verify(&a, &b).passed);

        let report = ExactMatchVerifier.verify(&json!([2, 1]), &json!([1, 2]));
        assert!(!report.passed);
        assert!(report.details.is_some());
    }

    #[test]
    fn passthrough_never_fails() {
        assert!(PassthroughVerifier.verify(&json!(null), &json!({ "anything": true })).passed);
    }

    #[test]
    fn builtin_names_round_trip() {
        for builtin in BuiltinVerifier::ALL {
            assert_eq!(BuiltinVerifier::parse(builtin.name()), Some(builtin));
        }
        assert_eq!(BuiltinVerifier::parse("fuzzy"), None);
    }
}
