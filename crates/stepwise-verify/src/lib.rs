//! # stepwise-verify
//!
//! Result verification for the stepwise execution core.
//!
//! This crate provides [`registry::VerifierRegistry`], which maps tool names
//! to pluggable [`registry::Verifier`]s, and four built-in verifier types
//! (`json-schema`, `regex`, `exact-match`, `passthrough`).
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use stepwise_verify::{FnVerifier, VerifierRegistry};
//!
//! let registry = VerifierRegistry::with_defaults();
//! registry.register_tool_verifier("ticket_lookup", Arc::new(FnVerifier::new(|result, _| {
//!     if result.get("ticket_id").is_some() {
//!         VerificationResult::pass()
//!     } else {
//!         VerificationResult::fail("ticket_id missing")
//!     }
//! })));
//! ```

pub mod builtin;
pub mod registry;

pub use builtin::BuiltinVerifier;
pub use registry::{FnVerifier, Verifier, VerifierRegistry};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use stepwise_contracts::verify::VerificationResult;

    use crate::{FnVerifier, VerifierRegistry};

    #[test]
    fn test_unregistered_tool_fails() {
        let registry = VerifierRegistry::new();
        let report = registry.verify("mystery_tool", &json!({}), &json!(null));

        assert!(!report.passed);
        assert_eq!(report.errors, vec!["No verifier registered for tool: mystery_tool".to_string()]);
    }

    #[test]
    fn test_tool_verifier_dispatch() {
        let registry = VerifierRegistry::new();
        registry.register_tool_verifier(
            "ticket_lookup",
            Arc::new(FnVerifier::new(|result, _| {
                if result.get("ticket_id").is_some() {
                    VerificationResult::pass()
                } else {
                    VerificationResult::fail("ticket_id missing")
                }
            })),
        );

        assert!(registry.verify("ticket_lookup", &json!({ "ticket_id": 7 }), &json!(null)).passed);
        assert!(!registry.verify("ticket_lookup", &json!({}), &json!(null)).passed);
    }

    #[test]
    fn test_default_bindings() {
        let registry = VerifierRegistry::with_defaults();

        assert!(registry.has_verifier("echo"));
        assert!(registry.has_verifier("web_search"));
        assert!(registry.verify("send_message", &json!(null), &json!(null)).passed);
        assert!(registry.verify("echo", &json!({ "text": "hi" }), &json!({ "text": "hi" })).passed);
        assert!(!registry.verify("echo", &json!({ "text": "hi" }), &json!({ "text": "bye" })).passed);
    }

    /// Registering defaults must not overwrite a caller's verifier, and a
    /// second call changes nothing.
    #[test]
    fn test_register_defaults_is_idempotent_and_non_destructive() {
        let registry = VerifierRegistry::new();
        registry.register_tool_verifier(
            "echo",
            Arc::new(FnVerifier::new(|_, _| VerificationResult::fail("custom echo verifier"))),
        );

        registry.register_default_verifiers();
        registry.register_default_verifiers();

        let report = registry.verify("echo", &json!(1), &json!(1));
        assert_eq!(report.errors, vec!["custom echo verifier".to_string()]);
        assert!(registry.has_verifier("calculator"));
    }

    #[test]
    fn test_bind_tool_to_type() {
        let registry = VerifierRegistry::with_defaults();

        assert!(registry.bind_tool_to_type("order_status", "regex"));
        assert!(registry.verify("order_status", &json!("shipped"), &json!("^(shipped|pending)$")).passed);

        assert!(!registry.bind_tool_to_type("other", "no-such-type"));
        assert!(!registry.has_verifier("other"));
    }

    #[test]
    fn test_verify_with_type() {
        let registry = VerifierRegistry::with_defaults();
        assert!(registry.verify_with_type("passthrough", &json!(1), &json!(2)).passed);
        assert!(!registry.verify_with_type("exact-match", &json!(1), &json!(2)).passed);
        assert!(!registry.verify_with_type("unknown", &json!(1), &json!(1)).passed);
    }
}
