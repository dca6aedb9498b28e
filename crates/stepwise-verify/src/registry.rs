//! Two-level verifier registry.
//!
//! Verifiers are looked up by exact tool name. A second map holds verifiers by
//! generic type name (`json-schema`, `regex`, `exact-match`, `passthrough`, or
//! any custom type a host registers) so tools can be bound to a shared type.
//!
//! A tool with no verifier fails verification. Unverifiable tools must be
//! bound to `passthrough` explicitly if "always succeed" is intended.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, warn};

use stepwise_contracts::verify::VerificationResult;

use crate::builtin::BuiltinVerifier;

/// A pluggable check of one tool result against expected criteria.
///
/// Implementations must be pure: they inspect `result` and `expected` and
/// never call back into tools.
pub trait Verifier: Send + Sync {
    fn verify(&self, result: &Value, expected: &Value) -> VerificationResult;
}

/// A caller-supplied verification function.
pub type VerifierFn = Box<dyn Fn(&Value, &Value) -> VerificationResult + Send + Sync>;

/// Adapts a closure into a `Verifier`.
pub struct FnVerifier(VerifierFn);

impl FnVerifier {
    pub fn new(f: impl Fn(&Value, &Value) -> VerificationResult + Send + Sync + 'static) -> Self {
        Self(Box::new(f))
    }
}

impl Verifier for FnVerifier {
    fn verify(&self, result: &Value, expected: &Value) -> VerificationResult {
        (self.0)(result, expected)
    }
}

/// Tool categories `register_default_verifiers` wires, and the type each uses.
pub const DEFAULT_TOOL_BINDINGS: &[(&str, BuiltinVerifier)] = &[
    ("echo", BuiltinVerifier::ExactMatch),
    ("web_search", BuiltinVerifier::JsonSchema),
    ("http_request", BuiltinVerifier::JsonSchema),
    ("calculator", BuiltinVerifier::JsonSchema),
    ("file_read", BuiltinVerifier::JsonSchema),
    ("send_message", BuiltinVerifier::Passthrough),
];

/// Maps tool names and verifier type names to verifiers.
///
/// Owned state, not a process-wide singleton: construct one per tenant or
/// test and share it behind an `Arc`.
#[derive(Default)]
pub struct VerifierRegistry {
    by_tool: RwLock<HashMap<String, Arc<dyn Verifier>>>,
    by_type: RwLock<HashMap<String, Arc<dyn Verifier>>>,
}

impl VerifierRegistry {
    /// An empty registry. Every `verify` call fails until verifiers are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in types and default tool bindings wired.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register_default_verifiers();
        registry
    }

    /// Register (or replace) the verifier for `tool`.
    pub fn register_tool_verifier(&self, tool: impl Into<String>, verifier: Arc<dyn Verifier>) {
        let tool = tool.into();
        debug!(tool = %tool, "tool verifier registered");
        self.by_tool
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(tool, verifier);
    }

    /// Register (or replace) the verifier for a generic type name.
    pub fn register_type_verifier(&self, type_name: impl Into<String>, verifier: Arc<dyn Verifier>) {
        self.by_type
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(type_name.into(), verifier);
    }

    /// Point `tool` at the verifier registered under `type_name`.
    ///
    /// Returns false when no such type is registered.
    pub fn bind_tool_to_type(&self, tool: impl Into<String>, type_name: &str) -> bool {
        let verifier = self
            .by_type
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(type_name)
            .cloned();
        match verifier {
            Some(v) => {
                self.register_tool_verifier(tool, v);
                true
            }
            None => false,
        }
    }

    pub fn has_verifier(&self, tool: &str) -> bool {
        self.by_tool
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(tool)
    }

    /// Wire the built-in types and the default tool bindings.
    ///
    /// Idempotent, and never overwrites a verifier a caller already registered
    /// for a type or tool.
    pub fn register_default_verifiers(&self) {
        {
            let mut by_type = self.by_type.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            for builtin in BuiltinVerifier::ALL {
                by_type
                    .entry(builtin.name().to_string())
                    .or_insert_with(|| Arc::from(builtin.instantiate()));
            }
        }

        let by_type = self.by_type.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut by_tool = self.by_tool.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        for (tool, builtin) in DEFAULT_TOOL_BINDINGS {
            if by_tool.contains_key(*tool) {
                continue;
            }
            if let Some(verifier) = by_type.get(builtin.name()) {
                by_tool.insert(tool.to_string(), verifier.clone());
            }
        }
    }

    /// Verify `result` produced by `tool` against `expected`.
    pub fn verify(&self, tool: &str, result: &Value, expected: &Value) -> VerificationResult {
        let verifier = self
            .by_tool
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(tool)
            .cloned();

        let Some(verifier) = verifier else {
            warn!(tool = %tool, "no verifier registered");
            return VerificationResult::fail(format!("No verifier registered for tool: {tool}"));
        };

        let report = verifier.verify(result, expected);
        if report.passed {
            debug!(tool = %tool, "verification passed");
        } else {
            warn!(tool = %tool, errors = %report.summary(), "verification failed");
        }
        report
    }

    /// Verify with the verifier registered under a generic type name.
    pub fn verify_with_type(&self, type_name: &str, result: &Value, expected: &Value) -> VerificationResult {
        let verifier = self
            .by_type
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(type_name)
            .cloned();
        match verifier {
            Some(v) => v.verify(result, expected),
            None => VerificationResult::fail(format!("No verifier registered for type: {type_name}")),
        }
    }
}
