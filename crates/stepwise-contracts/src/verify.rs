//! Verification result type.
//!
//! A verifier inspects a tool's result against the caller's expected
//! criteria. The result is ephemeral: it is returned per call and never
//! persisted by the core.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The outcome of verifying one tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// True only when every check passed.
    pub passed: bool,
    /// All failures collected during the run. Empty on pass.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Optional structured details a verifier chooses to expose.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl VerificationResult {
    /// A passing result with no details.
    pub fn pass() -> Self {
        Self {
            passed: true,
            errors: Vec::new(),
            details: None,
        }
    }

    /// A failing result with a single error.
    pub fn fail(error: impl Into<String>) -> Self {
        Self::from_errors(vec![error.into()])
    }

    /// Pass when `errors` is empty, fail otherwise.
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            passed: errors.is_empty(),
            errors,
            details: None,
        }
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// All errors joined into one line for logs and event payloads.
    pub fn summary(&self) -> String {
        self.errors.join("; ")
    }
}
