//! Policy verdict and audit decision types.
//!
//! The policy gate answers "may this principal perform this action?" with a
//! `PolicyVerdict`. Callers that want a durable record of the answer write a
//! `PolicyDecision` to the audit log explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The answer the policy gate gives for one `(action, principal)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyVerdict {
    /// The action is permitted.
    Allow,

    /// The action is denied.
    Deny {
        /// Human-readable explanation, suitable for the audit log.
        reason: String,
    },
}

impl PolicyVerdict {
    /// True for `Allow`.
    pub fn is_allow(&self) -> bool {
        matches!(self, PolicyVerdict::Allow)
    }

    /// The outcome tag recorded in the audit log for this verdict.
    pub fn outcome(&self) -> PolicyOutcome {
        match self {
            PolicyVerdict::Allow => PolicyOutcome::Allow,
            PolicyVerdict::Deny { .. } => PolicyOutcome::Deny,
        }
    }

    /// The denial reason, or a fixed description for `Allow`.
    pub fn reason(&self) -> String {
        match self {
            PolicyVerdict::Allow => "allowed".to_string(),
            PolicyVerdict::Deny { reason } => reason.clone(),
        }
    }
}

/// The outcome column of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyOutcome {
    Allow,
    Deny,
}

/// One append-only audit entry describing a policy decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// The action that was evaluated, e.g. `tool:web_search`.
    pub action: String,
    /// The principal the action was evaluated for.
    pub principal_id: String,
    pub outcome: PolicyOutcome,
    pub reason: String,
    /// Wall-clock time the decision was recorded (UTC).
    pub timestamp: DateTime<Utc>,
}

impl PolicyDecision {
    /// Build a decision stamped with the current time.
    pub fn new(
        action: impl Into<String>,
        principal_id: impl Into<String>,
        outcome: PolicyOutcome,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            principal_id: principal_id.into(),
            outcome,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The action string the gate evaluates for a tool invocation.
pub fn tool_action(tool_name: &str) -> String {
    format!("tool:{tool_name}")
}
