//! Blocklist policy gate implementation.
//!
//! Evaluation algorithm:
//!
//! 1. An empty (anonymous) principal → `Deny`.
//! 2. An action of the form `tool:<name>` whose name is on the blocklist → `Deny`.
//! 3. Everything else → `Allow`.
//!
//! `evaluate` never touches the audit log. Decisions are recorded only when a
//! caller asks via `record_decision`.

use std::collections::HashSet;
use std::path::Path;
use std::sync::RwLock;

use tracing::{debug, warn};

use stepwise_audit::InMemoryAuditWriter;
use stepwise_contracts::{
    error::StepwiseResult,
    policy::{PolicyDecision, PolicyOutcome, PolicyVerdict},
};
use stepwise_core::traits::{AuditWriter, PolicyGate};

use crate::rule::{normalize_tool_name, PolicyConfig, TOOL_PREFIX};

/// A `PolicyGate` that denies anonymous principals and blocklisted tools.
///
/// ```rust,ignore
/// use stepwise_policy::BlocklistPolicyGate;
///
/// let gate = BlocklistPolicyGate::from_file(Path::new("policy.toml"))?;
/// assert!(!gate.authorize("tool:shell_exec", "user-1"));
/// ```
pub struct BlocklistPolicyGate {
    blocked: RwLock<HashSet<String>>,
    audit: Box<dyn AuditWriter>,
}

impl BlocklistPolicyGate {
    /// Build a gate from `config`, auditing into a fresh in-memory chain.
    pub fn new(config: &PolicyConfig) -> Self {
        Self::with_audit_writer(config, Box::new(InMemoryAuditWriter::new()))
    }

    /// Build a gate that records decisions into `audit`.
    pub fn with_audit_writer(config: &PolicyConfig, audit: Box<dyn AuditWriter>) -> Self {
        Self {
            blocked: RwLock::new(config.normalized_blocklist().collect()),
            audit,
        }
    }

    /// Parse `s` as TOML policy configuration and build a gate.
    pub fn from_toml_str(s: &str) -> StepwiseResult<Self> {
        Ok(Self::new(&PolicyConfig::from_toml_str(s)?))
    }

    /// Read a TOML policy file and build a gate.
    pub fn from_file(path: &Path) -> StepwiseResult<Self> {
        Ok(Self::new(&PolicyConfig::from_file(path)?))
    }

    /// Add a tool to the blocklist.
    pub fn block_tool(&self, tool: &str) {
        let name = normalize_tool_name(tool);
        warn!(tool = %name, "tool added to policy blocklist");
        self.blocked
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name);
    }

    /// Remove a tool from the blocklist. Returns false if it was not blocked.
    pub fn unblock_tool(&self, tool: &str) -> bool {
        self.blocked
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&normalize_tool_name(tool))
    }

    pub fn is_blocked(&self, tool: &str) -> bool {
        self.blocked
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&normalize_tool_name(tool))
    }

    /// Drop every audit entry. Intended for test resets only.
    pub fn clear_audit_log(&self) -> StepwiseResult<()> {
        self.audit.clear()
    }
}

impl PolicyGate for BlocklistPolicyGate {
    fn evaluate(&self, action: &str, principal_id: &str) -> PolicyVerdict {
        debug!(action = %action, principal_id = %principal_id, "evaluating policy");

        if principal_id.trim().is_empty() {
            warn!(action = %action, "anonymous principal denied");
            return PolicyVerdict::Deny {
                reason: "anonymous principals are not authorized".to_string(),
            };
        }

        if let Some(tool) = action.strip_prefix(TOOL_PREFIX) {
            if self.is_blocked(tool) {
                warn!(
                    action = %action,
                    principal_id = %principal_id,
                    "blocklisted tool denied"
                );
                return PolicyVerdict::Deny {
                    reason: format!("tool '{tool}' is blocked by policy"),
                };
            }
        }

        PolicyVerdict::Allow
    }

    fn record_decision(
        &self,
        action: &str,
        principal_id: &str,
        outcome: PolicyOutcome,
        reason: &str,
    ) -> StepwiseResult<()> {
        self.audit
            .write(&PolicyDecision::new(action, principal_id, outcome, reason))
    }

    fn audit_log(&self) -> StepwiseResult<Vec<PolicyDecision>> {
        self.audit.entries()
    }
}
