//! # stepwise-policy
//!
//! A TOML-configured, permissive-by-default policy gate.
//!
//! ## Overview
//!
//! [`BlocklistPolicyGate`] implements the
//! [`PolicyGate`](stepwise_core::traits::PolicyGate) trait. It is a deny-list,
//! not an allow-list: named principals may do anything except invoke a tool
//! listed in `blocked_tools`. Anonymous (empty) principals are always denied.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use stepwise_policy::BlocklistPolicyGate;
//!
//! let gate = BlocklistPolicyGate::from_toml_str(r#"blocked_tools = ["shell_exec"]"#)?;
//! ```

pub mod engine;
pub mod rule;

pub use engine::BlocklistPolicyGate;
pub use rule::PolicyConfig;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use stepwise_contracts::{
        error::StepwiseError,
        policy::{PolicyOutcome, PolicyVerdict},
    };
    use stepwise_core::traits::PolicyGate;

    use crate::{BlocklistPolicyGate, PolicyConfig};

    fn gate(blocked: &[&str]) -> BlocklistPolicyGate {
        BlocklistPolicyGate::new(&PolicyConfig {
            blocked_tools: blocked.iter().map(|s| s.to_string()).collect(),
        })
    }

    // ── 1. anonymous principals ───────────────────────────────────────────────

    #[test]
    fn test_anonymous_principal_denied() {
        let gate = gate(&[]);
        assert!(!gate.authorize("tool:echo", ""));
        assert!(!gate.authorize("memory:read", "   "));

        match gate.evaluate("tool:echo", "") {
            PolicyVerdict::Deny { reason } => assert!(reason.contains("anonymous")),
            other => panic!("expected Deny, got {:?}", other),
        }
    }

    // ── 2. blocklisted tools ──────────────────────────────────────────────────

    #[test]
    fn test_blocklisted_tool_denied() {
        let gate = gate(&["shell_exec", "tool:rm_rf"]);

        assert!(!gate.authorize("tool:shell_exec", "user-1"));
        assert!(!gate.authorize("tool:rm_rf", "user-1"));
        assert!(gate.authorize("tool:echo", "user-1"));
    }

    /// A blocked tool name only matters in the `tool:` namespace.
    #[test]
    fn test_blocklist_only_applies_to_tool_actions() {
        let gate = gate(&["shell_exec"]);
        assert!(gate.authorize("shell_exec", "user-1"));
        assert!(gate.authorize("resource:shell_exec", "user-1"));
    }

    // ── 3. permissive default ─────────────────────────────────────────────────

    #[test]
    fn test_allow_by_default() {
        let gate = gate(&[]);
        assert_eq!(gate.evaluate("anything:at_all", "user-1"), PolicyVerdict::Allow);
    }

    #[test]
    fn test_runtime_block_and_unblock() {
        let gate = gate(&[]);
        gate.block_tool("web_search");
        assert!(!gate.authorize("tool:web_search", "user-1"));

        assert!(gate.unblock_tool("tool:web_search"));
        assert!(gate.authorize("tool:web_search", "user-1"));
        assert!(!gate.unblock_tool("web_search"));
    }

    // ── 4. audit log ──────────────────────────────────────────────────────────

    /// Authorization alone never writes to the audit log.
    #[test]
    fn test_authorize_does_not_audit() {
        let gate = gate(&["shell_exec"]);
        gate.authorize("tool:shell_exec", "user-1");
        gate.authorize("tool:echo", "user-1");
        assert!(gate.audit_log().unwrap().is_empty());
    }

    #[test]
    fn test_record_decision_in_insertion_order() {
        let gate = gate(&[]);
        gate.record_decision("tool:a", "user-1", PolicyOutcome::Allow, "ok").unwrap();
        gate.record_decision("tool:b", "user-2", PolicyOutcome::Deny, "blocked").unwrap();

        let log = gate.audit_log().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].action, "tool:a");
        assert_eq!(log[1].principal_id, "user-2");
        assert_eq!(log[1].outcome, PolicyOutcome::Deny);
        assert_eq!(log[1].reason, "blocked");

        gate.clear_audit_log().unwrap();
        assert!(gate.audit_log().unwrap().is_empty());
    }

    // ── 5. TOML configuration ─────────────────────────────────────────────────

    #[test]
    fn test_from_toml() {
        let gate = BlocklistPolicyGate::from_toml_str(
            r#"
            blocked_tools = ["shell_exec"]
            "#,
        )
        .unwrap();
        assert!(!gate.authorize("tool:shell_exec", "user-1"));

        let empty = BlocklistPolicyGate::from_toml_str("").unwrap();
        assert!(empty.authorize("tool:shell_exec", "user-1"));
    }

    #[test]
    fn test_toml_parse_error() {
        match BlocklistPolicyGate::from_toml_str("blocked_tools = [[[") {
            Err(StepwiseError::Config { reason }) => {
                assert!(reason.contains("failed to parse policy TOML"), "got: {reason}");
            }
            Ok(_) => panic!("expected Config error"),
            Err(other) => panic!("expected Config error, got {:?}", other),
        }
    }
}
