//! # stepwise-audit
//!
//! Append-only, SHA-256 hash-chained log of policy decisions.
//!
//! ## Overview
//!
//! Every decision recorded through the policy gate is wrapped in an
//! `AuditEvent` linked to the previous event by its hash. Editing any stored
//! decision breaks the chain and is detected by `verify_chain`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stepwise_audit::InMemoryAuditWriter;
//! use stepwise_core::traits::AuditWriter;
//!
//! let writer = InMemoryAuditWriter::new();
//! writer.write(&decision)?;
//! assert!(writer.verify_integrity());
//! ```

pub mod chain;
pub mod event;
pub mod memory;

pub use chain::{hash_event, verify_chain};
pub use event::AuditEvent;
pub use memory::InMemoryAuditWriter;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use stepwise_contracts::policy::{PolicyDecision, PolicyOutcome};
    use stepwise_core::traits::AuditWriter;

    use super::{AuditEvent, InMemoryAuditWriter};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn decision(action: &str, outcome: PolicyOutcome) -> PolicyDecision {
        PolicyDecision::new(action, "user-1", outcome, "test")
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_entries_preserve_insertion_order() {
        let writer = InMemoryAuditWriter::new();
        writer.write(&decision("tool:a", PolicyOutcome::Allow)).unwrap();
        writer.write(&decision("tool:b", PolicyOutcome::Deny)).unwrap();
        writer.write(&decision("tool:c", PolicyOutcome::Allow)).unwrap();

        let actions: Vec<String> = writer.entries().unwrap().into_iter().map(|d| d.action).collect();
        assert_eq!(actions, vec!["tool:a", "tool:b", "tool:c"]);
    }

    #[test]
    fn test_hash_chain_integrity() {
        let writer = InMemoryAuditWriter::new();
        for action in ["tool:a", "tool:b", "tool:c"] {
            writer.write(&decision(action, PolicyOutcome::Allow)).unwrap();
        }

        assert!(writer.verify_integrity(), "chain must be valid after sequential writes");
        let events = writer.events().unwrap();
        assert_eq!(events[0].prev_hash, AuditEvent::GENESIS_HASH);
        assert_eq!(writer.head_hash().unwrap(), events[2].this_hash);
    }

    /// Rewriting a stored decision's outcome breaks the chain.
    #[test]
    fn test_tamper_detection() {
        let writer = InMemoryAuditWriter::new();
        writer.write(&decision("tool:shell", PolicyOutcome::Deny)).unwrap();
        writer.write(&decision("tool:echo", PolicyOutcome::Allow)).unwrap();

        {
            let mut state = writer.state.lock().unwrap();
            state.events[0].decision.outcome = PolicyOutcome::Allow;
        }

        assert!(!writer.verify_integrity(), "chain must detect a rewritten outcome");
    }

    #[test]
    fn test_clear_resets_to_genesis() {
        let writer = InMemoryAuditWriter::new();
        writer.write(&decision("tool:a", PolicyOutcome::Allow)).unwrap();
        writer.clear().unwrap();

        assert!(writer.entries().unwrap().is_empty());
        assert_eq!(writer.head_hash().unwrap(), AuditEvent::GENESIS_HASH);

        writer.write(&decision("tool:b", PolicyOutcome::Allow)).unwrap();
        let events = writer.events().unwrap();
        assert_eq!(events[0].sequence, 0);
        assert!(writer.verify_integrity());
    }

    #[test]
    fn test_verify_empty() {
        assert!(InMemoryAuditWriter::new().verify_integrity());
        assert!(super::verify_chain(&[]));
    }

    /// Concurrent writers never lose an entry or fork the chain.
    #[test]
    fn test_concurrent_writes_are_serialized() {
        let writer = std::sync::Arc::new(InMemoryAuditWriter::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let writer = writer.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        writer
                            .write(&decision(&format!("tool:{t}-{i}"), PolicyOutcome::Allow))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(writer.entries().unwrap().len(), 200);
        assert!(writer.verify_integrity());
    }
}
