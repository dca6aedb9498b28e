//! Audit event type.
//!
//! `AuditEvent` wraps one `PolicyDecision` with its position in the chain and
//! the SHA-256 hashes that make tampering detectable.

use serde::{Deserialize, Serialize};

use stepwise_contracts::policy::PolicyDecision;

/// A single entry in the decision hash chain.
///
/// Modifying any field, including those of the embedded decision, invalidates
/// `this_hash` and every later `prev_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    pub decision: PolicyDecision,

    /// Hash of the previous event, or `GENESIS_HASH` for the first event.
    pub prev_hash: String,

    /// Hash over (sequence, prev_hash, canonical JSON of decision).
    pub this_hash: String,
}

impl AuditEvent {
    /// The `prev_hash` of the first event in every chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}
