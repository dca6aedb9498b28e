//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Hash input layout (bytes, in order):
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   3. canonical JSON of the decision (serde_json, no pretty-printing)

use sha2::{Digest, Sha256};

use stepwise_contracts::{
    error::{StepwiseError, StepwiseResult},
    policy::PolicyDecision,
};

use crate::event::AuditEvent;

/// Compute the SHA-256 hash for one audit event.
///
/// Returns a lowercase 64-character hex string, or `StepwiseError::Audit`
/// if the decision cannot be serialized.
pub fn hash_event(sequence: u64, decision: &PolicyDecision, prev_hash: &str) -> StepwiseResult<String> {
    let decision_json = serde_json::to_vec(decision).map_err(|e| StepwiseError::Audit {
        reason: format!("decision is not serializable: {e}"),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&decision_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the integrity of a hash chain.
///
/// Valid when every event's `prev_hash` equals the previous event's
/// `this_hash` (or `GENESIS_HASH` for the first), its sequence equals its
/// position, and its `this_hash` matches the recomputed value. An empty
/// chain is valid.
pub fn verify_chain(events: &[AuditEvent]) -> bool {
    let mut expected_prev = AuditEvent::GENESIS_HASH.to_string();

    for (position, event) in events.iter().enumerate() {
        if event.sequence != position as u64 || event.prev_hash != expected_prev {
            return false;
        }

        match hash_event(event.sequence, &event.decision, &event.prev_hash) {
            Ok(recomputed) if recomputed == event.this_hash => {}
            _ => return false,
        }

        expected_prev = event.this_hash.clone();
    }

    true
}
