//! In-memory implementation of `AuditWriter`.
//!
//! `InMemoryAuditWriter` keeps the decision chain in a `Vec` behind a
//! `Mutex`. Every append happens inside one critical section, so concurrent
//! executors sharing a gate never lose or interleave entries.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};

use stepwise_contracts::{
    error::{StepwiseError, StepwiseResult},
    policy::PolicyDecision,
};
use stepwise_core::traits::AuditWriter;

use crate::{
    chain::{hash_event, verify_chain},
    event::AuditEvent,
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct InMemoryState {
    /// All events written so far, in append order.
    pub(crate) events: Vec<AuditEvent>,

    /// The `this_hash` of the last event, or `GENESIS_HASH` when empty.
    pub(crate) last_hash: String,
}

impl InMemoryState {
    fn genesis() -> Self {
        Self {
            events: Vec::new(),
            last_hash: AuditEvent::GENESIS_HASH.to_string(),
        }
    }
}

// ── Public writer ─────────────────────────────────────────────────────────────

/// An in-memory, append-only audit writer backed by a SHA-256 hash chain.
pub struct InMemoryAuditWriter {
    pub(crate) state: Mutex<InMemoryState>,
}

impl InMemoryAuditWriter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InMemoryState::genesis()),
        }
    }

    fn lock(&self) -> StepwiseResult<MutexGuard<'_, InMemoryState>> {
        self.state.lock().map_err(|e| StepwiseError::Audit {
            reason: format!("audit state lock poisoned: {e}"),
        })
    }

    /// A copy of every chained event, sequence 0 first.
    pub fn events(&self) -> StepwiseResult<Vec<AuditEvent>> {
        Ok(self.lock()?.events.clone())
    }

    /// The hash of the newest event, or `GENESIS_HASH` when empty.
    pub fn head_hash(&self) -> StepwiseResult<String> {
        Ok(self.lock()?.last_hash.clone())
    }

    /// Verify that the in-memory chain has not been tampered with.
    pub fn verify_integrity(&self) -> bool {
        match self.lock() {
            Ok(state) => verify_chain(&state.events),
            Err(_) => false,
        }
    }
}

impl Default for InMemoryAuditWriter {
    fn default() -> Self {
        Self::new()
    }
}

// ── AuditWriter impl ──────────────────────────────────────────────────────────

impl AuditWriter for InMemoryAuditWriter {
    fn write(&self, decision: &PolicyDecision) -> StepwiseResult<()> {
        let mut state = self.lock()?;

        let sequence = state.events.len() as u64;
        let prev_hash = state.last_hash.clone();
        let this_hash = hash_event(sequence, decision, &prev_hash)?;

        debug!(
            sequence,
            action = %decision.action,
            principal_id = %decision.principal_id,
            outcome = ?decision.outcome,
            "policy decision appended"
        );

        state.events.push(AuditEvent {
            sequence,
            decision: decision.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.last_hash = this_hash;

        Ok(())
    }

    fn entries(&self) -> StepwiseResult<Vec<PolicyDecision>> {
        Ok(self
            .lock()?
            .events
            .iter()
            .map(|e| e.decision.clone())
            .collect())
    }

    fn clear(&self) -> StepwiseResult<()> {
        let mut state = self.lock()?;
        info!(discarded = state.events.len(), "audit log cleared");
        *state = InMemoryState::genesis();
        Ok(())
    }
}
