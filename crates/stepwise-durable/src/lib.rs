//! # stepwise-durable
//!
//! Crash-resumable Goals made of ordered, retryable Tasks.
//!
//! [`DurableTaskExecutor`] runs each Task's action through a
//! [`ToolInvoker`](stepwise_core::traits::ToolInvoker), confirms the result with
//! a [`VerifierRegistry`](stepwise_verify::VerifierRegistry), and parks failed
//! Tasks behind an [`ExponentialBackoffStrategy`] deadline. [`InMemoryStore`]
//! is the reference persistence backend.

pub mod backoff;
pub mod executor;
pub mod store;

pub use backoff::{BackoffConfig, ExponentialBackoffStrategy};
pub use executor::{DurableStore, DurableTaskExecutor};
pub use store::InMemoryStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
