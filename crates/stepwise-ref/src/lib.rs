//! # stepwise-ref
//!
//! Reference runtime for the stepwise execution core.
//!
//! Demonstrates three scenarios using local, deterministic tools:
//!
//! 1. **Plan execution**: a multi-step Plan where one tool call is denied by
//!    policy, later steps still run, and a leaked credential is sanitized.
//! 2. **Backtracking**: a Plan whose tool call times out is replaced by the
//!    single fallback response.
//! 3. **Durable goal**: a Goal whose flaky Task fails, backs off, and is
//!    picked up by a retry sweep from a fresh executor until the Goal completes.

pub mod runtime;
pub mod scenarios;
pub mod tools;

pub use runtime::Runtime;
