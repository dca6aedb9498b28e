//! # stepwise-core
//!
//! The policy-bound plan execution runtime for stepwise.
//!
//! This crate provides:
//! - The trust-boundary traits (`PolicyGate`, `AuditWriter`, `Tool`,
//!   `ToolCatalog`, `ToolInvoker`) and the durable store traits
//! - `PlanExecutor`, which runs a Plan's steps in order behind the gate
//! - `BacktrackingExecutor`, which adds one bounded fallback attempt
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stepwise_core::{BacktrackingExecutor, PlanExecutor};
//!
//! let executor = BacktrackingExecutor::new(PlanExecutor::new(gate, sandbox));
//! let execution = executor.execute(&plan, "user-42").await?;
//! ```

pub mod backtrack;
pub mod executor;
pub mod traits;

pub use backtrack::BacktrackingExecutor;
pub use executor::PlanExecutor;
