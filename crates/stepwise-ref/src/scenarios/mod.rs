//! Reference scenarios.
//!
//! Each scenario wires real components through a [`Runtime`](crate::Runtime),
//! prints a short narrative, and returns what it produced so tests can check it.

pub mod backtracking;
pub mod durable_goal;
pub mod plan_execution;
