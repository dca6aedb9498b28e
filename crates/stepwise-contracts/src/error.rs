//! Runtime error types for the stepwise execution core.
//!
//! Expected failures (policy denials, validation, rate limiting, timeouts,
//! verification rejections) are carried as values inside `ToolResult`,
//! `Execution` and persisted Task state. `StepwiseError` is reserved for hard
//! faults that terminate the calling operation.

use thiserror::Error;

/// The unified error type for the stepwise crates.
#[derive(Debug, Error)]
pub enum StepwiseError {
    /// No Goal row exists for the given id.
    #[error("goal '{goal_id}' not found")]
    GoalNotFound { goal_id: String },

    /// No Task row exists for the given id.
    #[error("task '{task_id}' not found")]
    TaskNotFound { task_id: String },

    /// The Goal/Task/Event store could not complete an operation.
    #[error("store error: {reason}")]
    Store { reason: String },

    /// The policy audit log could not persist a decision.
    #[error("audit write failed: {reason}")]
    Audit { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// A tool body reported a failure.
    #[error("tool '{tool}' failed: {reason}")]
    ToolExecution { tool: String, reason: String },

    /// A Task's metadata does not describe a runnable action.
    #[error("task '{task_id}' has no runnable action: {reason}")]
    InvalidTaskAction { task_id: String, reason: String },

    /// A value could not be serialized or deserialized.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

impl From<serde_json::Error> for StepwiseError {
    fn from(err: serde_json::Error) -> Self {
        StepwiseError::Serialization {
            reason: err.to_string(),
        }
    }
}

/// Convenience alias used throughout the stepwise crates.
pub type StepwiseResult<T> = Result<T, StepwiseError>;
