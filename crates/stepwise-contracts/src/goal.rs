//! Durable Goal, Task and TaskEvent types.
//!
//! These rows are the single source of truth for crash-resumable work. The
//! durable executor re-reads them on every invocation and keeps no in-memory
//! cache across calls.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StepwiseError, StepwiseResult};

/// Unique identifier for a Goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoalId(pub uuid::Uuid);

impl GoalId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for GoalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a Task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub uuid::Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Open,
    InProgress,
    Completed,
    Failed,
}

/// A durable unit of multi-step work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    /// The principal that owns the Goal. Tool calls run on its behalf.
    pub principal_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: i32,
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    /// A new `open` Goal.
    pub fn new(principal_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: GoalId::new(),
            principal_id: principal_id.into(),
            title: title.into(),
            description: String::new(),
            priority: 0,
            status: GoalStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    Verified,
    Failed,
    Skipped,
}

/// One durable, retryable step of a Goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub goal_id: GoalId,
    /// Zero-based position within the Goal. Unique per Goal; defines execution order.
    pub step_index: u32,
    pub title: String,
    pub state: TaskState,
    pub retries: u32,
    pub max_retries: u32,
    /// No retry is attempted before this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_until: Option<DateTime<Utc>>,
    pub verification_status: VerificationStatus,
    /// The action to perform; see `TaskAction`.
    #[serde(default)]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Default retry ceiling for new Tasks.
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// A new `pending` Task.
    pub fn new(goal_id: GoalId, step_index: u32, title: impl Into<String>, metadata: Value) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            goal_id,
            step_index,
            title: title.into(),
            state: TaskState::Pending,
            retries: 0,
            max_retries: Self::DEFAULT_MAX_RETRIES,
            backoff_until: None,
            verification_status: VerificationStatus::Unverified,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// True once the retry ceiling is reached.
    pub fn retries_exhausted(&self) -> bool {
        self.retries >= self.max_retries
    }

    /// True for a `failed` Task whose backoff deadline is still ahead of `now`.
    pub fn in_backoff(&self, now: DateTime<Utc>) -> bool {
        self.state == TaskState::Failed && self.backoff_until.is_some_and(|until| until > now)
    }

    /// True for a `failed` Task that may be retried at `now`.
    pub fn ready_for_retry(&self, now: DateTime<Utc>) -> bool {
        self.state == TaskState::Failed && !self.retries_exhausted() && !self.in_backoff(now)
    }
}

/// The action a Task performs, read from its metadata.
///
/// Metadata layout:
///
/// ```json
/// { "tool": "web_search", "parameters": { "query": "rust" },
///   "expected": { "type": "object" }, "verifier": "web_search" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAction {
    pub tool: String,
    #[serde(default)]
    pub parameters: Value,
    /// Criteria handed to the verifier.
    #[serde(default)]
    pub expected: Value,
    /// Tool name whose verifier should check the result. Defaults to `tool`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier: Option<String>,
}

impl TaskAction {
    pub fn new(tool: impl Into<String>, parameters: Value) -> Self {
        Self {
            tool: tool.into(),
            parameters,
            expected: Value::Null,
            verifier: None,
        }
    }

    pub fn expecting(mut self, expected: Value) -> Self {
        self.expected = expected;
        self
    }

    pub fn verified_as(mut self, verifier: impl Into<String>) -> Self {
        self.verifier = Some(verifier.into());
        self
    }

    /// Parse the action out of a Task's metadata.
    pub fn from_task(task: &Task) -> StepwiseResult<Self> {
        serde_json::from_value(task.metadata.clone()).map_err(|e| StepwiseError::InvalidTaskAction {
            task_id: task.id.to_string(),
            reason: e.to_string(),
        })
    }

    /// Serialize into Task metadata.
    pub fn to_metadata(&self) -> StepwiseResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// The tool name whose verifier checks this action's result.
    pub fn verifier_name(&self) -> &str {
        self.verifier.as_deref().unwrap_or(&self.tool)
    }
}

/// Lifecycle event types written to the Task audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventType {
    TaskStarted,
    TaskCompleted,
    /// Terminal failure: retries exhausted.
    TaskFailed,
    TaskRetryScheduled,
    /// The action succeeded but its result was rejected.
    TaskVerificationFailed,
    TaskSkippedBackoff,
    /// A Task found `running` on resume was reset to `pending`.
    TaskInterrupted,
}

/// An immutable, append-only record of one Task lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub id: uuid::Uuid,
    pub task_id: TaskId,
    pub event_type: TaskEventType,
    #[serde(default)]
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl TaskEvent {
    pub fn new(task_id: TaskId, event_type: TaskEventType, payload: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            task_id,
            event_type,
            payload,
            created_at: Utc::now(),
        }
    }
}
