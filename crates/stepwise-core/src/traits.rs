//! Core trait definitions for the stepwise execution core.
//!
//! These traits define the trust boundary between the executors and their
//! collaborators:
//!
//! - `PolicyGate`  : trusted gate (consulted before any tool runs)
//! - `AuditWriter` : trusted sink for policy decisions (append-only)
//! - `Tool`        : untrusted body behind a declared `ToolSpec`
//! - `ToolCatalog` : lookup of tools by name
//! - `ToolInvoker` : the sandboxed path every tool call goes through
//! - `GoalStore`, `TaskStore`, `TaskEventStore`: durable persistence
//!
//! The executors depend only on these traits, so every collaborator can be
//! swapped for a mock in tests or for a different backend in production.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use stepwise_contracts::{
    error::StepwiseResult,
    goal::{Goal, GoalId, Task, TaskEvent, TaskId},
    policy::{PolicyDecision, PolicyOutcome, PolicyVerdict},
    tool::{ToolContext, ToolResult, ToolSpec},
};

/// The policy gate: authorizes a principal to perform a named action.
///
/// Evaluation must be fast and free of I/O. `evaluate` never writes to the
/// audit log; callers record decisions explicitly via `record_decision`.
pub trait PolicyGate: Send + Sync {
    /// Decide whether `principal_id` may perform `action`.
    fn evaluate(&self, action: &str, principal_id: &str) -> PolicyVerdict;

    /// Boolean projection of `evaluate`.
    fn authorize(&self, action: &str, principal_id: &str) -> bool {
        self.evaluate(action, principal_id).is_allow()
    }

    /// Append one decision to the audit trail.
    fn record_decision(
        &self,
        action: &str,
        principal_id: &str,
        outcome: PolicyOutcome,
        reason: &str,
    ) -> StepwiseResult<()>;

    /// All recorded decisions in insertion order.
    fn audit_log(&self) -> StepwiseResult<Vec<PolicyDecision>>;
}

/// The audit writer: the append-only record of policy decisions.
pub trait AuditWriter: Send + Sync {
    /// Append one decision. Entries are never modified once written.
    fn write(&self, decision: &PolicyDecision) -> StepwiseResult<()>;

    /// All decisions in insertion order.
    fn entries(&self) -> StepwiseResult<Vec<PolicyDecision>>;

    /// Drop every entry. Intended for test resets only.
    fn clear(&self) -> StepwiseResult<()>;
}

/// Lets a gate own a handle to a writer the caller also keeps for inspection.
impl<W: AuditWriter + ?Sized> AuditWriter for Arc<W> {
    fn write(&self, decision: &PolicyDecision) -> StepwiseResult<()> {
        (**self).write(decision)
    }

    fn entries(&self) -> StepwiseResult<Vec<PolicyDecision>> {
        (**self).entries()
    }

    fn clear(&self) -> StepwiseResult<()> {
        (**self).clear()
    }
}

/// A tool body behind a declared contract.
///
/// Implementations are **untrusted**: the sandbox validates their input,
/// bounds their run time and sanitizes their output. Bodies should reach an
/// `.await` regularly so that a timed-out invocation is actually dropped.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The declared contract the sandbox enforces.
    fn spec(&self) -> &ToolSpec;

    /// Run the tool. `parameters` has already passed schema validation.
    async fn execute(&self, parameters: Value, context: &ToolContext) -> StepwiseResult<Value>;
}

/// Lookup of tools by catalog name.
pub trait ToolCatalog: Send + Sync {
    fn get(&self, name: &str) -> Option<Arc<dyn Tool>>;

    /// Whether `name` may run right now. Defaults to the declared spec flag.
    fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(|tool| tool.spec().enabled)
    }
}

/// The sandboxed invocation path.
///
/// Every expected failure is returned inside the `ToolResult`; this method
/// has no error channel.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, tool_name: &str, parameters: Value, context: &ToolContext) -> ToolResult;
}

/// Persistence for Goals.
#[async_trait]
pub trait GoalStore: Send + Sync {
    async fn create_goal(&self, goal: &Goal) -> StepwiseResult<()>;

    async fn get_goal(&self, goal_id: GoalId) -> StepwiseResult<Option<Goal>>;

    async fn list_goals(&self) -> StepwiseResult<Vec<Goal>>;

    /// Replace the stored Goal row. Errors with `GoalNotFound` if absent.
    async fn update_goal(&self, goal: &Goal) -> StepwiseResult<()>;

    /// Delete a Goal and every Task belonging to it. Returns false if absent.
    async fn delete_goal(&self, goal_id: GoalId) -> StepwiseResult<bool>;
}

/// Persistence for Tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, task: &Task) -> StepwiseResult<()>;

    async fn get_task(&self, task_id: TaskId) -> StepwiseResult<Option<Task>>;

    /// Tasks of one Goal, ordered by `step_index`.
    async fn list_tasks(&self, goal_id: GoalId) -> StepwiseResult<Vec<Task>>;

    /// Tasks across every Goal.
    async fn list_all_tasks(&self) -> StepwiseResult<Vec<Task>>;

    /// Replace the stored Task row. Errors with `TaskNotFound` if absent.
    async fn update_task(&self, task: &Task) -> StepwiseResult<()>;
}

/// Append-only persistence for Task events.
#[async_trait]
pub trait TaskEventStore: Send + Sync {
    async fn append_event(&self, event: &TaskEvent) -> StepwiseResult<()>;

    /// Events of one Task in append order.
    async fn list_events(&self, task_id: TaskId) -> StepwiseResult<Vec<TaskEvent>>;
}
