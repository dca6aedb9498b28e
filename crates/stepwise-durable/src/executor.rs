//! The durable Task/Goal executor.
//!
//! Per Task:
//!
//! ```text
//!   pending ──start──▶ running ──ok + verified──▶ completed
//!                         │
//!                         ├──fail, retries < max──▶ failed (backoff_until set)
//!                         │                             │ deadline passes
//!                         │                             ▼
//!                         │                          running (retry)
//!                         └──fail, retries >= max──▶ failed (terminal)
//! ```
//!
//! All state lives in the stores. Every call re-reads Goal and Task rows and
//! nothing is cached between calls, so a Goal resumes after a restart by
//! calling `resume_goal` again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use stepwise_contracts::{
    error::{StepwiseError, StepwiseResult},
    goal::{
        Goal, GoalId, GoalStatus, Task, TaskAction, TaskEvent, TaskEventType, TaskId, TaskState,
        VerificationStatus,
    },
    tool::ToolContext,
};
use stepwise_core::traits::{GoalStore, TaskEventStore, TaskStore, ToolInvoker};
use stepwise_verify::VerifierRegistry;

use crate::backoff::ExponentialBackoffStrategy;

/// Everything the durable executor persists to.
pub trait DurableStore: GoalStore + TaskStore + TaskEventStore {}

impl<T: GoalStore + TaskStore + TaskEventStore> DurableStore for T {}

/// How one attempt at a Task's action ended.
enum Attempt {
    Verified { data: Value, elapsed_ms: u64, cost: u64 },
    ActionFailed { error: String },
    Rejected { errors: Vec<String> },
}

/// Runs Goals Task by Task, persisting every transition.
pub struct DurableTaskExecutor {
    store: Arc<dyn DurableStore>,
    tools: Arc<dyn ToolInvoker>,
    verifiers: Arc<VerifierRegistry>,
    backoff: ExponentialBackoffStrategy,
}

impl DurableTaskExecutor {
    pub fn new(
        store: Arc<dyn DurableStore>,
        tools: Arc<dyn ToolInvoker>,
        verifiers: Arc<VerifierRegistry>,
        backoff: ExponentialBackoffStrategy,
    ) -> Self {
        Self {
            store,
            tools,
            verifiers,
            backoff,
        }
    }

    pub fn backoff(&self) -> &ExponentialBackoffStrategy {
        &self.backoff
    }

    async fn load_goal(&self, goal_id: GoalId) -> StepwiseResult<Goal> {
        self.store
            .get_goal(goal_id)
            .await?
            .ok_or_else(|| StepwiseError::GoalNotFound {
                goal_id: goal_id.to_string(),
            })
    }

    async fn load_task(&self, task_id: TaskId) -> StepwiseResult<Task> {
        self.store
            .get_task(task_id)
            .await?
            .ok_or_else(|| StepwiseError::TaskNotFound {
                task_id: task_id.to_string(),
            })
    }

    async fn emit(&self, task_id: TaskId, event_type: TaskEventType, payload: Value) -> StepwiseResult<()> {
        self.store
            .append_event(&TaskEvent::new(task_id, event_type, payload))
            .await
    }

    /// Attempt one Task and return its persisted state afterwards.
    ///
    /// A `completed` Task, a `running` Task, a Task whose retries are
    /// exhausted, and a `failed` Task still inside its backoff window are not
    /// attempted. A `running` Task belongs to another attempt and is only
    /// recovered by `resume_goal`. A Task that reaches its retry ceiling
    /// without having failed (a zero budget) is failed without an attempt.
    ///
    /// # Errors
    ///
    /// Only store faults and missing Task or Goal rows. Tool, action and
    /// verification failures are recorded on the Task.
    pub async fn execute_task(&self, task_id: TaskId) -> StepwiseResult<Task> {
        let mut task = self.load_task(task_id).await?;
        let now = Utc::now();

        match task.state {
            TaskState::Completed => {
                debug!(task_id = %task.id, "task already completed");
                return Ok(task);
            }
            TaskState::Running => {
                warn!(task_id = %task.id, "task already running, not starting another attempt");
                return Ok(task);
            }
            TaskState::Failed if task.retries_exhausted() => {
                debug!(task_id = %task.id, retries = task.retries, "task permanently failed");
                return Ok(task);
            }
            TaskState::Pending if task.retries_exhausted() => {
                task.state = TaskState::Failed;
                self.store.update_task(&task).await?;
                self.emit(
                    task.id,
                    TaskEventType::TaskFailed,
                    json!({ "error": "retry budget is zero", "retries": task.retries }),
                )
                .await?;
                warn!(task_id = %task.id, max_retries = task.max_retries, "task has no attempts left");
                return Ok(task);
            }
            TaskState::Failed if task.in_backoff(now) => {
                debug!(task_id = %task.id, backoff_until = ?task.backoff_until, "task still in backoff");
                self.emit(
                    task.id,
                    TaskEventType::TaskSkippedBackoff,
                    json!({ "backoff_until": task.backoff_until }),
                )
                .await?;
                return Ok(task);
            }
            _ => {}
        }

        let goal = self.load_goal(task.goal_id).await?;

        task.state = TaskState::Running;
        self.store.update_task(&task).await?;
        self.emit(
            task.id,
            TaskEventType::TaskStarted,
            json!({ "attempt": task.retries + 1, "step_index": task.step_index }),
        )
        .await?;
        debug!(task_id = %task.id, goal_id = %goal.id, attempt = task.retries + 1, "task started");

        match self.attempt(&task, &goal).await {
            Attempt::Verified { data, elapsed_ms, cost } => {
                task.state = TaskState::Completed;
                task.verification_status = VerificationStatus::Verified;
                task.backoff_until = None;
                self.store.update_task(&task).await?;
                self.emit(
                    task.id,
                    TaskEventType::TaskCompleted,
                    json!({ "result": data, "elapsed_ms": elapsed_ms, "cost": cost }),
                )
                .await?;
                info!(task_id = %task.id, goal_id = %goal.id, "task completed");
            }
            Attempt::ActionFailed { error } => {
                task.verification_status = VerificationStatus::Skipped;
                self.record_failure(&mut task, error).await?;
            }
            Attempt::Rejected { errors } => {
                task.verification_status = VerificationStatus::Failed;
                self.emit(
                    task.id,
                    TaskEventType::TaskVerificationFailed,
                    json!({ "errors": errors }),
                )
                .await?;
                self.record_failure(&mut task, errors.join("; ")).await?;
            }
        }

        Ok(task)
    }

    /// Perform the Task's declared action and verify its result.
    async fn attempt(&self, task: &Task, goal: &Goal) -> Attempt {
        let action = match TaskAction::from_task(task) {
            Ok(action) => action,
            Err(e) => return Attempt::ActionFailed { error: e.to_string() },
        };

        let context = ToolContext::new(goal.principal_id.clone()).with_correlation_id(task.id.to_string());
        let result = self
            .tools
            .invoke(&action.tool, action.parameters.clone(), &context)
            .await;

        if !result.success {
            return Attempt::ActionFailed {
                error: result
                    .error
                    .unwrap_or_else(|| format!("tool {} failed", action.tool)),
            };
        }

        let data = result.data.unwrap_or(Value::Null);
        let report = self
            .verifiers
            .verify(action.verifier_name(), &data, &action.expected);
        if report.passed {
            Attempt::Verified {
                data,
                elapsed_ms: result.elapsed_ms,
                cost: result.cost,
            }
        } else {
            Attempt::Rejected { errors: report.errors }
        }
    }

    /// Count a failed attempt and either park the Task behind a backoff
    /// deadline or fail it for good. The deadline runs from the moment of
    /// failure, not from the start of the attempt.
    async fn record_failure(&self, task: &mut Task, error: String) -> StepwiseResult<()> {
        let next_retry = self.backoff.calculate_next_retry_time(task.retries);
        task.retries += 1;
        task.state = TaskState::Failed;

        if task.retries_exhausted() {
            self.store.update_task(task).await?;
            self.emit(
                task.id,
                TaskEventType::TaskFailed,
                json!({ "error": error, "retries": task.retries }),
            )
            .await?;
            warn!(task_id = %task.id, retries = task.retries, error = %error, "task failed permanently");
        } else {
            task.backoff_until = Some(next_retry);
            self.store.update_task(task).await?;
            self.emit(
                task.id,
                TaskEventType::TaskRetryScheduled,
                json!({ "error": error, "retries": task.retries, "backoff_until": next_retry }),
            )
            .await?;
            warn!(
                task_id = %task.id,
                retries = task.retries,
                backoff_until = %next_retry,
                error = %error,
                "task failed, retry scheduled"
            );
        }
        Ok(())
    }

    /// Run the Goal's Tasks in `step_index` order, stopping at the first Task
    /// that does not complete.
    ///
    /// The Goal ends `completed` only when every Task is completed, `failed`
    /// when a Task has exhausted its retries, and `in_progress` while a Task
    /// waits out its backoff.
    pub async fn execute_goal(&self, goal_id: GoalId) -> StepwiseResult<Goal> {
        let mut goal = self.load_goal(goal_id).await?;
        let tasks = self.store.list_tasks(goal_id).await?;

        goal.status = GoalStatus::InProgress;
        self.store.update_goal(&goal).await?;
        debug!(goal_id = %goal.id, tasks = tasks.len(), "goal execution starting");

        let mut status = GoalStatus::Completed;
        for task in &tasks {
            if task.state == TaskState::Completed {
                continue;
            }

            let task = self.execute_task(task.id).await?;
            if task.state != TaskState::Completed {
                status = if task.state == TaskState::Failed && task.retries_exhausted() {
                    GoalStatus::Failed
                } else {
                    GoalStatus::InProgress
                };
                debug!(goal_id = %goal.id, task_id = %task.id, step_index = task.step_index, "goal halted");
                break;
            }
        }

        goal.status = status;
        self.store.update_goal(&goal).await?;
        match status {
            GoalStatus::Completed => info!(goal_id = %goal.id, "goal completed"),
            GoalStatus::Failed => warn!(goal_id = %goal.id, "goal failed"),
            _ => debug!(goal_id = %goal.id, status = ?status, "goal paused"),
        }
        Ok(goal)
    }

    /// Continue a Goal from persisted state.
    ///
    /// Completed Tasks are skipped. A Task left `running` by a process that
    /// died mid-attempt is reset to `pending` first.
    pub async fn resume_goal(&self, goal_id: GoalId) -> StepwiseResult<Goal> {
        for mut task in self.store.list_tasks(goal_id).await? {
            if task.state != TaskState::Running {
                continue;
            }
            task.state = TaskState::Pending;
            self.store.update_task(&task).await?;
            self.emit(
                task.id,
                TaskEventType::TaskInterrupted,
                json!({ "step_index": task.step_index }),
            )
            .await?;
            warn!(task_id = %task.id, goal_id = %goal_id, "interrupted task reset to pending");
        }

        self.execute_goal(goal_id).await
    }

    /// Failed Tasks across every Goal whose backoff has elapsed and whose
    /// retries are not exhausted.
    pub async fn get_failed_tasks_ready_for_retry(&self) -> StepwiseResult<Vec<Task>> {
        self.failed_tasks_ready_at(Utc::now()).await
    }

    pub async fn failed_tasks_ready_at(&self, now: DateTime<Utc>) -> StepwiseResult<Vec<Task>> {
        Ok(self
            .store
            .list_all_tasks()
            .await?
            .into_iter()
            .filter(|t| t.ready_for_retry(now))
            .collect())
    }

    /// One retry sweep: resume every Goal that has a Task ready for retry.
    /// Returns the Goals touched, each once.
    pub async fn retry_ready_tasks(&self) -> StepwiseResult<Vec<GoalId>> {
        let mut goal_ids: Vec<GoalId> = Vec::new();
        for task in self.get_failed_tasks_ready_for_retry().await? {
            if !goal_ids.contains(&task.goal_id) {
                goal_ids.push(task.goal_id);
            }
        }

        for goal_id in &goal_ids {
            self.resume_goal(*goal_id).await?;
        }
        if !goal_ids.is_empty() {
            info!(goals = goal_ids.len(), "retry sweep finished");
        }
        Ok(goal_ids)
    }
}
