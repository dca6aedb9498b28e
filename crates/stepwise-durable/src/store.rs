//! In-memory Goal/Task/Event store for development and testing.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use stepwise_contracts::{
    error::{StepwiseError, StepwiseResult},
    goal::{Goal, GoalId, Task, TaskEvent, TaskId},
};
use stepwise_core::traits::{GoalStore, TaskEventStore, TaskStore};

fn store_error(e: impl std::fmt::Display) -> StepwiseError {
    StepwiseError::Store {
        reason: e.to_string(),
    }
}

/// Goals, Tasks and Task events held in process memory.
///
/// Deleting a Goal removes its Tasks; Task events are append-only and outlive
/// both.
#[derive(Default)]
pub struct InMemoryStore {
    goals: RwLock<HashMap<GoalId, Goal>>,
    tasks: RwLock<HashMap<TaskId, Task>>,
    events: RwLock<Vec<TaskEvent>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event across all Tasks, in append order.
    pub fn all_events(&self) -> StepwiseResult<Vec<TaskEvent>> {
        Ok(self.events.read().map_err(store_error)?.clone())
    }
}

#[async_trait]
impl GoalStore for InMemoryStore {
    async fn create_goal(&self, goal: &Goal) -> StepwiseResult<()> {
        let mut goals = self.goals.write().map_err(store_error)?;
        if goals.contains_key(&goal.id) {
            return Err(StepwiseError::Store {
                reason: format!("goal '{}' already exists", goal.id),
            });
        }
        goals.insert(goal.id, goal.clone());
        Ok(())
    }

    async fn get_goal(&self, goal_id: GoalId) -> StepwiseResult<Option<Goal>> {
        Ok(self.goals.read().map_err(store_error)?.get(&goal_id).cloned())
    }

    /// Goals by descending priority, then creation time.
    async fn list_goals(&self) -> StepwiseResult<Vec<Goal>> {
        let mut goals: Vec<Goal> = self.goals.read().map_err(store_error)?.values().cloned().collect();
        goals.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        Ok(goals)
    }

    async fn update_goal(&self, goal: &Goal) -> StepwiseResult<()> {
        let mut goals = self.goals.write().map_err(store_error)?;
        match goals.get_mut(&goal.id) {
            Some(stored) => {
                *stored = goal.clone();
                stored.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StepwiseError::GoalNotFound {
                goal_id: goal.id.to_string(),
            }),
        }
    }

    async fn delete_goal(&self, goal_id: GoalId) -> StepwiseResult<bool> {
        // Lock order is goals, then tasks.
        let mut goals = self.goals.write().map_err(store_error)?;
        let removed = goals.remove(&goal_id).is_some();
        if removed {
            self.tasks
                .write()
                .map_err(store_error)?
                .retain(|_, task| task.goal_id != goal_id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    /// Rejects a Task whose Goal is unknown or whose `step_index` is taken.
    async fn create_task(&self, task: &Task) -> StepwiseResult<()> {
        // The goals guard is held until the insert so a concurrent delete
        // cannot orphan the Task.
        let goals = self.goals.read().map_err(store_error)?;
        if !goals.contains_key(&task.goal_id) {
            return Err(StepwiseError::GoalNotFound {
                goal_id: task.goal_id.to_string(),
            });
        }

        let mut tasks = self.tasks.write().map_err(store_error)?;
        if tasks.contains_key(&task.id) {
            return Err(StepwiseError::Store {
                reason: format!("task '{}' already exists", task.id),
            });
        }
        if tasks
            .values()
            .any(|t| t.goal_id == task.goal_id && t.step_index == task.step_index)
        {
            return Err(StepwiseError::Store {
                reason: format!(
                    "goal '{}' already has a task at step {}",
                    task.goal_id, task.step_index
                ),
            });
        }
        tasks.insert(task.id, task.clone());
        drop(goals);
        Ok(())
    }

    async fn get_task(&self, task_id: TaskId) -> StepwiseResult<Option<Task>> {
        Ok(self.tasks.read().map_err(store_error)?.get(&task_id).cloned())
    }

    async fn list_tasks(&self, goal_id: GoalId) -> StepwiseResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .map_err(store_error)?
            .values()
            .filter(|t| t.goal_id == goal_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.step_index);
        Ok(tasks)
    }

    async fn list_all_tasks(&self) -> StepwiseResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self.tasks.read().map_err(store_error)?.values().cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.step_index.cmp(&b.step_index)));
        Ok(tasks)
    }

    async fn update_task(&self, task: &Task) -> StepwiseResult<()> {
        let mut tasks = self.tasks.write().map_err(store_error)?;
        match tasks.get_mut(&task.id) {
            Some(stored) => {
                *stored = task.clone();
                stored.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StepwiseError::TaskNotFound {
                task_id: task.id.to_string(),
            }),
        }
    }
}

#[async_trait]
impl TaskEventStore for InMemoryStore {
    async fn append_event(&self, event: &TaskEvent) -> StepwiseResult<()> {
        self.events.write().map_err(store_error)?.push(event.clone());
        Ok(())
    }

    async fn list_events(&self, task_id: TaskId) -> StepwiseResult<Vec<TaskEvent>> {
        Ok(self
            .events
            .read()
            .map_err(store_error)?
            .iter()
            .filter(|e| e.task_id == task_id)
            .cloned()
            .collect())
    }
}
