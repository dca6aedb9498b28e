//! Scenario 3: Durable goal with retry and resume.
//!
//! A four-Task Goal whose third Task calls `flaky_tool`, which fails twice
//! before succeeding. The first run halts at that Task and parks it behind a
//! backoff deadline. Each sweep then builds a fresh executor over the same
//! store, standing in for a restarted process, and retries whatever is ready
//! until the Goal settles.

use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::debug;

use stepwise_contracts::{
    error::StepwiseResult,
    goal::{Goal, GoalStatus, Task, TaskAction, TaskState},
};
use stepwise_core::traits::{GoalStore, TaskEventStore, TaskStore};

use crate::runtime::Runtime;

pub const PRINCIPAL: &str = "ops-agent";

/// Upper bound on retry sweeps before the scenario gives up.
pub const MAX_SWEEPS: u32 = 10;

/// What the scenario left behind.
#[derive(Debug, Clone)]
pub struct DurableReport {
    pub goal: Goal,
    pub tasks: Vec<Task>,
    pub sweeps: u32,
}

fn actions() -> Vec<(&'static str, TaskAction)> {
    vec![
        (
            "announce",
            TaskAction::new("echo", json!({ "text": "research run started" }))
                .expecting(json!({ "text": "research run started" })),
        ),
        (
            "search",
            TaskAction::new("web_search", json!({ "query": "backoff" }))
                .expecting(json!({ "type": "object", "required": ["results", "total"] })),
        ),
        (
            "sync upstream",
            TaskAction::new("flaky_tool", json!({}))
                .expecting(json!({ "type": "object", "required": ["attempt", "status"] })),
        ),
        (
            "score",
            TaskAction::new("calculator", json!({ "a": 3, "b": 4, "op": "add" })).expecting(json!({
                "type": "object",
                "required": ["result"],
                "properties": { "result": { "type": "number" } }
            })),
        ),
    ]
}

/// Persist the scenario Goal and its Tasks.
pub async fn create_goal(runtime: &Runtime) -> StepwiseResult<Goal> {
    let goal = Goal::new(PRINCIPAL, "weekly research digest")
        .with_description("search, sync and score the weekly digest")
        .with_priority(5);
    runtime.store.create_goal(&goal).await?;

    for (index, (title, action)) in actions().into_iter().enumerate() {
        let task = Task::new(goal.id, index as u32, title, action.to_metadata()?);
        runtime.store.create_task(&task).await?;
    }
    Ok(goal)
}

/// Run Scenario 3 against `runtime`.
pub async fn run_scenario(runtime: &Runtime) -> StepwiseResult<DurableReport> {
    println!("=== Scenario 3: Durable Goal ===");
    println!();

    let goal = create_goal(runtime).await?;
    let first = runtime.durable_executor().execute_goal(goal.id).await?;
    println!("  Initial run:            goal {:?}", first.status);

    let mut status = first.status;
    let mut sweeps = 0;
    while status == GoalStatus::InProgress && sweeps < MAX_SWEEPS {
        let tasks = runtime.store.list_tasks(goal.id).await?;
        if let Some(until) = tasks.iter().filter_map(|t| t.backoff_until).min() {
            let wait = (until - Utc::now()).to_std().unwrap_or_default();
            debug!(wait_ms = wait.as_millis() as u64, "waiting out backoff");
            tokio::time::sleep(wait + Duration::from_millis(5)).await;
        }

        sweeps += 1;
        let touched = runtime.durable_executor().retry_ready_tasks().await?;
        status = runtime
            .store
            .get_goal(goal.id)
            .await?
            .map_or(GoalStatus::Failed, |g| g.status);
        println!("  Sweep {sweeps}:                {} goal(s) resumed, goal {:?}", touched.len(), status);
    }

    let goal = runtime
        .store
        .get_goal(goal.id)
        .await?
        .unwrap_or(first);
    let tasks = runtime.store.list_tasks(goal.id).await?;

    println!();
    for task in &tasks {
        let events = runtime.store.list_events(task.id).await?;
        println!(
            "  [{}] {:<14} state={:<9} retries={} events={}",
            task.step_index,
            task.title,
            format!("{:?}", task.state),
            task.retries,
            events.len()
        );
    }
    println!();
    println!("  Goal status:            {:?}", goal.status);
    println!(
        "  Tasks completed:        {} of {}",
        tasks.iter().filter(|t| t.state == TaskState::Completed).count(),
        tasks.len()
    );
    println!();

    Ok(DurableReport { goal, tasks, sweeps })
}
