//! Plan and Execution types.
//!
//! A `Plan` is an ordered, immutable list of steps produced by an external
//! planner. Running it yields an `Execution`: one `StepOutcome` per attempted
//! step plus an overall success flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tool::ToolResult;

/// Unique identifier for one Plan execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub uuid::Uuid);

impl ExecutionId {
    /// Create a new, unique execution ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Complexity tier declared by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    #[default]
    Simple,
    Moderate,
    Complex,
}

/// What a step does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    /// Invoke a tool through the sandbox.
    ToolCall {
        tool: String,
        #[serde(default)]
        parameters: Value,
    },

    /// Authorize `resource` without any side effect.
    PolicyCheck { resource: String },

    /// Produce the final response. No later step runs.
    Respond {
        content: String,
        /// Set on the synthetic step a backtracking fallback plan carries.
        #[serde(default)]
        fallback: bool,
    },
}

impl StepKind {
    /// Short tag used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::ToolCall { .. } => "tool_call",
            StepKind::PolicyCheck { .. } => "policy_check",
            StepKind::Respond { .. } => "respond",
        }
    }
}

/// One step of a Plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Identifier unique within the Plan.
    pub id: String,
    #[serde(flatten)]
    pub kind: StepKind,
    /// Ids of earlier steps this one builds on. Advisory only; never gates execution.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl PlanStep {
    pub fn tool_call(id: impl Into<String>, tool: impl Into<String>, parameters: Value) -> Self {
        Self {
            id: id.into(),
            kind: StepKind::ToolCall {
                tool: tool.into(),
                parameters,
            },
            dependencies: Vec::new(),
        }
    }

    pub fn policy_check(id: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: StepKind::PolicyCheck {
                resource: resource.into(),
            },
            dependencies: Vec::new(),
        }
    }

    pub fn respond(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: StepKind::Respond {
                content: content.into(),
                fallback: false,
            },
            dependencies: Vec::new(),
        }
    }

    pub fn depends_on(mut self, step_id: impl Into<String>) -> Self {
        self.dependencies.push(step_id.into());
        self
    }
}

/// An ordered, immutable list of steps plus the planner's reasoning.
///
/// Fields are private so a Plan cannot change once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    steps: Vec<PlanStep>,
    reasoning: String,
    complexity: Complexity,
}

impl Plan {
    pub fn new(steps: Vec<PlanStep>, reasoning: impl Into<String>, complexity: Complexity) -> Self {
        Self {
            steps,
            reasoning: reasoning.into(),
            complexity,
        }
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn complexity(&self) -> Complexity {
        self.complexity
    }
}

/// The outcome of one attempted step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step_id: String,
    /// `tool_call`, `policy_check` or `respond`.
    pub kind: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The sanitized sandbox result, for tool steps that reached the sandbox.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResult>,
    /// The response text, for `respond` steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Declared dependencies that failed or never ran before this step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmet_dependencies: Vec<String>,
}

/// What a backtracking run tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionDelta {
    /// Number of plan executions performed (1 or 2).
    pub attempts: u32,
    /// True when the primary failed and the fallback succeeded.
    pub recovered: bool,
    /// Errors the primary attempt produced.
    pub original_errors: Vec<String>,
    /// True when a fallback plan was built and run.
    pub fallback_plan_applied: bool,
}

/// The result of running a Plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub execution_id: ExecutionId,
    /// Outcomes of every attempted step, in plan order.
    pub steps: Vec<StepOutcome>,
    /// True iff every attempted step succeeded.
    pub success: bool,
    /// Errors of every failed step, in plan order.
    pub errors: Vec<String>,
    /// Present when the execution came out of a backtracking run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection_delta: Option<ReflectionDelta>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl Execution {
    /// The final response text, if a `respond` step ran.
    pub fn response(&self) -> Option<&str> {
        self.steps.iter().rev().find_map(|s| s.response.as_deref())
    }

    /// Outcome of the step with the given id.
    pub fn step(&self, step_id: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }
}
