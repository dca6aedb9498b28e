//! Single-shot self-correction around the plan executor.
//!
//! When the primary Plan fails, exactly one fallback Plan is built (a single
//! `respond` step flagged as a fallback) and executed. There is no search
//! over alternative plans.

use tracing::{info, warn};

use stepwise_contracts::{
    error::StepwiseResult,
    plan::{Complexity, Execution, Plan, PlanStep, ReflectionDelta, StepKind},
};

use crate::executor::PlanExecutor;

/// Response text used by the fallback plan unless overridden.
pub const DEFAULT_FALLBACK_RESPONSE: &str =
    "I wasn't able to complete every step of that request. Here is what I can tell you so far.";

/// Wraps a `PlanExecutor` with one bounded fallback attempt.
pub struct BacktrackingExecutor {
    inner: PlanExecutor,
    fallback_response: String,
}

impl BacktrackingExecutor {
    pub fn new(inner: PlanExecutor) -> Self {
        Self {
            inner,
            fallback_response: DEFAULT_FALLBACK_RESPONSE.to_string(),
        }
    }

    /// Override the text the fallback `respond` step produces.
    pub fn with_fallback_response(mut self, response: impl Into<String>) -> Self {
        self.fallback_response = response.into();
        self
    }

    /// The wrapped plan executor.
    pub fn inner(&self) -> &PlanExecutor {
        &self.inner
    }

    /// Run `plan`; on failure run the fallback plan once.
    ///
    /// The returned Execution always carries a `reflection_delta`. When the
    /// fallback succeeds it is returned in place of the primary; when both
    /// fail the primary is returned.
    pub async fn execute(&self, plan: &Plan, principal_id: &str) -> StepwiseResult<Execution> {
        let mut primary = self.inner.execute(plan, principal_id).await?;

        if primary.success {
            primary.reflection_delta = Some(ReflectionDelta {
                attempts: 1,
                recovered: false,
                original_errors: Vec::new(),
                fallback_plan_applied: false,
            });
            return Ok(primary);
        }

        warn!(
            execution_id = %primary.execution_id.0,
            errors = %primary.errors.join("; "),
            "primary plan failed; applying fallback plan"
        );

        let fallback_plan = self.fallback_plan(plan);
        let mut fallback = self.inner.execute(&fallback_plan, principal_id).await?;

        let delta = ReflectionDelta {
            attempts: 2,
            recovered: fallback.success,
            original_errors: primary.errors.clone(),
            fallback_plan_applied: true,
        };

        if fallback.success {
            info!(
                execution_id = %fallback.execution_id.0,
                "fallback plan recovered the execution"
            );
            fallback.reflection_delta = Some(delta);
            Ok(fallback)
        } else {
            primary.reflection_delta = Some(delta);
            Ok(primary)
        }
    }

    /// The minimal safe plan: one fallback-tagged `respond` step.
    pub fn fallback_plan(&self, failed: &Plan) -> Plan {
        let step = PlanStep {
            id: "fallback-respond".to_string(),
            kind: StepKind::Respond {
                content: self.fallback_response.clone(),
                fallback: true,
            },
            dependencies: Vec::new(),
        };
        Plan::new(
            vec![step],
            format!("self-correction fallback after failed plan: {}", failed.reasoning()),
            Complexity::Simple,
        )
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
