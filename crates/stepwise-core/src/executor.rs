//! The plan executor: runs a Plan's steps in order behind the policy gate.
//!
//! Per step the executor enforces:
//!
//!   Policy → Audit decision → [ToolInvoker::invoke] → Record outcome
//!
//! The security invariant: `ToolInvoker::invoke()` is NEVER called for a
//! `tool_call` step unless `PolicyGate::evaluate()` returned `Allow` for
//! `tool:<name>`. The only call site sits after the verdict check.
//!
//! Execution is exhaustive rather than fail-fast: a failed step is recorded
//! and later steps still run. Declared dependencies are advisory bookkeeping
//! only. A `respond` step ends the Plan.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use stepwise_contracts::{
    error::StepwiseResult,
    plan::{Execution, ExecutionId, Plan, PlanStep, StepKind, StepOutcome},
    policy::{tool_action, PolicyVerdict},
    tool::ToolContext,
};

use crate::traits::{PolicyGate, ToolInvoker};

/// Error message recorded on a tool step the gate refused.
pub const POLICY_DENIED: &str = "Policy denied";

/// Runs Plans synchronously (from the caller's perspective) against a policy
/// gate and a sandboxed tool invoker.
///
/// The executor holds no per-run state, so one instance can serve many
/// concurrent Plans.
pub struct PlanExecutor {
    policy: Arc<dyn PolicyGate>,
    tools: Arc<dyn ToolInvoker>,
}

impl PlanExecutor {
    pub fn new(policy: Arc<dyn PolicyGate>, tools: Arc<dyn ToolInvoker>) -> Self {
        Self { policy, tools }
    }

    /// Execute every step of `plan` on behalf of `principal_id`.
    ///
    /// # Pipeline (per step, in list order)
    ///
    /// 1. Note declared dependencies that failed or never ran (advisory)
    /// 2. `tool_call`: evaluate `tool:<name>`, record the decision, and on
    ///    `Allow` invoke the tool; a `Deny` fails the step with `Policy denied`
    /// 3. `policy_check`: evaluate and record; the verdict is the outcome
    /// 4. `respond`: succeed and stop
    ///
    /// # Errors
    ///
    /// Returns `Err` only if a policy decision cannot be written to the audit
    /// log. Step failures are reported inside the returned `Execution`.
    pub async fn execute(&self, plan: &Plan, principal_id: &str) -> StepwiseResult<Execution> {
        let execution_id = ExecutionId::new();
        let started_at = Utc::now();

        debug!(
            execution_id = %execution_id.0,
            principal_id = %principal_id,
            steps = plan.steps().len(),
            complexity = ?plan.complexity(),
            "plan execution starting"
        );

        let mut outcomes: Vec<StepOutcome> = Vec::with_capacity(plan.steps().len());
        let mut succeeded: HashSet<&str> = HashSet::new();

        for step in plan.steps() {
            let unmet: Vec<String> = step
                .dependencies
                .iter()
                .filter(|dep| !succeeded.contains(dep.as_str()))
                .cloned()
                .collect();
            if !unmet.is_empty() {
                debug!(
                    execution_id = %execution_id.0,
                    step_id = %step.id,
                    unmet = ?unmet,
                    "step has unmet dependencies; running anyway"
                );
            }

            let mut outcome = self.run_step(step, principal_id, &execution_id).await?;
            outcome.unmet_dependencies = unmet;

            if outcome.success {
                succeeded.insert(step.id.as_str());
            }
            let terminal = matches!(step.kind, StepKind::Respond { .. });
            outcomes.push(outcome);

            if terminal {
                break;
            }
        }

        let errors: Vec<String> = outcomes
            .iter()
            .filter(|o| !o.success)
            .map(|o| format!("{}: {}", o.step_id, o.error.as_deref().unwrap_or("step failed")))
            .collect();
        let success = errors.is_empty();

        if success {
            info!(
                execution_id = %execution_id.0,
                steps = outcomes.len(),
                "plan execution succeeded"
            );
        } else {
            warn!(
                execution_id = %execution_id.0,
                failed = errors.len(),
                errors = %errors.join("; "),
                "plan execution finished with failures"
            );
        }

        Ok(Execution {
            execution_id,
            steps: outcomes,
            success,
            errors,
            reflection_delta: None,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn run_step(
        &self,
        step: &PlanStep,
        principal_id: &str,
        execution_id: &ExecutionId,
    ) -> StepwiseResult<StepOutcome> {
        let mut outcome = StepOutcome {
            step_id: step.id.clone(),
            kind: step.kind.label().to_string(),
            success: false,
            error: None,
            tool_result: None,
            response: None,
            unmet_dependencies: Vec::new(),
        };

        match &step.kind {
            // ── Tool call: policy gate, then sandbox ─────────────────────────
            StepKind::ToolCall { tool, parameters } => {
                let action = tool_action(tool);
                let verdict = self.authorize_and_record(&action, principal_id)?;

                if let PolicyVerdict::Deny { reason } = &verdict {
                    warn!(
                        execution_id = %execution_id.0,
                        step_id = %step.id,
                        tool = %tool,
                        reason = %reason,
                        "policy denied tool call"
                    );
                    outcome.error = Some(POLICY_DENIED.to_string());
                    return Ok(outcome);
                }

                // Only reachable after an Allow verdict.
                let context = ToolContext::new(principal_id)
                    .with_correlation_id(execution_id.0.to_string());
                let result = self.tools.invoke(tool, parameters.clone(), &context).await;

                debug!(
                    execution_id = %execution_id.0,
                    step_id = %step.id,
                    tool = %tool,
                    status = ?result.status,
                    "tool step settled"
                );

                outcome.success = result.success;
                outcome.error = result.error.clone();
                outcome.tool_result = Some(result);
            }

            // ── Policy check: no side effect ─────────────────────────────────
            StepKind::PolicyCheck { resource } => {
                let verdict = self.authorize_and_record(resource, principal_id)?;
                outcome.success = verdict.is_allow();
                if let PolicyVerdict::Deny { reason } = verdict {
                    outcome.error = Some(format!("{POLICY_DENIED}: {reason}"));
                }
            }

            // ── Respond: terminal ────────────────────────────────────────────
            StepKind::Respond { content, .. } => {
                outcome.success = true;
                outcome.response = Some(content.clone());
            }
        }

        Ok(outcome)
    }

    /// Evaluate `action` and write the decision to the audit log.
    fn authorize_and_record(&self, action: &str, principal_id: &str) -> StepwiseResult<PolicyVerdict> {
        let verdict = self.policy.evaluate(action, principal_id);
        self.policy
            .record_decision(action, principal_id, verdict.outcome(), &verdict.reason())?;
        Ok(verdict)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
