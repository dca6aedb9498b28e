//! Scenario 1: Plan execution under policy.
//!
//! One Plan, seven steps:
//!
//! - `greet`   echo, allowed
//! - `purge`   delete_records, blocked by policy → `Policy denied`
//! - `total`   calculator, depends on `greet`
//! - `config`  credentials_dump, depends on `purge` (unmet, still runs); output sanitized
//! - `shell`   policy_check on `tool:shell_exec` → denied
//! - `answer`  respond, ends the Plan
//! - `after`   never attempted

use serde_json::json;

use stepwise_contracts::{
    error::StepwiseResult,
    plan::{Complexity, Execution, Plan, PlanStep},
};
use stepwise_core::traits::PolicyGate;

use crate::runtime::Runtime;

pub const PRINCIPAL: &str = "analyst-7";

pub fn scenario_plan() -> Plan {
    Plan::new(
        vec![
            PlanStep::tool_call("greet", "echo", json!({ "text": "starting the nightly report" })),
            PlanStep::tool_call("purge", "delete_records", json!({ "table": "invoices" })),
            PlanStep::tool_call("total", "calculator", json!({ "a": 1280, "b": 64, "op": "div" }))
                .depends_on("greet"),
            PlanStep::tool_call("config", "credentials_dump", json!({})).depends_on("purge"),
            PlanStep::policy_check("shell", "tool:shell_exec"),
            PlanStep::respond("answer", "Report generated: 20 invoices per batch."),
            PlanStep::tool_call("after", "echo", json!({ "text": "unreachable" })),
        ],
        "generate the nightly billing report",
        Complexity::Complex,
    )
}

/// Run Scenario 1 against `runtime`.
pub async fn run_scenario(runtime: &Runtime) -> StepwiseResult<Execution> {
    println!("=== Scenario 1: Plan Execution ===");
    println!();

    let plan = scenario_plan();
    let execution = runtime.plan_executor().execute(&plan, PRINCIPAL).await?;

    for outcome in &execution.steps {
        let status = if outcome.success { "OK  " } else { "FAIL" };
        let detail = outcome
            .error
            .clone()
            .or_else(|| outcome.response.clone())
            .or_else(|| {
                outcome
                    .tool_result
                    .as_ref()
                    .and_then(|r| r.data.as_ref())
                    .map(|d| d.to_string())
            })
            .unwrap_or_default();
        println!("  [{status}] {:<7} {:<13} {detail}", outcome.step_id, outcome.kind);
        if !outcome.unmet_dependencies.is_empty() {
            println!("         unmet dependencies: {}", outcome.unmet_dependencies.join(", "));
        }
    }

    let skipped = plan.steps().len() - execution.steps.len();
    let decisions = runtime.policy.audit_log()?;
    println!();
    println!("  Steps attempted:        {} of {} ({} after respond skipped)", execution.steps.len(), plan.steps().len(), skipped);
    println!("  Execution success:      {}", execution.success);
    println!(
        "  Audit chain integrity:  {} ({} decision(s))",
        if runtime.audit.verify_integrity() { "VERIFIED" } else { "FAILED" },
        decisions.len()
    );
    println!("  Credits left:           {}", runtime.sandbox.credits().balance(PRINCIPAL));
    println!();

    Ok(execution)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use stepwise_contracts::{
        plan::{Complexity, Plan, PlanStep},
        policy::PolicyOutcome,
    };
    use stepwise_core::traits::PolicyGate;

    use super::*;

    #[tokio::test]
    async fn denied_step_does_not_stop_later_steps() {
        let runtime = Runtime::reference().unwrap();
        let execution = run_scenario(&runtime).await.unwrap();

        assert!(!execution.success);
        assert_eq!(execution.steps.len(), 6);
        assert!(execution.step("after").is_none());

        let purge = execution.step("purge").unwrap();
        assert_eq!(purge.error.as_deref(), Some("Policy denied"));
        assert!(purge.tool_result.is_none());

        let total = execution.step("total").unwrap();
        assert!(total.success);
        assert_eq!(total.tool_result.as_ref().unwrap().data, Some(json!({ "result": 20.0 })));

        let config = execution.step("config").unwrap();
        assert!(config.success);
        assert_eq!(config.unmet_dependencies, vec!["purge".to_string()]);
        let data = config.tool_result.as_ref().unwrap().data.as_ref().unwrap();
        assert_eq!(data["password"], json!("REDACTED"));
        assert_eq!(data["connection"]["api_key"], json!("REDACTED"));
        assert_eq!(
            data["connection"]["dsn"],
            json!("postgres://billing@db.internal/billing?password=[REDACTED]")
        );
        assert_eq!(data["replicas"][1]["auth_token"], json!("REDACTED"));

        assert!(!execution.step("shell").unwrap().success);
        assert_eq!(execution.response(), Some("Report generated: 20 invoices per batch."));
    }

    /// One decision per tool_call and policy_check step, allow and deny alike.
    #[tokio::test]
    async fn every_gate_decision_is_audited() {
        let runtime = Runtime::reference().unwrap();
        run_scenario(&runtime).await.unwrap();

        let log = runtime.policy.audit_log().unwrap();
        let outcomes: Vec<(String, PolicyOutcome)> =
            log.iter().map(|d| (d.action.clone(), d.outcome)).collect();
        assert_eq!(
            outcomes,
            vec![
                ("tool:echo".to_string(), PolicyOutcome::Allow),
                ("tool:delete_records".to_string(), PolicyOutcome::Deny),
                ("tool:calculator".to_string(), PolicyOutcome::Allow),
                ("tool:credentials_dump".to_string(), PolicyOutcome::Allow),
                ("tool:shell_exec".to_string(), PolicyOutcome::Deny),
            ]
        );
        assert!(runtime.audit.verify_integrity());
    }

    #[tokio::test]
    async fn blocked_tool_then_respond() {
        let runtime = Runtime::reference().unwrap();
        let plan = Plan::new(
            vec![
                PlanStep::tool_call("s1", "shell_exec", json!({ "cmd": "ls" })),
                PlanStep::respond("s2", "done"),
            ],
            "blocked then respond",
            Complexity::Simple,
        );

        let execution = runtime.plan_executor().execute(&plan, PRINCIPAL).await.unwrap();
        assert!(!execution.success);
        assert_eq!(execution.steps[0].error.as_deref(), Some("Policy denied"));
        assert!(execution.steps[1].success);
        assert_eq!(execution.steps[1].response.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn anonymous_principal_cannot_call_tools() {
        let runtime = Runtime::reference().unwrap();
        let plan = Plan::new(
            vec![PlanStep::tool_call("s1", "echo", json!({ "text": "hi" }))],
            "anonymous",
            Complexity::Simple,
        );
        let execution = runtime.plan_executor().execute(&plan, "").await.unwrap();
        assert_eq!(execution.steps[0].error.as_deref(), Some("Policy denied"));
    }

    /// The sandbox charges every attempt that reaches a tool body.
    #[tokio::test]
    async fn credits_charged_per_executed_tool() {
        let runtime = Runtime::reference().unwrap();
        run_scenario(&runtime).await.unwrap();
        // echo, calculator and credentials_dump ran at 1 credit each.
        assert_eq!(runtime.sandbox.credits().balance(PRINCIPAL), 97);
    }
}
