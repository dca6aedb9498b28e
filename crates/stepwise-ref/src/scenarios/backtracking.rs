//! Scenario 2: Backtracking.
//!
//! Sub-case A: a Plan whose only tool call times out. The primary attempt
//! fails, the fallback `respond` Plan runs, and the fallback is returned.
//!
//! Sub-case B: a healthy Plan. One attempt, no fallback.

use serde_json::json;

use stepwise_contracts::{
    error::StepwiseResult,
    plan::{Complexity, Execution, Plan, PlanStep},
};

use crate::runtime::Runtime;

pub const PRINCIPAL: &str = "support-bot";

pub fn timing_out_plan() -> Plan {
    Plan::new(
        vec![
            PlanStep::tool_call("lookup", "slow_tool", json!({ "delay_ms": 5_000 })),
            PlanStep::respond("answer", "Here is the order status you asked for.").depends_on("lookup"),
        ],
        "look up the order status",
        Complexity::Moderate,
    )
}

pub fn healthy_plan() -> Plan {
    Plan::new(
        vec![
            PlanStep::tool_call("search", "web_search", json!({ "query": "idempotent queues" })),
            PlanStep::respond("answer", "Found an article on idempotent task queues.").depends_on("search"),
        ],
        "answer a research question",
        Complexity::Simple,
    )
}

fn print_execution(label: &str, execution: &Execution) {
    println!("  {label}");
    if let Some(delta) = &execution.reflection_delta {
        println!("    Attempts:               {}", delta.attempts);
        println!("    Fallback plan applied:  {}", delta.fallback_plan_applied);
        println!("    Recovered:              {}", delta.recovered);
        for error in &delta.original_errors {
            println!("    Original error:         {error}");
        }
    }
    println!("    Response:               {}", execution.response().unwrap_or("<none>"));
    println!();
}

/// Run Scenario 2 against `runtime`. Returns (timed-out run, healthy run).
pub async fn run_scenario(runtime: &Runtime) -> StepwiseResult<(Execution, Execution)> {
    println!("=== Scenario 2: Backtracking ===");
    println!();

    let executor = runtime.backtracking_executor();

    let recovered = executor.execute(&timing_out_plan(), PRINCIPAL).await?;
    print_execution("Sub-case A: tool call exceeds its timeout", &recovered);

    let healthy = executor.execute(&healthy_plan(), PRINCIPAL).await?;
    print_execution("Sub-case B: every step succeeds", &healthy);

    Ok((recovered, healthy))
}

#[cfg(test)]
mod tests {
    use stepwise_contracts::tool::ToolStatus;
    use stepwise_core::backtrack::DEFAULT_FALLBACK_RESPONSE;

    use super::*;

    #[tokio::test]
    async fn timeout_triggers_single_fallback() {
        let runtime = Runtime::reference().unwrap();
        let (recovered, healthy) = run_scenario(&runtime).await.unwrap();

        let delta = recovered.reflection_delta.as_ref().unwrap();
        assert_eq!(delta.attempts, 2);
        assert!(delta.fallback_plan_applied);
        assert!(delta.recovered);
        assert!(delta.original_errors[0].starts_with("lookup: "));
        assert!(recovered.success);
        assert_eq!(recovered.response(), Some(DEFAULT_FALLBACK_RESPONSE));

        let delta = healthy.reflection_delta.as_ref().unwrap();
        assert_eq!(delta.attempts, 1);
        assert!(!delta.fallback_plan_applied);
        assert!(healthy.success);
    }

    /// The primary attempt really hit the sandbox timeout.
    #[tokio::test]
    async fn primary_attempt_times_out() {
        let runtime = Runtime::reference().unwrap();
        let primary = runtime
            .plan_executor()
            .execute(&timing_out_plan(), PRINCIPAL)
            .await
            .unwrap();

        let lookup = primary.step("lookup").unwrap();
        assert_eq!(lookup.tool_result.as_ref().unwrap().status, ToolStatus::Timeout);
        assert_eq!(primary.step("answer").unwrap().unmet_dependencies, vec!["lookup".to_string()]);
        assert!(!primary.success);
    }
}
