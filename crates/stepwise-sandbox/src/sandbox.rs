//! The sandboxed invocation pipeline.
//!
//! ```text
//!   lookup → schema → rate limit → credits → execute (timeout) → sanitize
//! ```
//!
//! The pipeline short-circuits at the first failing phase. Phases before
//! execution never charge credits. Once the tool body runs, its cost is
//! deducted whether it succeeds, fails or times out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use stepwise_contracts::tool::{ToolContext, ToolResult, ToolStatus};
use stepwise_core::traits::{ToolCatalog, ToolInvoker};

use crate::config::SandboxConfig;
use crate::credits::CreditLedger;
use crate::rate_limit::RateLimiter;
use crate::sanitize::{sanitize, sanitize_text};

/// Runs catalog tools behind validation, rate limiting, credit accounting,
/// a timeout and output sanitization.
///
/// Rate windows and balances are owned by the sandbox instance; two
/// sandboxes never share them.
pub struct ToolSandbox {
    catalog: Arc<dyn ToolCatalog>,
    limiter: RateLimiter,
    credits: CreditLedger,
    cost_accounting_enabled: bool,
}

impl ToolSandbox {
    pub fn new(catalog: Arc<dyn ToolCatalog>, config: &SandboxConfig) -> Self {
        Self {
            catalog,
            limiter: RateLimiter::new(config.rate_window()),
            credits: CreditLedger::new(config.default_credits),
            cost_accounting_enabled: config.cost_accounting_enabled,
        }
    }

    pub fn with_defaults(catalog: Arc<dyn ToolCatalog>) -> Self {
        Self::new(catalog, &SandboxConfig::default())
    }

    pub fn credits(&self) -> &CreditLedger {
        &self.credits
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn cost_accounting_enabled(&self) -> bool {
        self.cost_accounting_enabled
    }

    /// Run `tool_name` with `parameters` on behalf of `context.principal_id`.
    ///
    /// Never panics and never returns an error: every outcome, including an
    /// unknown tool, is reported through the returned `ToolResult`.
    pub async fn execute(&self, tool_name: &str, parameters: Value, context: &ToolContext) -> ToolResult {
        let started = Instant::now();
        let elapsed = || started.elapsed().as_millis() as u64;
        let principal = context.principal_id.as_str();

        // 1. Existence and enablement.
        let Some(tool) = self.catalog.get(tool_name) else {
            warn!(tool = %tool_name, principal_id = %principal, "unknown tool");
            return ToolResult::failure(format!("Tool not found: {tool_name}"), elapsed(), 0);
        };
        if !self.catalog.is_enabled(tool_name) {
            warn!(tool = %tool_name, principal_id = %principal, "disabled tool");
            return ToolResult::failure(format!("Tool is disabled: {tool_name}"), elapsed(), 0);
        }
        let spec = tool.spec();

        // 2. Input schema.
        let violations = spec.input_schema.violations(&parameters);
        if !violations.is_empty() {
            debug!(tool = %tool_name, violations = violations.len(), "input rejected");
            return ToolResult::failure(
                format!("Invalid input: {}", violations.join("; ")),
                elapsed(),
                0,
            );
        }

        // 3. Rate limit.
        if !self.limiter.check(principal, tool_name, spec.calls_per_minute) {
            warn!(
                tool = %tool_name,
                principal_id = %principal,
                limit = spec.calls_per_minute,
                "rate limit exceeded"
            );
            return ToolResult::rejected(
                ToolStatus::RateLimited,
                format!(
                    "Rate limit exceeded for {tool_name}: {} calls per window",
                    spec.calls_per_minute
                ),
                elapsed(),
                0,
            );
        }

        // 4. Credits.
        let reservation = if self.cost_accounting_enabled {
            let cost = spec.credits_per_execution;
            match self.credits.reserve(principal, cost) {
                Some(r) => Some(r),
                None => {
                    let balance = self.credits.balance(principal);
                    warn!(tool = %tool_name, principal_id = %principal, balance, cost, "insufficient credits");
                    return ToolResult::failure(
                        format!("Insufficient credits: balance {balance}, cost {cost}"),
                        elapsed(),
                        0,
                    );
                }
            }
        } else {
            None
        };

        // 5. Execute under timeout. A timed-out body is dropped at its next await.
        debug!(tool = %tool_name, principal_id = %principal, timeout_ms = spec.timeout_ms, "executing tool");
        let timeout = Duration::from_millis(spec.timeout_ms);
        let settled = tokio::time::timeout(timeout, tool.execute(parameters, context)).await;
        let cost = reservation.map(|r| r.settle()).unwrap_or(0);

        // 6. Sanitize and report.
        let result = match settled {
            Ok(Ok(data)) => ToolResult::success(sanitize(data), elapsed(), cost),
            Ok(Err(e)) => ToolResult::failure(sanitize_text(&e.to_string()), elapsed(), cost),
            Err(_) => ToolResult::rejected(
                ToolStatus::Timeout,
                format!("Tool {tool_name} timed out after {}ms", spec.timeout_ms),
                elapsed(),
                cost,
            ),
        };

        match result.status {
            ToolStatus::Success => debug!(
                tool = %tool_name,
                principal_id = %principal,
                elapsed_ms = result.elapsed_ms,
                cost,
                "tool succeeded"
            ),
            status => warn!(
                tool = %tool_name,
                principal_id = %principal,
                elapsed_ms = result.elapsed_ms,
                cost,
                status = ?status,
                error = result.error.as_deref().unwrap_or_default(),
                "tool did not succeed"
            ),
        }
        result
    }
}

#[async_trait]
impl ToolInvoker for ToolSandbox {
    async fn invoke(&self, tool_name: &str, parameters: Value, context: &ToolContext) -> ToolResult {
        self.execute(tool_name, parameters, context).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use stepwise_contracts::{
        error::{StepwiseError, StepwiseResult},
        tool::{InputSchema, JsonType, ToolContext, ToolSpec, ToolStatus},
    };
    use stepwise_core::traits::Tool;

    use crate::{SandboxConfig, ToolRegistry, ToolSandbox};

    enum Behavior {
        Echo,
        Fail,
        Sleep(u64),
    }

    struct TestTool {
        spec: ToolSpec,
        behavior: Behavior,
    }

    #[async_trait]
    impl Tool for TestTool {
        fn spec(&self) -> &ToolSpec {
            &self.spec
        }

        async fn execute(&self, parameters: Value, _context: &ToolContext) -> StepwiseResult<Value> {
            match self.behavior {
                Behavior::Echo => Ok(parameters),
                Behavior::Fail => Err(StepwiseError::ToolExecution {
                    tool: self.spec.name.clone(),
                    reason: "upstream said password=hunter2".to_string(),
                }),
                Behavior::Sleep(ms) => {
                    tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
                    Ok(json!("woke up"))
                }
            }
        }
    }

    fn sandbox_with(tools: Vec<(ToolSpec, Behavior)>, config: SandboxConfig) -> (Arc<ToolRegistry>, ToolSandbox) {
        let registry = Arc::new(ToolRegistry::new());
        for (spec, behavior) in tools {
            registry.register(Arc::new(TestTool { spec, behavior }));
        }
        let sandbox = ToolSandbox::new(registry.clone(), &config);
        (registry, sandbox)
    }

    fn echo_spec() -> ToolSpec {
        ToolSpec::new("echo")
            .with_schema(InputSchema::new().required("text", JsonType::String))
            .with_cost(3)
    }

    fn ctx() -> ToolContext {
        ToolContext::new("alice")
    }

    #[tokio::test]
    async fn unknown_and_disabled_tools_fail_at_zero_cost() {
        let (registry, sandbox) = sandbox_with(
            vec![
                (echo_spec(), Behavior::Echo),
                (ToolSpec::new("retired").disabled(), Behavior::Echo),
            ],
            SandboxConfig::default(),
        );

        let missing = sandbox.execute("nope", json!({}), &ctx()).await;
        assert_eq!(missing.status, ToolStatus::Failure);
        assert_eq!(missing.error.as_deref(), Some("Tool not found: nope"));
        assert_eq!(missing.cost, 0);

        let retired = sandbox.execute("retired", json!({}), &ctx()).await;
        assert!(retired.error.unwrap().contains("disabled"));

        assert!(registry.set_enabled("echo", false));
        let off = sandbox.execute("echo", json!({ "text": "hi" }), &ctx()).await;
        assert!(!off.success);
        assert_eq!(sandbox.credits().balance("alice"), 100);
    }

    #[tokio::test]
    async fn schema_violations_are_all_listed() {
        let spec = ToolSpec::new("search").with_schema(
            InputSchema::new()
                .required("query", JsonType::String)
                .required("limit", JsonType::Number),
        );
        let (_, sandbox) = sandbox_with(vec![(spec, Behavior::Echo)], SandboxConfig::default());

        let result = sandbox.execute("search", json!({ "limit": "ten" }), &ctx()).await;
        let error = result.error.unwrap();
        assert!(error.starts_with("Invalid input: "), "{error}");
        assert!(error.contains("\"query\" is a required property"), "{error}");
        assert!(error.contains("/limit: "), "{error}");
        assert!(error.contains("; "), "{error}");
        assert_eq!(result.cost, 0);
    }

    #[tokio::test]
    async fn call_past_the_limit_is_rate_limited() {
        let spec = echo_spec().with_rate_limit(2);
        let (_, sandbox) = sandbox_with(vec![(spec, Behavior::Echo)], SandboxConfig::default());
        let params = json!({ "text": "hi" });

        assert!(sandbox.execute("echo", params.clone(), &ctx()).await.success);
        assert!(sandbox.execute("echo", params.clone(), &ctx()).await.success);

        let third = sandbox.execute("echo", params.clone(), &ctx()).await;
        assert_eq!(third.status, ToolStatus::RateLimited);
        assert_eq!(third.cost, 0);
        assert_eq!(sandbox.credits().balance("alice"), 94);

        assert!(sandbox.execute("echo", params, &ToolContext::new("bob")).await.success);
    }

    #[tokio::test]
    async fn unaffordable_call_leaves_balance_unchanged() {
        let (_, sandbox) = sandbox_with(vec![(echo_spec(), Behavior::Echo)], SandboxConfig::default());
        sandbox.credits().set_balance("alice", 2);

        let result = sandbox.execute("echo", json!({ "text": "hi" }), &ctx()).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Insufficient credits"));
        assert_eq!(sandbox.credits().balance("alice"), 2);
    }

    /// The attempt is paid for whether the body succeeds or fails.
    #[tokio::test]
    async fn cost_is_deducted_on_success_and_failure() {
        let (_, sandbox) = sandbox_with(
            vec![
                (echo_spec(), Behavior::Echo),
                (ToolSpec::new("broken").with_cost(5), Behavior::Fail),
            ],
            SandboxConfig::default(),
        );

        let ok = sandbox.execute("echo", json!({ "text": "hi" }), &ctx()).await;
        assert_eq!(ok.cost, 3);
        assert_eq!(sandbox.credits().balance("alice"), 97);

        let failed = sandbox.execute("broken", json!({}), &ctx()).await;
        assert_eq!(failed.status, ToolStatus::Failure);
        assert_eq!(failed.cost, 5);
        assert_eq!(sandbox.credits().balance("alice"), 92);
        assert!(failed.error.unwrap().contains("password=[REDACTED]"));
    }

    #[tokio::test]
    async fn disabled_cost_accounting_never_charges() {
        let config = SandboxConfig {
            cost_accounting_enabled: false,
            ..SandboxConfig::default()
        };
        let (_, sandbox) = sandbox_with(vec![(echo_spec(), Behavior::Echo)], config);
        sandbox.credits().set_balance("alice", 0);

        let result = sandbox.execute("echo", json!({ "text": "hi" }), &ctx()).await;
        assert!(result.success);
        assert_eq!(result.cost, 0);
        assert_eq!(sandbox.credits().balance("alice"), 0);
    }

    #[tokio::test]
    async fn slow_tool_times_out_and_still_pays() {
        let spec = ToolSpec::new("slow").with_timeout_ms(50).with_cost(2);
        let (_, sandbox) = sandbox_with(vec![(spec, Behavior::Sleep(5_000))], SandboxConfig::default());

        let result = sandbox.execute("slow", json!({}), &ctx()).await;
        assert_eq!(result.status, ToolStatus::Timeout);
        assert!(!result.success);
        assert_eq!(result.cost, 2);
        assert!(result.elapsed_ms < 5_000);
        assert_eq!(sandbox.credits().balance("alice"), 98);
    }

    #[tokio::test]
    async fn results_are_sanitized() {
        let (_, sandbox) = sandbox_with(vec![(ToolSpec::new("leaky"), Behavior::Echo)], SandboxConfig::default());

        let result = sandbox
            .execute(
                "leaky",
                json!({ "user": "alice", "password": "hunter2", "items": [{ "password": 1 }] }),
                &ctx(),
            )
            .await;

        assert_eq!(
            result.data,
            Some(json!({ "user": "alice", "password": "REDACTED", "items": [{ "password": "REDACTED" }] }))
        );
    }
}
