//! Wires every stepwise component into one runtime over the reference tools.

use std::sync::Arc;

use stepwise_audit::InMemoryAuditWriter;
use stepwise_contracts::error::StepwiseResult;
use stepwise_core::{BacktrackingExecutor, PlanExecutor};
use stepwise_durable::{BackoffConfig, DurableTaskExecutor, ExponentialBackoffStrategy, InMemoryStore};
use stepwise_policy::{BlocklistPolicyGate, PolicyConfig};
use stepwise_sandbox::{SandboxConfig, ToolRegistry, ToolSandbox};
use stepwise_verify::VerifierRegistry;

use crate::tools::{CalculatorTool, CredentialsDumpTool, EchoTool, FlakyTool, SlowTool, WebSearchTool};

/// The reference blocklist.
pub const DEFAULT_POLICY: &str = include_str!("../policies/default.toml");

/// Failures `flaky_tool` produces before it recovers.
pub const FLAKY_FAILURES: u32 = 2;

/// One isolated instance of the execution core.
///
/// Nothing here is global: two runtimes never share rate windows, credit
/// balances, audit logs or stored Goals.
pub struct Runtime {
    pub registry: Arc<ToolRegistry>,
    pub audit: Arc<InMemoryAuditWriter>,
    pub policy: Arc<BlocklistPolicyGate>,
    pub sandbox: Arc<ToolSandbox>,
    pub verifiers: Arc<VerifierRegistry>,
    pub store: Arc<InMemoryStore>,
    pub flaky: Arc<FlakyTool>,
    backoff: ExponentialBackoffStrategy,
}

impl Runtime {
    pub fn new(policy: &PolicyConfig, sandbox: &SandboxConfig, backoff: &BackoffConfig) -> Self {
        let flaky = Arc::new(FlakyTool::new(FLAKY_FAILURES));

        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(EchoTool::new()));
        registry.register(Arc::new(CalculatorTool::new()));
        registry.register(Arc::new(WebSearchTool::new()));
        registry.register(Arc::new(SlowTool::new()));
        registry.register(flaky.clone());
        registry.register(Arc::new(CredentialsDumpTool::new()));

        let verifiers = Arc::new(VerifierRegistry::with_defaults());
        verifiers.bind_tool_to_type("flaky_tool", "json-schema");
        verifiers.bind_tool_to_type("slow_tool", "passthrough");
        verifiers.bind_tool_to_type("credentials_dump", "passthrough");

        let audit = Arc::new(InMemoryAuditWriter::new());
        let policy = Arc::new(BlocklistPolicyGate::with_audit_writer(policy, Box::new(audit.clone())));

        Self {
            sandbox: Arc::new(ToolSandbox::new(registry.clone(), sandbox)),
            registry,
            audit,
            policy,
            verifiers,
            store: Arc::new(InMemoryStore::new()),
            flaky,
            backoff: backoff.strategy(),
        }
    }

    /// A runtime with the reference policy and default sandbox and backoff.
    pub fn reference() -> StepwiseResult<Self> {
        Ok(Self::new(
            &PolicyConfig::from_toml_str(DEFAULT_POLICY)?,
            &SandboxConfig::default(),
            &BackoffConfig::default(),
        ))
    }

    pub fn plan_executor(&self) -> PlanExecutor {
        PlanExecutor::new(self.policy.clone(), self.sandbox.clone())
    }

    pub fn backtracking_executor(&self) -> BacktrackingExecutor {
        BacktrackingExecutor::new(self.plan_executor())
    }

    /// A durable executor over this runtime's store. Executors hold no state
    /// of their own, so a fresh one stands in for a restarted process.
    pub fn durable_executor(&self) -> DurableTaskExecutor {
        DurableTaskExecutor::new(
            self.store.clone(),
            self.sandbox.clone(),
            self.verifiers.clone(),
            self.backoff,
        )
    }
}
