//! Reference tools.
//!
//! All tools are local and deterministic apart from `slow_tool` (which sleeps)
//! and `flaky_tool` (which fails a fixed number of times before succeeding).
//! No network calls are made.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use stepwise_contracts::{
    error::{StepwiseError, StepwiseResult},
    tool::{InputSchema, JsonType, ToolContext, ToolSpec},
};
use stepwise_core::traits::Tool;

fn tool_error(tool: &str, reason: impl Into<String>) -> StepwiseError {
    StepwiseError::ToolExecution {
        tool: tool.to_string(),
        reason: reason.into(),
    }
}

// ── echo ──────────────────────────────────────────────────────────────────────

/// Returns `{ "text": <text> }`.
pub struct EchoTool {
    spec: ToolSpec,
}

impl EchoTool {
    pub fn new() -> Self {
        Self {
            spec: ToolSpec::new("echo")
                .with_description("Echo the given text back")
                .with_schema(InputSchema::new().required("text", JsonType::String)),
        }
    }
}

impl Default for EchoTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, parameters: Value, _context: &ToolContext) -> StepwiseResult<Value> {
        Ok(json!({ "text": parameters["text"] }))
    }
}

// ── calculator ────────────────────────────────────────────────────────────────

/// Binary arithmetic: `{ "a": 6, "b": 7, "op": "mul" }` → `{ "result": 42.0 }`.
pub struct CalculatorTool {
    spec: ToolSpec,
}

impl CalculatorTool {
    pub fn new() -> Self {
        Self {
            spec: ToolSpec::new("calculator")
                .with_description("Apply add, sub, mul or div to two numbers")
                .with_schema(
                    InputSchema::new()
                        .required("a", JsonType::Number)
                        .required("b", JsonType::Number)
                        .required("op", JsonType::String),
                ),
        }
    }
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, parameters: Value, _context: &ToolContext) -> StepwiseResult<Value> {
        let a = parameters["a"].as_f64().unwrap_or_default();
        let b = parameters["b"].as_f64().unwrap_or_default();
        let result = match parameters["op"].as_str().unwrap_or_default() {
            "add" => a + b,
            "sub" => a - b,
            "mul" => a * b,
            "div" if b == 0.0 => return Err(tool_error("calculator", "division by zero")),
            "div" => a / b,
            other => return Err(tool_error("calculator", format!("unknown operator '{other}'"))),
        };
        Ok(json!({ "result": result }))
    }
}

// ── web_search ────────────────────────────────────────────────────────────────

const SEARCH_INDEX: &[(&str, &str)] = &[
    ("Exponential backoff and jitter", "https://example.org/backoff"),
    ("Designing idempotent task queues", "https://example.org/idempotency"),
    ("Sandboxing untrusted tools", "https://example.org/sandboxing"),
    ("Rate limiting with fixed windows", "https://example.org/rate-limits"),
];

/// Searches a small fixed index by case-insensitive word match.
pub struct WebSearchTool {
    spec: ToolSpec,
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self {
            spec: ToolSpec::new("web_search")
                .with_description("Search the reference index")
                .with_schema(
                    InputSchema::new()
                        .required("query", JsonType::String)
                        .optional("limit", JsonType::Integer),
                )
                .with_rate_limit(10)
                .with_cost(2),
        }
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, parameters: Value, _context: &ToolContext) -> StepwiseResult<Value> {
        let query = parameters["query"].as_str().unwrap_or_default().to_lowercase();
        let limit = parameters["limit"].as_u64().unwrap_or(3) as usize;

        let results: Vec<Value> = SEARCH_INDEX
            .iter()
            .filter(|(title, _)| {
                let title = title.to_lowercase();
                query.split_whitespace().any(|word| title.contains(word))
            })
            .take(limit)
            .map(|(title, url)| json!({ "title": title, "url": url }))
            .collect();

        Ok(json!({ "query": query, "total": results.len(), "results": results }))
    }
}

// ── slow_tool ─────────────────────────────────────────────────────────────────

/// Sleeps `delay_ms` (default 5000) against a 200 ms timeout.
pub struct SlowTool {
    spec: ToolSpec,
}

impl SlowTool {
    pub const TIMEOUT_MS: u64 = 200;

    pub fn new() -> Self {
        Self {
            spec: ToolSpec::new("slow_tool")
                .with_description("Sleep before answering")
                .with_schema(InputSchema::new().optional("delay_ms", JsonType::Integer))
                .with_timeout_ms(Self::TIMEOUT_MS),
        }
    }
}

impl Default for SlowTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SlowTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, parameters: Value, _context: &ToolContext) -> StepwiseResult<Value> {
        let delay = parameters["delay_ms"].as_u64().unwrap_or(5_000);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(json!({ "slept_ms": delay }))
    }
}

// ── flaky_tool ────────────────────────────────────────────────────────────────

/// Fails its first `failures` calls, then succeeds with `{ "attempt": n }`.
pub struct FlakyTool {
    spec: ToolSpec,
    failures: u32,
    calls: AtomicU32,
}

impl FlakyTool {
    pub fn new(failures: u32) -> Self {
        Self {
            spec: ToolSpec::new("flaky_tool").with_description("Fails a few times, then recovers"),
            failures,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for FlakyTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, _parameters: Value, _context: &ToolContext) -> StepwiseResult<Value> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            return Err(tool_error(
                "flaky_tool",
                format!("upstream unavailable (attempt {attempt})"),
            ));
        }
        Ok(json!({ "attempt": attempt, "status": "ok" }))
    }
}

// ── credentials_dump ──────────────────────────────────────────────────────────

/// Returns configuration that leaks credentials, for exercising sanitization.
pub struct CredentialsDumpTool {
    spec: ToolSpec,
}

impl CredentialsDumpTool {
    pub fn new() -> Self {
        Self {
            spec: ToolSpec::new("credentials_dump").with_description("Dump service configuration"),
        }
    }
}

impl Default for CredentialsDumpTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CredentialsDumpTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, _parameters: Value, _context: &ToolContext) -> StepwiseResult<Value> {
        Ok(json!({
            "service": "billing",
            "password": "correct-horse-battery-staple",
            "connection": {
                "host": "db.internal",
                "api_key": "sk-live-0123456789",
                "dsn": "postgres://billing@db.internal/billing?password=s3cret"
            },
            "replicas": [
                { "host": "replica-1", "auth_token": "t-1" },
                { "host": "replica-2", "auth_token": "t-2" }
            ]
        }))
    }
}
