//! # stepwise-sandbox
//!
//! The sandbox every tool call passes through.
//!
//! [`ToolSandbox`] resolves a tool in a [`ToolCatalog`](stepwise_core::traits::ToolCatalog),
//! validates its input against the declared schema, enforces a per-(principal,
//! tool) rate limit and a per-principal credit budget, races the tool body
//! against its declared timeout and sanitizes whatever comes back.
//!
//! The sandbox implements [`ToolInvoker`](stepwise_core::traits::ToolInvoker),
//! which is the only way the executors reach a tool.

pub mod config;
pub mod credits;
pub mod rate_limit;
pub mod registry;
pub mod sandbox;
pub mod sanitize;

pub use config::SandboxConfig;
pub use credits::CreditLedger;
pub use rate_limit::RateLimiter;
pub use registry::ToolRegistry;
pub use sandbox::ToolSandbox;
