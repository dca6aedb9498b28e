//! Runtime configuration for the demo.
//!
//! ```toml
//! [policy]
//! blocked_tools = ["shell_exec", "delete_records"]
//!
//! [sandbox]
//! cost_accounting_enabled = true
//! default_credits = 100
//!
//! [backoff]
//! base_ms = 250
//! cap_ms = 5000
//! ```

use std::path::Path;

use serde::Deserialize;

use stepwise_contracts::error::{StepwiseError, StepwiseResult};
use stepwise_durable::BackoffConfig;
use stepwise_policy::PolicyConfig;
use stepwise_ref::{runtime::DEFAULT_POLICY, Runtime};
use stepwise_sandbox::SandboxConfig;

/// Every table is optional. A missing `[policy]` falls back to the
/// reference blocklist rather than an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub policy: Option<PolicyConfig>,
    pub sandbox: SandboxConfig,
    pub backoff: BackoffConfig,
}

impl RuntimeConfig {
    pub fn from_toml_str(s: &str) -> StepwiseResult<Self> {
        toml::from_str(s).map_err(|e| StepwiseError::Config {
            reason: format!("failed to parse runtime TOML: {}", e),
        })
    }

    pub fn from_file(path: &Path) -> StepwiseResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| StepwiseError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Build a fresh runtime from this configuration.
    pub fn build_runtime(&self) -> StepwiseResult<Runtime> {
        let policy = match &self.policy {
            Some(policy) => policy.clone(),
            None => PolicyConfig::from_toml_str(DEFAULT_POLICY)?,
        };
        Ok(Runtime::new(&policy, &self.sandbox, &self.backoff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_optional() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [backoff]
            base_ms = 250
            "#,
        )
        .unwrap();
        assert!(config.policy.is_none());
        assert_eq!(config.backoff.base_ms, 250);
        assert_eq!(config.backoff.cap_ms, 60_000);
        assert!(config.sandbox.cost_accounting_enabled);
    }

    #[test]
    fn policy_table_overrides_reference_blocklist() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [policy]
            blocked_tools = ["echo"]
            "#,
        )
        .unwrap();
        assert_eq!(config.policy.unwrap().blocked_tools, vec!["echo".to_string()]);
    }

    #[test]
    fn unknown_shapes_are_config_errors() {
        assert!(matches!(
            RuntimeConfig::from_toml_str("[sandbox]\ndefault_credits = \"many\""),
            Err(StepwiseError::Config { .. })
        ));
    }
}
