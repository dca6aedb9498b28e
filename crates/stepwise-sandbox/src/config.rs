//! Sandbox configuration.
//!
//! Example in TOML:
//! ```toml
//! cost_accounting_enabled = true
//! default_credits = 100
//! rate_window_secs = 60
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use stepwise_contracts::error::{StepwiseError, StepwiseResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// When false the credit phase is skipped and nothing is ever deducted.
    pub cost_accounting_enabled: bool,
    /// Balance a principal starts with the first time it is seen.
    pub default_credits: u64,
    /// Length of one rate-limit window, in seconds.
    pub rate_window_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            cost_accounting_enabled: true,
            default_credits: 100,
            rate_window_secs: 60,
        }
    }
}

impl SandboxConfig {
    pub fn from_toml_str(s: &str) -> StepwiseResult<Self> {
        toml::from_str(s).map_err(|e| StepwiseError::Config {
            reason: format!("failed to parse sandbox TOML: {}", e),
        })
    }

    pub fn from_file(path: &Path) -> StepwiseResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| StepwiseError::Config {
            reason: format!("failed to read sandbox file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = SandboxConfig::from_toml_str("cost_accounting_enabled = false").unwrap();
        assert!(!config.cost_accounting_enabled);
        assert_eq!(config.default_credits, 100);
        assert_eq!(config.rate_window(), Duration::from_secs(60));
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = SandboxConfig::from_toml_str("default_credits = \"lots\"").unwrap_err();
        assert!(matches!(err, StepwiseError::Config { .. }));
    }
}
