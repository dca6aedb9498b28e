//! Policy configuration schema.
//!
//! The gate is permissive by default: anything not explicitly blocked is
//! allowed for a named principal. `PolicyConfig` lists the tools to block.
//!
//! Example in TOML:
//! ```toml
//! blocked_tools = ["shell_exec", "tool:delete_everything"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use stepwise_contracts::error::{StepwiseError, StepwiseResult};

/// Prefix that marks an action as a tool invocation.
pub const TOOL_PREFIX: &str = "tool:";

/// The top-level structure deserialized from a TOML policy file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Tool names denied for every principal. A leading `tool:` is accepted
    /// and stripped.
    #[serde(default)]
    pub blocked_tools: Vec<String>,
}

impl PolicyConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `StepwiseError::Config` if the TOML is malformed or does not
    /// match `PolicyConfig`.
    pub fn from_toml_str(s: &str) -> StepwiseResult<Self> {
        toml::from_str(s).map_err(|e| StepwiseError::Config {
            reason: format!("failed to parse policy TOML: {}", e),
        })
    }

    /// Read the file at `path` and parse it as TOML policy configuration.
    pub fn from_file(path: &Path) -> StepwiseResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| StepwiseError::Config {
            reason: format!("failed to read policy file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Blocked tool names with any `tool:` prefix removed.
    pub fn normalized_blocklist(&self) -> impl Iterator<Item = String> + '_ {
        self.blocked_tools.iter().map(|t| normalize_tool_name(t))
    }
}

/// Strip a leading `tool:` and surrounding whitespace.
pub fn normalize_tool_name(name: &str) -> String {
    let name = name.trim();
    name.strip_prefix(TOOL_PREFIX).unwrap_or(name).to_string()
}
