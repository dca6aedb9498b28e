//! The tool catalog the sandbox resolves names against.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use stepwise_contracts::tool::ToolSpec;
use stepwise_core::traits::{Tool, ToolCatalog};

/// Registered tools keyed by their declared name.
///
/// `set_enabled(name, false)` disables a tool at runtime without touching its
/// declared `ToolSpec`; a tool runs only if both its spec and the registry
/// say it is enabled.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<BTreeMap<String, Arc<dyn Tool>>>,
    disabled: RwLock<HashSet<String>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tool` under `tool.spec().name`, replacing any previous entry.
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.spec().name.clone();
        debug!(tool = %name, "tool registered");
        self.tools
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name, tool);
    }

    /// Specs of every registered tool, ordered by name.
    pub fn list(&self) -> Vec<ToolSpec> {
        self.tools
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .map(|tool| tool.spec().clone())
            .collect()
    }

    /// Enable or disable a registered tool. Returns false if `name` is unknown.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        let known = self
            .tools
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name);
        if !known {
            return false;
        }

        let mut disabled = self.disabled.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if enabled {
            disabled.remove(name);
        } else {
            disabled.insert(name.to_string());
        }
        info!(tool = %name, enabled, "tool availability changed");
        true
    }
}

impl ToolCatalog for ToolRegistry {
    fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    /// Registered, enabled in its spec, and not disabled through `set_enabled`.
    fn is_enabled(&self, name: &str) -> bool {
        let spec_enabled = self.get(name).is_some_and(|tool| tool.spec().enabled);
        spec_enabled
            && !self
                .disabled
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .contains(name)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Value;

    use stepwise_contracts::{error::StepwiseResult, tool::ToolContext};

    use super::*;

    struct Noop(ToolSpec);

    #[async_trait]
    impl Tool for Noop {
        fn spec(&self) -> &ToolSpec {
            &self.0
        }

        async fn execute(&self, parameters: Value, _context: &ToolContext) -> StepwiseResult<Value> {
            Ok(parameters)
        }
    }

    #[test]
    fn register_list_and_toggle() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(Noop(ToolSpec::new("web_search"))));
        registry.register(Arc::new(Noop(ToolSpec::new("calculator"))));

        let names: Vec<String> = registry.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["calculator", "web_search"]);

        assert!(registry.is_enabled("calculator"));
        assert!(registry.set_enabled("calculator", false));
        assert!(!registry.is_enabled("calculator"));
        assert!(registry.get("calculator").is_some());
        assert!(registry.set_enabled("calculator", true));
        assert!(registry.is_enabled("calculator"));

        assert!(!registry.set_enabled("missing", false));
        assert!(!registry.is_enabled("missing"));
    }

    #[test]
    fn spec_disabled_tool_cannot_be_enabled_by_registry() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(Noop(ToolSpec::new("legacy").disabled())));
        assert!(registry.set_enabled("legacy", true));
        assert!(!registry.is_enabled("legacy"));
    }
}
