//! Tool registry for the assistant.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::llm::ToolDefinition;
use crate::tools::tool::{Tool, ToolError, ToolName};

/// Function names accepted by chat-completion APIs.
static FUNCTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{1,64}$").unwrap());

/// Registry of available tools, keyed by [`ToolName`].
///
/// Built once at startup and shared read-only afterwards.
pub struct ToolRegistry {
    tools: BTreeMap<ToolName, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. A second registration under the same name is rejected.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name();
        if self.tools.contains_key(&name) {
            return Err(ToolError::Duplicate {
                name: name.to_string(),
            });
        }
        self.tools.insert(name, tool);
        tracing::debug!(tool = %name, "Registered tool");
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: ToolName) -> Option<Arc<dyn Tool>> {
        self.tools.get(&name).cloned()
    }

    /// Resolve a model-supplied function name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        name.parse::<ToolName>().ok().and_then(|n| self.get(n))
    }

    /// List all tool names.
    pub fn list(&self) -> Vec<ToolName> {
        self.tools.keys().copied().collect()
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// Get tool definitions for LLM function calling.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    /// Check every registered schema before the registry is put into service.
    pub fn validate(&self) -> Result<(), ToolError> {
        for tool in self.tools.values() {
            validate_tool(tool.as_ref())?;
        }
        Ok(())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_tool(tool: &dyn Tool) -> Result<(), ToolError> {
    let name = tool.name().as_str();
    let invalid = |reason: String| ToolError::InvalidSchema {
        name: name.to_string(),
        reason,
    };

    if !FUNCTION_NAME.is_match(name) {
        return Err(invalid("name is not a valid function name".to_string()));
    }
    if tool.description().trim().is_empty() {
        return Err(invalid("description is empty".to_string()));
    }

    let schema = tool.parameters_schema();
    if schema.get("type").and_then(|t| t.as_str()) != Some("object") {
        return Err(invalid("schema type must be \"object\"".to_string()));
    }
    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .ok_or_else(|| invalid("schema is missing a properties object".to_string()))?;

    if let Some(required) = schema.get("required") {
        let required = required
            .as_array()
            .ok_or_else(|| invalid("required must be an array".to_string()))?;
        for key in required {
            let key = key
                .as_str()
                .ok_or_else(|| invalid("required entries must be strings".to_string()))?;
            if !properties.contains_key(key) {
                return Err(invalid(format!("required key '{key}' is not declared")));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tool::ToolOutput;
    use async_trait::async_trait;
    use std::time::Duration;

    struct MockTool {
        name: ToolName,
        schema: serde_json::Value,
    }

    impl MockTool {
        fn new(name: ToolName) -> Self {
            Self {
                name,
                schema: serde_json::json!({"type": "object", "properties": {}}),
            }
        }
    }

    #[async_trait]
    impl Tool for MockTool {
        fn name(&self) -> ToolName {
            self.name
        }
        fn description(&self) -> &str {
            "A mock tool for testing"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            self.schema.clone()
        }
        async fn execute(&self, _params: serde_json::Value) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::success(serde_json::json!("mock"), Duration::from_millis(1)))
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(MockTool::new(ToolName::GetCurrentDate)))
            .unwrap();

        assert!(registry.resolve("getCurrentDate").is_some());
        assert!(registry.resolve("getAllAccounts").is_none());
        assert!(registry.resolve("rm_rf").is_none());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(MockTool::new(ToolName::GetAllAccounts)))
            .unwrap();
        let err = registry
            .register(Arc::new(MockTool::new(ToolName::GetAllAccounts)))
            .unwrap_err();
        assert!(matches!(err, ToolError::Duplicate { .. }));
    }

    #[test]
    fn test_tool_definitions() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(MockTool::new(ToolName::SpellChecker)))
            .unwrap();

        let defs = registry.tool_definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "spellChecker");
        assert_eq!(defs[0].parameters["type"], "object");
    }

    #[test]
    fn test_validate_accepts_well_formed_schema() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(MockTool {
                name: ToolName::SearchCustomerByName,
                schema: serde_json::json!({
                    "type": "object",
                    "properties": {"name": {"type": "string"}},
                    "required": ["name"]
                }),
            }))
            .unwrap();
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_undeclared_required_key() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(MockTool {
                name: ToolName::SearchCustomerByName,
                schema: serde_json::json!({
                    "type": "object",
                    "properties": {"name": {"type": "string"}},
                    "required": ["customerName"]
                }),
            }))
            .unwrap();

        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("customerName"));
    }

    #[test]
    fn test_validate_rejects_non_object_schema() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(MockTool {
                name: ToolName::GetCurrentDate,
                schema: serde_json::json!({"type": "string"}),
            }))
            .unwrap();
        assert!(matches!(
            registry.validate(),
            Err(ToolError::InvalidSchema { .. })
        ));
    }
}
