//! Tool trait and the closed set of assistant tool names.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;

pub use crate::error::ToolError;

/// Identity of every tool the assistant may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolName {
    SpellChecker,
    GetCurrentDate,
    GetAccountsByCustomer,
    GetAllAccounts,
    GetCustomerByAccount,
    SearchCustomerByName,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::SpellChecker,
        ToolName::GetCurrentDate,
        ToolName::GetAccountsByCustomer,
        ToolName::GetAllAccounts,
        ToolName::GetCustomerByAccount,
        ToolName::SearchCustomerByName,
    ];

    /// Function name as advertised to the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::SpellChecker => "spellChecker",
            ToolName::GetCurrentDate => "getCurrentDate",
            ToolName::GetAccountsByCustomer => "getAccountsByCustomer",
            ToolName::GetAllAccounts => "getAllAccounts",
            ToolName::GetCustomerByAccount => "getCustomerByAccount",
            ToolName::SearchCustomerByName => "searchCustomerByName",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ToolError::NotFound {
                name: s.to_string(),
            })
    }
}

/// Output of a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub result: serde_json::Value,
    pub duration: Duration,
}

impl ToolOutput {
    pub fn success(result: serde_json::Value, duration: Duration) -> Self {
        Self { result, duration }
    }
}

/// A function the assistant can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError>;
}

/// Extract a required string parameter.
pub fn require_str<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidParameters(format!("missing '{key}' parameter")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_parse_from_wire_names() {
        for name in ToolName::ALL {
            assert_eq!(name.as_str().parse::<ToolName>().unwrap(), name);
        }
        assert!(matches!(
            "deleteEverything".parse::<ToolName>(),
            Err(ToolError::NotFound { .. })
        ));
    }

    #[test]
    fn require_str_reports_missing_key() {
        let params = serde_json::json!({"name": "John", "age": 3});
        assert_eq!(require_str(&params, "name").unwrap(), "John");
        let err = require_str(&params, "age").unwrap_err();
        assert!(err.to_string().contains("'age'"));
    }
}
