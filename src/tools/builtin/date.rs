//! Current date tool.

use std::time::Instant;

use async_trait::async_trait;

use crate::tools::tool::{Tool, ToolError, ToolName, ToolOutput};

/// Reports today's date (UTC) as `YYYY-MM-DD`.
pub struct CurrentDateTool;

#[async_trait]
impl Tool for CurrentDateTool {
    fn name(&self) -> ToolName {
        ToolName::GetCurrentDate
    }

    fn description(&self) -> &str {
        "Get the current date in ISO format (YYYY-MM-DD). Use this for any questions \
         about today's date or the current date."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let date = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
        Ok(ToolOutput::success(
            serde_json::json!({ "date": date }),
            start.elapsed(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_iso_date() {
        let out = CurrentDateTool.execute(serde_json::json!({})).await.unwrap();
        let date = out.result["date"].as_str().unwrap();
        assert!(chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok());
        assert_eq!(date.len(), 10);
    }
}
