//! Spelling and grammar correction backed by a completion call.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::tools::tool::{Tool, ToolError, ToolName, ToolOutput, require_str};

const SPELL_CHECK_PROMPT: &str = "You are a helpful English writing assistant. Correct any \
spelling or grammar mistakes in the user's text, and return the corrected version.";

pub struct SpellCheckerTool {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
}

impl SpellCheckerTool {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }
}

#[async_trait]
impl Tool for SpellCheckerTool {
    fn name(&self) -> ToolName {
        ToolName::SpellChecker
    }

    fn description(&self) -> &str {
        "Check and correct English spelling and grammar. Use this for any questions \
         about English writing, spelling, or grammar."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The English text to check and correct."
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let text = require_str(&params, "text")?;

        let request = CompletionRequest::new(vec![
            ChatMessage::system(SPELL_CHECK_PROMPT),
            ChatMessage::user(text),
        ])
        .with_max_tokens(self.max_tokens);

        let response = self
            .llm
            .complete(request)
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("spell check failed: {e}")))?;

        Ok(ToolOutput::success(
            serde_json::json!({ "corrected": response.content }),
            start.elapsed(),
        ))
    }
}
