//! Bounded tool-calling loop behind the chat endpoint.
//!
//! Each request seeds a fresh conversation (system prompt, filtered history,
//! user message), then alternates between the model and the tool registry
//! until the model answers without requesting tools or the iteration cap is
//! hit. At the cap one last completion without tools produces the answer.

use std::sync::Arc;

use serde::Serialize;

use crate::assistant::prompts;
use crate::config::AssistantConfig;
use crate::error::AssistantError;
use crate::llm::{ChatMessage, LlmProvider, Reasoning, ReasoningContext, RespondResult, ToolCall, TokenUsage};
use crate::tools::{Tool, ToolRegistry};

/// One executed tool call, reported back to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub args: serde_json::Value,
    pub result: serde_json::Value,
}

/// Final answer of a chat request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub ai_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_results: Option<Vec<ToolCallRecord>>,
}

/// Loop limits, taken from [`AssistantConfig`].
#[derive(Debug, Clone, Copy)]
pub struct LoopLimits {
    pub max_iterations: usize,
    pub tool_max_tokens: u32,
    pub final_max_tokens: u32,
    pub preview_limit: usize,
}

impl From<&AssistantConfig> for LoopLimits {
    fn from(config: &AssistantConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            tool_max_tokens: config.tool_max_tokens,
            final_max_tokens: config.final_max_tokens,
            preview_limit: config.preview_limit,
        }
    }
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self::from(&AssistantConfig::default())
    }
}

/// Drives the model/tool conversation for one chat request at a time.
///
/// Holds no per-request state, so a single instance serves all requests.
pub struct Orchestrator {
    reasoning: Reasoning,
    tools: Arc<ToolRegistry>,
    limits: LoopLimits,
    system_prompt: String,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, limits: LoopLimits) -> Self {
        let system_prompt = prompts::system_prompt(&tools.list());
        Self {
            reasoning: Reasoning::new(llm),
            tools,
            limits,
            system_prompt,
        }
    }

    /// Answer `message` given prior `history` turns.
    ///
    /// `history` is untrusted client input: entries that are not a
    /// `user`/`assistant` turn with string content are dropped.
    pub async fn chat(
        &self,
        message: &str,
        history: &[serde_json::Value],
    ) -> Result<ChatReply, AssistantError> {
        if message.trim().is_empty() {
            return Err(AssistantError::EmptyMessage);
        }

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(&self.system_prompt));
        messages.extend(sanitize_history(history));
        messages.push(ChatMessage::user(message));

        let mut context = ReasoningContext::new()
            .with_messages(messages)
            .with_tools(self.tools.tool_definitions())
            .with_max_tokens(self.limits.tool_max_tokens);

        let mut records: Vec<ToolCallRecord> = Vec::new();
        let mut usage = TokenUsage::default();

        for iteration in 0..self.limits.max_iterations {
            let output = self.reasoning.respond_with_tools(&context).await?;
            usage += output.usage;

            let (tool_calls, content) = match output.result {
                RespondResult::Text(text) => {
                    tracing::info!(
                        iterations = iteration,
                        tools_run = records.len(),
                        tokens = usage.total(),
                        "Assistant answered"
                    );
                    return Ok(ChatReply {
                        ai_message: text,
                        tool_results: (!records.is_empty()).then_some(records),
                    });
                }
                RespondResult::ToolCalls {
                    tool_calls,
                    content,
                } => (tool_calls, content),
            };

            tracing::debug!(
                iteration,
                requested = tool_calls.len(),
                "Model requested tool calls"
            );

            let resolved = self.resolve_calls(tool_calls);
            if resolved.is_empty() {
                // Nothing runnable; keep any text so the model sees its own turn.
                if let Some(text) = content {
                    context.messages.push(ChatMessage::assistant(text));
                }
                continue;
            }

            context.messages.push(ChatMessage::assistant_with_tool_calls(
                content,
                resolved.iter().map(|(call, _)| call.clone()).collect(),
            ));

            for (call, tool) in resolved {
                let record = self.run_tool(&call, tool.as_ref()).await;
                context.messages.push(ChatMessage::tool_result(
                    &call.id,
                    &call.name,
                    record.result.to_string(),
                ));
                records.push(record);
            }
        }

        tracing::warn!(
            max_iterations = self.limits.max_iterations,
            tools_run = records.len(),
            "Iteration cap reached, requesting final answer without tools"
        );
        context.tools.clear();
        context.max_tokens = Some(self.limits.final_max_tokens);
        let output = self.reasoning.respond(&context).await?;
        let ai_message = match output.result {
            RespondResult::Text(text) => text,
            RespondResult::ToolCalls { content, .. } => content.unwrap_or_default(),
        };

        Ok(ChatReply {
            ai_message,
            tool_results: Some(records),
        })
    }

    /// Pair each call with its tool, dropping calls to unknown tools.
    fn resolve_calls(&self, calls: Vec<ToolCall>) -> Vec<(ToolCall, Arc<dyn Tool>)> {
        calls
            .into_iter()
            .filter_map(|call| match self.tools.resolve(&call.name) {
                Some(tool) => Some((call, tool)),
                None => {
                    tracing::warn!(tool = %call.name, call_id = %call.id, "Skipping call to unknown tool");
                    None
                }
            })
            .collect()
    }

    async fn run_tool(&self, call: &ToolCall, tool: &dyn Tool) -> ToolCallRecord {
        let args = call.parse_arguments().unwrap_or_else(|reason| {
            tracing::warn!(tool = %call.name, reason = %reason, "Unparsable tool arguments, using {{}}");
            serde_json::json!({})
        });

        let result = match tool.execute(args.clone()).await {
            Ok(output) => {
                tracing::info!(
                    tool = %call.name,
                    elapsed_ms = output.duration.as_millis() as u64,
                    "Tool executed"
                );
                format_tool_result(output.result, self.limits.preview_limit)
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool failed");
                serde_json::json!({ "error": e.to_string() })
            }
        };

        ToolCallRecord {
            tool: call.name.clone(),
            args,
            result,
        }
    }
}

/// Keep only `user`/`assistant` entries whose content is a string.
pub fn sanitize_history(history: &[serde_json::Value]) -> Vec<ChatMessage> {
    history
        .iter()
        .filter_map(|entry| {
            let content = entry.get("content")?.as_str()?;
            match entry.get("role")?.as_str()? {
                "user" => Some(ChatMessage::user(content)),
                "assistant" => Some(ChatMessage::assistant(content)),
                _ => None,
            }
        })
        .collect()
}

/// Normalize a tool result before it is shown to the model.
///
/// Arrays become `{total, data}`, or `{total, preview, truncated}` past
/// `preview_limit` items. Objects carrying an `accounts` array become
/// `{total, accounts, error?}`. Anything else passes through.
pub fn format_tool_result(result: serde_json::Value, preview_limit: usize) -> serde_json::Value {
    match result {
        serde_json::Value::Array(items) => {
            let total = items.len();
            if total <= preview_limit {
                serde_json::json!({ "total": total, "data": items })
            } else {
                let preview: Vec<_> = items.into_iter().take(preview_limit).collect();
                serde_json::json!({ "total": total, "preview": preview, "truncated": true })
            }
        }
        serde_json::Value::Object(mut map)
            if map.get("accounts").is_some_and(|a| a.is_array()) =>
        {
            let accounts = map.remove("accounts").unwrap_or_default();
            let count = accounts.as_array().map(|a| a.len()).unwrap_or(0);
            let total = match map.remove("total") {
                Some(t) if t.as_u64().is_some_and(|n| n > 0) => t,
                _ => serde_json::json!(count),
            };

            let mut formatted = serde_json::Map::new();
            formatted.insert("total".to_string(), total);
            formatted.insert("accounts".to_string(), accounts);
            if let Some(error) = map.remove("error").filter(|e| !e.is_null()) {
                formatted.insert("error".to_string(), error);
            }
            serde_json::Value::Object(formatted)
        }
        other => other,
    }
}
