//! LLM integration for the assistant.
//!
//! Talks to any OpenAI-compatible chat-completions endpoint. When no API key
//! is configured an [`UnconfiguredProvider`] stands in so the service still
//! boots and assistant requests fail cleanly.

mod openai;
pub mod provider;
pub mod reasoning;

pub use openai::OpenAiProvider;
pub use provider::*;
pub use reasoning::{Reasoning, ReasoningContext, RespondOutput, RespondResult, TokenUsage};

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AssistantConfig;
use crate::error::LlmError;

/// Create an LLM provider from configuration.
pub fn create_provider(config: &AssistantConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.api_key {
        Some(ref key) => {
            let provider = OpenAiProvider::new(
                key.clone(),
                &config.base_url,
                &config.model,
                config.request_timeout,
            )?;
            tracing::info!(model = %config.model, base_url = %config.base_url, "Using OpenAI-compatible provider");
            Ok(Arc::new(provider))
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set, assistant requests will fail");
            Ok(Arc::new(UnconfiguredProvider::new(&config.model)))
        }
    }
}

/// Placeholder provider that rejects every request.
pub struct UnconfiguredProvider {
    model: String,
}

impl UnconfiguredProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    fn error() -> LlmError {
        LlmError::NotConfigured {
            provider: "openai".to_string(),
            reason: "OPENAI_API_KEY is not set".to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for UnconfiguredProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Err(Self::error())
    }

    async fn complete_with_tools(
        &self,
        _request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse, LlmError> {
        Err(Self::error())
    }
}
