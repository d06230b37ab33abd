//! REST endpoint for the chat assistant.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use super::orchestrator::ChatReply;
use crate::context::AppContext;
use crate::error::{ApiError, AssistantError};

/// Request body. Both fields are loosely typed so malformed input can be
/// answered with the right message instead of a rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub message: Value,
    pub history: Value,
}

const MESSAGE_REQUIRED: &str = "Message is required";

/// POST /api/ai/chat
async fn chat(
    State(ctx): State<AppContext>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(req) = payload.map_err(|_| ApiError::BadRequest(MESSAGE_REQUIRED.to_string()))?;

    let message = match req.message.as_str() {
        Some(m) if !m.trim().is_empty() => m,
        _ => return Err(ApiError::BadRequest(MESSAGE_REQUIRED.to_string())),
    };
    let history: &[Value] = match &req.history {
        Value::Array(entries) => entries,
        _ => &[],
    };

    match ctx.assistant.chat(message, history).await {
        Ok(reply) => Ok(Json(reply)),
        Err(AssistantError::EmptyMessage) => Err(ApiError::BadRequest(MESSAGE_REQUIRED.to_string())),
        Err(e) => {
            tracing::error!(error = %e, "Assistant request failed");
            Err(ApiError::Internal("AI assistant request failed".to_string()))
        }
    }
}

/// Build the assistant REST routes. The chat endpoint is public.
pub fn assistant_routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/api/ai/chat", post(chat))
        .with_state(ctx)
}
