//! LLM-backed chat assistant with read-only banking tools.

pub mod orchestrator;
pub mod prompts;
pub mod routes;

pub use orchestrator::{ChatReply, LoopLimits, Orchestrator, ToolCallRecord};
pub use routes::assistant_routes;
