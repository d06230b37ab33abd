//! Built-in assistant tools: account and customer lookups, date, spell checking.

pub mod banking;
pub mod date;
pub mod spell;

pub use banking::{
    AccountsByCustomerTool, AllAccountsTool, CustomerByAccountTool, SearchCustomerByNameTool,
};
pub use date::CurrentDateTool;
pub use spell::SpellCheckerTool;

use std::sync::Arc;

use crate::error::ToolError;
use crate::llm::LlmProvider;
use crate::store::Database;
use crate::tools::ToolRegistry;

/// Build the registry holding every built-in tool and validate its schemas.
pub fn builtin_registry(
    store: Arc<dyn Database>,
    llm: Arc<dyn LlmProvider>,
    spell_check_max_tokens: u32,
) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SpellCheckerTool::new(llm, spell_check_max_tokens)))?;
    registry.register(Arc::new(CurrentDateTool))?;
    registry.register(Arc::new(AccountsByCustomerTool::new(Arc::clone(&store))))?;
    registry.register(Arc::new(AllAccountsTool::new(Arc::clone(&store))))?;
    registry.register(Arc::new(CustomerByAccountTool::new(Arc::clone(&store))))?;
    registry.register(Arc::new(SearchCustomerByNameTool::new(store)))?;
    registry.validate()?;

    tracing::info!(tools = registry.count(), "Tool registry ready");
    Ok(registry)
}
