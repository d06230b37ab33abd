//! System prompt for the banking assistant.

use crate::tools::ToolName;

const PREAMBLE: &str = "You are a helpful assistant for a bank account dashboard.";

const MULTI_STEP_GUIDANCE: &str = "IMPORTANT: Use multiple tools in sequence as needed to fully \
answer questions. For example, when asked about accounts for a customer by name, first use \
searchCustomerByName to find the customer ID, then use getAccountsByCustomer with that customer ID.";

/// One-line summary of each tool as it appears in the system prompt.
fn tool_summary(name: ToolName) -> &'static str {
    match name {
        ToolName::SpellChecker => "Correct English spelling and grammar.",
        ToolName::GetCurrentDate => "Get today's date.",
        ToolName::GetAccountsByCustomer => "List all accounts for a customer ID (not name).",
        ToolName::GetAllAccounts => "List all bank accounts.",
        ToolName::GetCustomerByAccount => "Get customer details by account number.",
        ToolName::SearchCustomerByName => "Search customers by name to get their customer ID.",
    }
}

/// Build the system prompt listing the given tools.
pub fn system_prompt(tools: &[ToolName]) -> String {
    let mut prompt = String::from(PREAMBLE);
    prompt.push_str(" Available tools:");
    for name in tools {
        prompt.push_str(&format!(" - {}: {}", name, tool_summary(*name)));
    }
    prompt.push(' ');
    prompt.push_str(MULTI_STEP_GUIDANCE);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_tools_and_guidance() {
        let prompt = system_prompt(&ToolName::ALL);
        for name in ToolName::ALL {
            assert!(prompt.contains(name.as_str()), "missing {name}");
        }
        assert!(prompt.starts_with(PREAMBLE));
        assert!(prompt.ends_with(MULTI_STEP_GUIDANCE));
    }
}
