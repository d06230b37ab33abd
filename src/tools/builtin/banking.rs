//! Read-only lookup tools over accounts and customers.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::store::Database;
use crate::tools::tool::{Tool, ToolError, ToolName, ToolOutput, require_str};

fn to_value<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
}

fn store_failure(e: DatabaseError) -> ToolError {
    ToolError::ExecutionFailed(e.to_string())
}

/// Lists every account owned by one customer.
///
/// Lookup failures come back as data (`{error, accounts: []}`) so the model
/// can explain them instead of the turn failing.
pub struct AccountsByCustomerTool {
    store: Arc<dyn Database>,
}

impl AccountsByCustomerTool {
    pub fn new(store: Arc<dyn Database>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for AccountsByCustomerTool {
    fn name(&self) -> ToolName {
        ToolName::GetAccountsByCustomer
    }

    fn description(&self) -> &str {
        "Get all accounts for a given customer ID."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "customerId": {
                    "type": "string",
                    "description": "The customer ID to look up."
                }
            },
            "required": ["customerId"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let Ok(customer_id) = require_str(&params, "customerId") else {
            tracing::warn!("Account lookup without a customer ID");
            let result = serde_json::json!({
                "error": "A customer ID is required to look up accounts",
                "accounts": [],
            });
            return Ok(ToolOutput::success(result, start.elapsed()));
        };

        let result = match self.store.accounts_by_customer(customer_id).await {
            Ok(accounts) if accounts.is_empty() => serde_json::json!({
                "error": format!("No accounts found for customer ID: {customer_id}"),
                "accounts": [],
            }),
            Ok(accounts) => serde_json::json!({
                "total": accounts.len(),
                "accounts": to_value(&accounts)?,
            }),
            Err(e) => {
                tracing::error!(customer_id = %customer_id, error = %e, "Account lookup failed");
                serde_json::json!({
                    "error": format!("Failed to fetch accounts for customer {customer_id}: {e}"),
                    "accounts": [],
                })
            }
        };

        Ok(ToolOutput::success(result, start.elapsed()))
    }
}

/// Lists every account, newest first.
pub struct AllAccountsTool {
    store: Arc<dyn Database>,
}

impl AllAccountsTool {
    pub fn new(store: Arc<dyn Database>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for AllAccountsTool {
    fn name(&self) -> ToolName {
        ToolName::GetAllAccounts
    }

    fn description(&self) -> &str {
        "Get a list of all bank accounts with their details."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let accounts = self.store.all_accounts().await.map_err(store_failure)?;
        Ok(ToolOutput::success(to_value(&accounts)?, start.elapsed()))
    }
}

/// Resolves the owner of an account number. `null` when unresolved.
pub struct CustomerByAccountTool {
    store: Arc<dyn Database>,
}

impl CustomerByAccountTool {
    pub fn new(store: Arc<dyn Database>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CustomerByAccountTool {
    fn name(&self) -> ToolName {
        ToolName::GetCustomerByAccount
    }

    fn description(&self) -> &str {
        "Get customer details by account number."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "accountNumber": {
                    "type": "string",
                    "description": "The account number to look up."
                }
            },
            "required": ["accountNumber"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let account_number = require_str(&params, "accountNumber")?;

        let customer_id = self
            .store
            .customer_id_by_account_number(account_number)
            .await
            .map_err(store_failure)?;
        let customer = match customer_id {
            Some(id) => self.store.get_customer(&id).await.map_err(store_failure)?,
            None => None,
        };

        Ok(ToolOutput::success(to_value(&customer)?, start.elapsed()))
    }
}

/// Finds customers by partial first or last name.
pub struct SearchCustomerByNameTool {
    store: Arc<dyn Database>,
}

impl SearchCustomerByNameTool {
    pub fn new(store: Arc<dyn Database>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SearchCustomerByNameTool {
    fn name(&self) -> ToolName {
        ToolName::SearchCustomerByName
    }

    fn description(&self) -> &str {
        "Search for customers by (partial) first or last name."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "The (partial) first or last name to search for."
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let name = require_str(&params, "name")?;
        let customers = self
            .store
            .search_customers_by_name(name)
            .await
            .map_err(store_failure)?;
        tracing::debug!(query = %name, matches = customers.len(), "Customer search");
        Ok(ToolOutput::success(to_value(&customers)?, start.elapsed()))
    }
}
