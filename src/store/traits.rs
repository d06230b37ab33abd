//! Unified `Database` trait: single async interface for all persistence.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::accounts::model::{Account, AccountStatus, NewAccount};
use crate::auth::model::{NewUser, User};
use crate::customers::model::{Customer, CustomerUpdate, NewCustomer};
use crate::error::DatabaseError;

/// Backend-agnostic database trait covering accounts, customers, and users.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Accounts ────────────────────────────────────────────────────

    /// Insert a new account under a freshly generated account number.
    async fn create_account(&self, account: &NewAccount) -> Result<Account, DatabaseError>;

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, DatabaseError>;

    async fn get_account_by_number(
        &self,
        account_number: &str,
    ) -> Result<Option<Account>, DatabaseError>;

    /// All accounts owned by a customer, oldest first.
    async fn accounts_by_customer(&self, customer_id: &str) -> Result<Vec<Account>, DatabaseError>;

    /// Every account, newest first.
    async fn all_accounts(&self) -> Result<Vec<Account>, DatabaseError>;

    /// Set the balance. `None` when the account does not exist.
    async fn update_account_balance(
        &self,
        id: Uuid,
        balance: Decimal,
    ) -> Result<Option<Account>, DatabaseError>;

    /// Set the status. `None` when the account does not exist.
    async fn update_account_status(
        &self,
        id: Uuid,
        status: AccountStatus,
    ) -> Result<Option<Account>, DatabaseError>;

    /// Owner of the account with this number.
    async fn customer_id_by_account_number(
        &self,
        account_number: &str,
    ) -> Result<Option<String>, DatabaseError>;

    // ── Customers ───────────────────────────────────────────────────

    /// Insert a new customer under a freshly generated id.
    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, DatabaseError>;

    async fn get_customer(&self, id: &str) -> Result<Option<Customer>, DatabaseError>;

    /// Every customer, newest first.
    async fn all_customers(&self) -> Result<Vec<Customer>, DatabaseError>;

    /// Active customers ordered by first then last name.
    async fn active_customers(&self) -> Result<Vec<Customer>, DatabaseError>;

    /// Apply a partial update. `None` when the customer does not exist.
    async fn update_customer(
        &self,
        id: &str,
        update: &CustomerUpdate,
    ) -> Result<Option<Customer>, DatabaseError>;

    /// Case-insensitive substring match on first or last name.
    async fn search_customers_by_name(&self, name: &str) -> Result<Vec<Customer>, DatabaseError>;

    // ── Users ───────────────────────────────────────────────────────

    async fn create_user(&self, user: &NewUser) -> Result<User, DatabaseError>;

    /// Active user by username.
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    /// Active user by email.
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    /// Active user by id.
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
}
