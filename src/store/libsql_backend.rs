//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. Timestamps are stored as
//! RFC 3339 text with microsecond precision so lexical order is time order.
//! Balances are stored as decimal strings.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::accounts::model::{Account, AccountStatus, AccountType, NewAccount};
use crate::auth::model::{NewUser, User, UserRole};
use crate::customers::model::{Customer, CustomerStatus, CustomerUpdate, NewCustomer};
use crate::error::DatabaseError;
use crate::store::codes::{MAX_ATTEMPTS, generate_code};
use crate::store::migrations;
use crate::store::traits::Database;

const ACCOUNT_COLUMNS: &str =
    "id, account_number, account_type, balance, currency, customer_id, status, created_at, updated_at";

const CUSTOMER_COLUMNS: &str =
    "id, first_name, last_name, email, phone, address, date_of_birth, status, created_at, updated_at";

const USER_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, role, is_active, created_at, updated_at";

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    _db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            _db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn query_accounts(
        &self,
        op: &str,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Account>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;

        let mut accounts = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("{op} row: {e}")))?
        {
            accounts.push(row_to_account(&row)?);
        }
        Ok(accounts)
    }

    async fn query_customers(
        &self,
        op: &str,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Customer>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;

        let mut customers = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("{op} row: {e}")))?
        {
            customers.push(row_to_customer(&row)?);
        }
        Ok(customers)
    }

    async fn query_user(
        &self,
        op: &str,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Option<User>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_user(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("{op} row: {e}"))),
        }
    }

    /// Pick an account number that is not in use yet.
    async fn unused_account_number(&self) -> Result<String, DatabaseError> {
        for _ in 0..MAX_ATTEMPTS {
            let candidate = generate_code();
            if self.get_account_by_number(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(DatabaseError::Query(
            "Unable to generate unique account number".to_string(),
        ))
    }

    /// Pick a customer id that is not in use yet.
    async fn unused_customer_id(&self) -> Result<String, DatabaseError> {
        for _ in 0..MAX_ATTEMPTS {
            let candidate = generate_code();
            if self.get_customer(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(DatabaseError::Query(
            "Unable to generate unique customer ID".to_string(),
        ))
    }
}

// ── Helper functions ────────────────────────────────────────────────

fn now_str() -> String {
    format_datetime(Utc::now())
}

fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Map a write failure, surfacing unique-constraint violations distinctly.
fn write_error(op: &str, e: libsql::Error) -> DatabaseError {
    let message = e.to_string();
    if message.contains("UNIQUE constraint failed") {
        DatabaseError::Constraint(message)
    } else {
        DatabaseError::Query(format!("{op}: {message}"))
    }
}

/// Escape LIKE wildcards so user input matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Map a libsql Row to an Account. Column order matches ACCOUNT_COLUMNS.
fn row_to_account(row: &libsql::Row) -> Result<Account, DatabaseError> {
    let field = |name: &str, e: libsql::Error| DatabaseError::Query(format!("account.{name}: {e}"));

    let id_str: String = row.get(0).map_err(|e| field("id", e))?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| DatabaseError::Serialization(format!("account.id parse: {e}")))?;
    let account_number: String = row.get(1).map_err(|e| field("account_number", e))?;
    let type_str: String = row.get(2).map_err(|e| field("account_type", e))?;
    let account_type = AccountType::from_str(&type_str).map_err(DatabaseError::Serialization)?;
    let balance_str: String = row.get(3).map_err(|e| field("balance", e))?;
    let balance = Decimal::from_str(&balance_str)
        .map_err(|e| DatabaseError::Serialization(format!("account.balance parse: {e}")))?;
    let currency: String = row.get(4).unwrap_or_else(|_| "USD".to_string());
    let customer_id: String = row.get(5).map_err(|e| field("customer_id", e))?;
    let status_str: String = row.get(6).unwrap_or_else(|_| "active".to_string());
    let status = AccountStatus::from_str(&status_str).unwrap_or_default();
    let created_str: String = row.get(7).map_err(|e| field("created_at", e))?;
    let updated_str: String = row.get(8).map_err(|e| field("updated_at", e))?;

    Ok(Account {
        id,
        account_number,
        account_type,
        balance,
        currency,
        customer_id,
        status,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

/// Map a libsql Row to a Customer. Column order matches CUSTOMER_COLUMNS.
fn row_to_customer(row: &libsql::Row) -> Result<Customer, DatabaseError> {
    let field = |name: &str, e: libsql::Error| DatabaseError::Query(format!("customer.{name}: {e}"));

    let id: String = row.get(0).map_err(|e| field("id", e))?;
    let first_name: String = row.get(1).map_err(|e| field("first_name", e))?;
    let last_name: String = row.get(2).map_err(|e| field("last_name", e))?;
    let email: Option<String> = row.get(3).ok();
    let phone: Option<String> = row.get(4).ok();
    let address: Option<String> = row.get(5).ok();
    let dob_str: Option<String> = row.get(6).ok();
    let date_of_birth = dob_str
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok());
    let status_str: String = row.get(7).unwrap_or_else(|_| "active".to_string());
    let status = CustomerStatus::from_str(&status_str).unwrap_or_default();
    let created_str: String = row.get(8).map_err(|e| field("created_at", e))?;
    let updated_str: String = row.get(9).map_err(|e| field("updated_at", e))?;

    Ok(Customer {
        id,
        first_name,
        last_name,
        email,
        phone,
        address,
        date_of_birth,
        status,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

/// Map a libsql Row to a User. Column order matches USER_COLUMNS.
fn row_to_user(row: &libsql::Row) -> Result<User, DatabaseError> {
    let field = |name: &str, e: libsql::Error| DatabaseError::Query(format!("user.{name}: {e}"));

    let id_str: String = row.get(0).map_err(|e| field("id", e))?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| DatabaseError::Serialization(format!("user.id parse: {e}")))?;
    let role_str: String = row.get(6).unwrap_or_else(|_| "user".to_string());
    let is_active: i64 = row.get(7).unwrap_or(1);
    let created_str: String = row.get(8).map_err(|e| field("created_at", e))?;
    let updated_str: String = row.get(9).map_err(|e| field("updated_at", e))?;

    Ok(User {
        id,
        username: row.get(1).map_err(|e| field("username", e))?,
        email: row.get(2).map_err(|e| field("email", e))?,
        password_hash: row.get(3).map_err(|e| field("password_hash", e))?,
        first_name: row.get(4).ok(),
        last_name: row.get(5).ok(),
        role: UserRole::from_str(&role_str).unwrap_or_default(),
        is_active: is_active != 0,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Accounts ────────────────────────────────────────────────────

    async fn create_account(&self, account: &NewAccount) -> Result<Account, DatabaseError> {
        let id = Uuid::new_v4();
        let account_number = self.unused_account_number().await?;
        let now = now_str();

        self.conn()
            .execute(
                "INSERT INTO accounts (id, account_number, account_type, balance, currency, customer_id, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    id.to_string(),
                    account_number.as_str(),
                    account.account_type.as_str(),
                    account.balance.to_string(),
                    account.currency.as_str(),
                    account.customer_id.as_str(),
                    account.status.as_str(),
                    now,
                ],
            )
            .await
            .map_err(|e| write_error("create_account", e))?;

        debug!(%id, account_number = %account_number, "Account created");
        self.get_account(id).await?.ok_or_else(|| DatabaseError::NotFound {
            entity: "Account".to_string(),
            id: id.to_string(),
        })
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, DatabaseError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1");
        Ok(self
            .query_accounts("get_account", &sql, params![id.to_string()])
            .await?
            .into_iter()
            .next())
    }

    async fn get_account_by_number(
        &self,
        account_number: &str,
    ) -> Result<Option<Account>, DatabaseError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_number = ?1");
        Ok(self
            .query_accounts("get_account_by_number", &sql, params![account_number])
            .await?
            .into_iter()
            .next())
    }

    async fn accounts_by_customer(&self, customer_id: &str) -> Result<Vec<Account>, DatabaseError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE customer_id = ?1 ORDER BY created_at ASC, rowid ASC"
        );
        self.query_accounts("accounts_by_customer", &sql, params![customer_id])
            .await
    }

    async fn all_accounts(&self) -> Result<Vec<Account>, DatabaseError> {
        let sql =
            format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at DESC, rowid DESC");
        self.query_accounts("all_accounts", &sql, ()).await
    }

    async fn update_account_balance(
        &self,
        id: Uuid,
        balance: Decimal,
    ) -> Result<Option<Account>, DatabaseError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE accounts SET balance = ?1, updated_at = ?2 WHERE id = ?3",
                params![balance.to_string(), now_str(), id.to_string()],
            )
            .await
            .map_err(|e| write_error("update_account_balance", e))?;

        if changed == 0 {
            return Ok(None);
        }
        debug!(%id, %balance, "Account balance updated");
        self.get_account(id).await
    }

    async fn update_account_status(
        &self,
        id: Uuid,
        status: AccountStatus,
    ) -> Result<Option<Account>, DatabaseError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE accounts SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now_str(), id.to_string()],
            )
            .await
            .map_err(|e| write_error("update_account_status", e))?;

        if changed == 0 {
            return Ok(None);
        }
        debug!(%id, status = status.as_str(), "Account status updated");
        self.get_account(id).await
    }

    async fn customer_id_by_account_number(
        &self,
        account_number: &str,
    ) -> Result<Option<String>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT customer_id FROM accounts WHERE account_number = ?1",
                params![account_number],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("customer_id_by_account_number: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<String>(0).ok()),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!(
                "customer_id_by_account_number row: {e}"
            ))),
        }
    }

    // ── Customers ───────────────────────────────────────────────────

    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, DatabaseError> {
        let id = self.unused_customer_id().await?;
        let now = now_str();

        self.conn()
            .execute(
                "INSERT INTO customers (id, first_name, last_name, email, phone, address, date_of_birth, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                params![
                    id.as_str(),
                    customer.first_name.as_str(),
                    customer.last_name.as_str(),
                    customer.email.clone(),
                    customer.phone.clone(),
                    customer.address.clone(),
                    customer.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
                    customer.status.as_str(),
                    now,
                ],
            )
            .await
            .map_err(|e| write_error("create_customer", e))?;

        debug!(id = %id, "Customer created");
        self.get_customer(&id).await?.ok_or(DatabaseError::NotFound {
            entity: "Customer".to_string(),
            id,
        })
    }

    async fn get_customer(&self, id: &str) -> Result<Option<Customer>, DatabaseError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
        Ok(self
            .query_customers("get_customer", &sql, params![id])
            .await?
            .into_iter()
            .next())
    }

    async fn all_customers(&self) -> Result<Vec<Customer>, DatabaseError> {
        let sql =
            format!("SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY created_at DESC, rowid DESC");
        self.query_customers("all_customers", &sql, ()).await
    }

    async fn active_customers(&self) -> Result<Vec<Customer>, DatabaseError> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE status = 'active' ORDER BY first_name, last_name"
        );
        self.query_customers("active_customers", &sql, ()).await
    }

    async fn update_customer(
        &self,
        id: &str,
        update: &CustomerUpdate,
    ) -> Result<Option<Customer>, DatabaseError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE customers SET
                    first_name = COALESCE(?1, first_name),
                    last_name = COALESCE(?2, last_name),
                    email = COALESCE(?3, email),
                    phone = COALESCE(?4, phone),
                    address = COALESCE(?5, address),
                    date_of_birth = COALESCE(?6, date_of_birth),
                    status = COALESCE(?7, status),
                    updated_at = ?8
                 WHERE id = ?9",
                params![
                    update.first_name.clone(),
                    update.last_name.clone(),
                    update.email.clone(),
                    update.phone.clone(),
                    update.address.clone(),
                    update.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
                    update.status.map(|s| s.as_str().to_string()),
                    now_str(),
                    id,
                ],
            )
            .await
            .map_err(|e| write_error("update_customer", e))?;

        if changed == 0 {
            return Ok(None);
        }
        debug!(id = %id, "Customer updated");
        self.get_customer(id).await
    }

    async fn search_customers_by_name(&self, name: &str) -> Result<Vec<Customer>, DatabaseError> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers
             WHERE LOWER(first_name) LIKE LOWER(?1) ESCAPE '\\'
                OR LOWER(last_name) LIKE LOWER(?1) ESCAPE '\\'
             ORDER BY first_name, last_name"
        );
        self.query_customers("search_customers_by_name", &sql, params![like_pattern(name)])
            .await
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn create_user(&self, user: &NewUser) -> Result<User, DatabaseError> {
        let id = Uuid::new_v4();
        let now = now_str();

        self.conn()
            .execute(
                "INSERT INTO users (id, username, email, password_hash, first_name, last_name, role, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)",
                params![
                    id.to_string(),
                    user.username.as_str(),
                    user.email.as_str(),
                    user.password_hash.as_str(),
                    user.first_name.clone(),
                    user.last_name.clone(),
                    user.role.as_str(),
                    now,
                ],
            )
            .await
            .map_err(|e| write_error("create_user", e))?;

        info!(%id, username = %user.username, "User created");
        self.user_by_id(id).await?.ok_or_else(|| DatabaseError::NotFound {
            entity: "User".to_string(),
            id: id.to_string(),
        })
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1 AND is_active = 1");
        self.query_user("user_by_username", &sql, params![username]).await
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 AND is_active = 1");
        self.query_user("user_by_email", &sql, params![email]).await
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND is_active = 1");
        self.query_user("user_by_id", &sql, params![id.to_string()]).await
    }
}
