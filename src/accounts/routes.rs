//! REST endpoints for accounts. All routes require a bearer token.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router, middleware};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::model::{Account, AccountStatus, AccountType, NewAccount};
use crate::auth::require_auth;
use crate::context::AppContext;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub account_type: Option<String>,
    pub customer_id: Option<String>,
    pub balance: Option<Decimal>,
    pub currency: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BalanceRequest {
    pub balance: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusRequest {
    pub status: Option<String>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Account not found".to_string())
}

/// Account ids are UUIDs; anything else cannot name an account.
fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| not_found())
}

fn parse_status(raw: &str) -> Result<AccountStatus, ApiError> {
    raw.parse().map_err(ApiError::BadRequest)
}

/// GET /api/accounts
async fn list_accounts(State(ctx): State<AppContext>) -> Result<Json<Vec<Account>>, ApiError> {
    Ok(Json(ctx.store.all_accounts().await?))
}

/// POST /api/accounts
///
/// The account number is always generated server-side.
async fn create_account(
    State(ctx): State<AppContext>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let Json(req) = payload?;
    let (Some(account_type), Some(customer_id)) = (
        req.account_type.filter(|t| !t.trim().is_empty()),
        req.customer_id.filter(|c| !c.trim().is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Account type and customer ID are required".to_string(),
        ));
    };

    let account_type: AccountType = account_type.trim().parse().map_err(ApiError::BadRequest)?;
    let balance = req.balance.unwrap_or(Decimal::ZERO);
    if balance < Decimal::ZERO {
        return Err(ApiError::BadRequest(
            "Initial balance cannot be negative".to_string(),
        ));
    }

    if ctx.store.get_customer(&customer_id).await?.is_none() {
        return Err(ApiError::BadRequest("Customer not found".to_string()));
    }

    let mut new = NewAccount::new(customer_id, account_type).with_balance(balance);
    if let Some(currency) = req.currency.filter(|c| !c.trim().is_empty()) {
        new = new.with_currency(currency.trim().to_uppercase());
    }
    if let Some(status) = req.status {
        new.status = parse_status(&status)?;
    }

    let account = ctx.store.create_account(&new).await?;
    tracing::info!(
        account_number = %account.account_number,
        customer_id = %account.customer_id,
        "Account created"
    );
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /api/accounts/number/{account_number}
async fn get_by_number(
    State(ctx): State<AppContext>,
    Path(account_number): Path<String>,
) -> Result<Json<Account>, ApiError> {
    ctx.store
        .get_account_by_number(&account_number)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// GET /api/accounts/{id}
async fn get_account(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<Account>, ApiError> {
    let id = parse_id(&id)?;
    ctx.store.get_account(id).await?.map(Json).ok_or_else(not_found)
}

/// GET /api/accounts/customer/{customer_id}
async fn by_customer(
    State(ctx): State<AppContext>,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<Account>>, ApiError> {
    Ok(Json(ctx.store.accounts_by_customer(&customer_id).await?))
}

/// PATCH /api/accounts/{id}/balance
async fn update_balance(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    payload: Result<Json<BalanceRequest>, JsonRejection>,
) -> Result<Json<Account>, ApiError> {
    let Json(req) = payload?;
    let balance = req
        .balance
        .ok_or_else(|| ApiError::BadRequest("Balance is required".to_string()))?;
    let id = parse_id(&id)?;

    let account = ctx
        .store
        .update_account_balance(id, balance)
        .await?
        .ok_or_else(not_found)?;
    tracing::info!(account_id = %account.id, balance = %account.balance, "Balance updated");
    Ok(Json(account))
}

/// PATCH /api/accounts/{id}/status
async fn update_status(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<Account>, ApiError> {
    let Json(req) = payload?;
    let status = req
        .status
        .ok_or_else(|| ApiError::BadRequest("Status is required".to_string()))?;
    let status = parse_status(&status)?;
    let id = parse_id(&id)?;

    let account = ctx
        .store
        .update_account_status(id, status)
        .await?
        .ok_or_else(not_found)?;
    tracing::info!(account_id = %account.id, status = status.as_str(), "Status updated");
    Ok(Json(account))
}

/// Build the account REST routes.
pub fn account_routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/api/accounts", get(list_accounts).post(create_account))
        .route("/api/accounts/number/{account_number}", get(get_by_number))
        .route("/api/accounts/customer/{customer_id}", get(by_customer))
        .route("/api/accounts/{id}", get(get_account))
        .route("/api/accounts/{id}/balance", patch(update_balance))
        .route("/api/accounts/{id}/status", patch(update_status))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), require_auth))
        .with_state(ctx)
}
