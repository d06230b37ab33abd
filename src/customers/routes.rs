//! REST endpoints for customers. All routes require a bearer token.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router, middleware};

use super::model::{Customer, CustomerUpdate, NewCustomer};
use crate::auth::require_auth;
use crate::context::AppContext;
use crate::error::ApiError;

fn not_found() -> ApiError {
    ApiError::NotFound("Customer not found".to_string())
}

/// GET /api/customers
async fn list_customers(State(ctx): State<AppContext>) -> Result<Json<Vec<Customer>>, ApiError> {
    Ok(Json(ctx.store.all_customers().await?))
}

/// GET /api/customers/active
async fn list_active(State(ctx): State<AppContext>) -> Result<Json<Vec<Customer>>, ApiError> {
    Ok(Json(ctx.store.active_customers().await?))
}

/// POST /api/customers
async fn create_customer(
    State(ctx): State<AppContext>,
    payload: Result<Json<NewCustomer>, JsonRejection>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let Json(mut new) = payload?;
    new.first_name = new.first_name.trim().to_string();
    new.last_name = new.last_name.trim().to_string();
    if new.first_name.is_empty() || new.last_name.is_empty() {
        return Err(ApiError::BadRequest(
            "First name and last name are required".to_string(),
        ));
    }

    let customer = ctx.store.create_customer(&new).await?;
    tracing::info!(customer_id = %customer.id, "Customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /api/customers/{id}
async fn get_customer(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    ctx.store
        .get_customer(&id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// PUT /api/customers/{id}
///
/// Partial update: absent fields keep their stored values.
async fn update_customer(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    payload: Result<Json<CustomerUpdate>, JsonRejection>,
) -> Result<Json<Customer>, ApiError> {
    let Json(update) = payload?;
    let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
    if blank(&update.first_name) || blank(&update.last_name) {
        return Err(ApiError::BadRequest(
            "First name and last name cannot be empty".to_string(),
        ));
    }

    let customer = ctx
        .store
        .update_customer(&id, &update)
        .await?
        .ok_or_else(not_found)?;
    tracing::info!(customer_id = %customer.id, "Customer updated");
    Ok(Json(customer))
}

/// Build the customer REST routes.
pub fn customer_routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/api/customers", get(list_customers).post(create_customer))
        .route("/api/customers/active", get(list_active))
        .route(
            "/api/customers/{id}",
            get(get_customer).put(update_customer),
        )
        .route_layer(middleware::from_fn_with_state(ctx.clone(), require_auth))
        .with_state(ctx)
}
