//! REST endpoints for login, registration and the current user's profile.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use serde::Deserialize;
use serde_json::{Value, json};

use super::jwt::{hash_password, verify_password};
use super::middleware::{AuthUser, require_auth};
use super::model::{NewUser, UserRole};
use crate::context::AppContext;
use crate::error::{ApiError, AuthError};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// POST /api/auth/login
async fn login(
    State(ctx): State<AppContext>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let (Some(login), Some(password)) = (non_empty(req.username), req.password) else {
        return Err(ApiError::BadRequest(
            "Username and password are required".to_string(),
        ));
    };

    let user = match ctx.store.user_by_username(&login).await? {
        Some(user) => Some(user),
        None => ctx.store.user_by_email(&login).await?,
    };
    let user = user
        .filter(|u| verify_password(&password, &u.password_hash))
        .ok_or_else(|| {
            tracing::info!(login = %login, "Rejected login");
            AuthError::InvalidCredentials
        })?;

    let token = ctx.jwt.issue(&user)?;
    tracing::info!(user = %user.username, "User logged in");
    Ok(Json(json!({
        "message": "Login successful",
        "user": user,
        "token": token,
    })))
}

/// POST /api/auth/register
async fn register(
    State(ctx): State<AppContext>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = payload?;
    let (Some(username), Some(email), Some(password)) = (
        non_empty(req.username),
        non_empty(req.email),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Username, email, and password are required".to_string(),
        ));
    };

    if ctx.store.user_by_username(&username).await?.is_some() {
        return Err(ApiError::Conflict("Username already exists".to_string()));
    }
    if ctx.store.user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    let new_user = NewUser {
        username,
        email,
        password_hash: hash_password(&password)?,
        first_name: non_empty(req.first_name),
        last_name: non_empty(req.last_name),
        role: UserRole::User,
    };
    let user = ctx.store.create_user(&new_user).await?;
    let token = ctx.jwt.issue(&user)?;

    tracing::info!(user = %user.username, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": user,
            "token": token,
        })),
    ))
}

/// GET /api/auth/profile
async fn profile(AuthUser(user): AuthUser) -> Json<Value> {
    Json(json!({ "user": user }))
}

/// POST /api/auth/logout
///
/// Tokens are stateless; the client discards its copy.
async fn logout() -> Json<Value> {
    Json(json!({ "message": "Logout successful" }))
}

/// Build the auth REST routes. Only `/profile` requires a token.
pub fn auth_routes(ctx: AppContext) -> Router {
    let protected = Router::new()
        .route("/api/auth/profile", get(profile))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), require_auth));

    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/logout", post(logout))
        .merge(protected)
        .with_state(ctx)
}
