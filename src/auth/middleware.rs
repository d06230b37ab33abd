//! Bearer-token guard for protected routes.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::model::User;
use crate::context::AppContext;
use crate::error::{ApiError, AuthError};

/// The authenticated user, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AuthError::MissingToken.into())
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Reject requests without a valid token for a still-active user.
pub async fn require_auth(
    State(ctx): State<AppContext>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req).ok_or(AuthError::MissingToken)?;
    let claims = ctx.jwt.validate(token)?;
    let user_id = claims.user_id()?;

    let user = ctx
        .store
        .user_by_id(user_id)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    tracing::debug!(user = %user.username, path = %req.uri().path(), "Authenticated request");
    req.extensions_mut().insert(AuthUser(user));
    Ok(next.run(req).await)
}
