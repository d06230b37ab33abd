//! HTTP router assembly.

use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::accounts::account_routes;
use crate::assistant::assistant_routes;
use crate::auth::auth_routes;
use crate::context::AppContext;
use crate::customers::customer_routes;

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "message": "Account service is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Merge every feature router under one app with CORS and request tracing.
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth_routes(ctx.clone()))
        .merge(customer_routes(ctx.clone()))
        .merge(account_routes(ctx.clone()))
        .merge(assistant_routes(ctx))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
