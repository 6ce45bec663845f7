// handlers/public/root.rs - GET / and GET /health handlers

use axum::extract::State;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET / - Service descriptor
pub async fn root() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": "LearnHub Access",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Department role cascading, session views and admin escalation",
        "endpoints": {
            "public": "/auth/login, /auth/continue",
            "session": "/auth/switch-department, /auth/escalate, /auth/deescalate, /auth/logout (session token)",
            "roles": "/roles/me, /roles/me/department/:id (session token)",
            "admin": "/admin/session, /admin/roles/reload (session + X-Admin-Token)",
        }
    }))
}

/// GET /health - Store reachability and role catalog size
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": { "status": "ok", "timestamp": "...", "store": "ok", "roles": 5 }
/// }
/// ```
///
/// Responds 503 with `SERVICE_UNAVAILABLE` when the store does not answer.
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    if let Err(e) = state.departments.ping().await {
        tracing::warn!("health check failed: {}", e);
        return Err(ApiError::service_unavailable("Store unavailable"));
    }

    let catalog = state.catalog.snapshot().await;
    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "store": "ok",
        "roles": catalog.len(),
    })))
}
