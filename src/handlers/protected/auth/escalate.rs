// handlers/protected/auth/escalate.rs - POST /auth/escalate and POST /auth/deescalate handlers

use axum::extract::{rejection::JsonRejection, Extension, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::access::AdminSession;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthSession};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalateRequest {
    pub escalation_password: String,
}

/// POST /auth/escalate - Obtain a short-lived admin token
///
/// Only users holding an active global-admin membership may escalate; that
/// is checked before the escalation password. The admin token is tied to the
/// current session and must be sent as `X-Admin-Token` on `/admin/*` routes.
///
/// Expected Input:
/// ```json
/// { "escalationPassword": "string" }
/// ```
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "adminToken": "eyJhbGciOiJIUzI1NiI...",
///     "expiresAt": "2025-01-01T00:15:00Z",
///     "roles": ["system-admin"],
///     "accessRights": ["system:*"]
///   }
/// }
/// ```
///
/// Errors: 401 `ESCALATION_INELIGIBLE`, 401 `INVALID_ESCALATION_PASSWORD`.
pub async fn escalate(
    State(state): State<AppState>,
    Extension(AuthSession(claims)): Extension<AuthSession>,
    payload: Result<Json<EscalateRequest>, JsonRejection>,
) -> ApiResult<AdminSession> {
    let Json(payload) = payload?;
    let admin = state
        .escalation
        .escalate(&claims, &payload.escalation_password)
        .await?;
    Ok(ApiResponse::success(admin))
}

/// POST /auth/deescalate - Drop admin authority, keep the session
///
/// Idempotent: calling it without an admin token outstanding succeeds too.
///
/// Expected Output:
/// ```json
/// { "success": true, "data": { "revoked": 1 } }
/// ```
pub async fn deescalate(
    State(state): State<AppState>,
    Extension(AuthSession(claims)): Extension<AuthSession>,
) -> ApiResult<Value> {
    let revoked = state.escalation.deescalate(&claims).await;
    Ok(ApiResponse::success(json!({ "revoked": revoked })))
}
