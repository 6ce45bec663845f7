// handlers/public/auth/login.rs - POST /auth/login handler

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use serde::Deserialize;

use crate::access::IssuedSession;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// POST /auth/login - Authenticate and open a session
///
/// Verifies the password, then builds the full session view: every active
/// membership of every principal capacity, cascaded child departments, the
/// union of access rights, escalation eligibility and the default dashboard.
/// The selected department is the last one the user chose if it is still
/// reachable, otherwise the primary membership.
///
/// Expected Input:
/// ```json
/// {
///   "login": "string",      // Required
///   "password": "string"    // Required
/// }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "sessionId": "uuid",
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "expiresAt": "2025-01-01T00:00:00Z",
///     "session": {
///       "userId": "uuid",
///       "userTypes": ["staff"],
///       "departments": [ { "departmentId": "uuid", "roles": ["instructor"], "childDepartments": [] } ],
///       "allRoles": ["instructor"],
///       "allAccessRights": ["content:courses:read"],
///       "canEscalateToAdmin": false,
///       "defaultDashboard": "staff",
///       "selectedDepartment": "uuid"
///     }
///   }
/// }
/// ```
///
/// Errors: 401 `INVALID_CREDENTIALS` for an unknown login or wrong password,
/// 403 `INACTIVE_ACCOUNT` for a deactivated account with a correct password.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<IssuedSession> {
    let Json(payload) = payload?;
    let issued = state.sessions.login(&payload.login, &payload.password).await?;
    Ok(ApiResponse::success(issued))
}
