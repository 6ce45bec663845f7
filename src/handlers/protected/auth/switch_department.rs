// handlers/protected/auth/switch_department.rs - POST /auth/switch-department handler

use axum::extract::{rejection::JsonRejection, Extension, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::access::DepartmentSwitch;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthSession};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchDepartmentRequest {
    pub department_id: Uuid,
}

/// POST /auth/switch-department - Make another department the active one
///
/// Re-resolves roles for the requested department only, remembers it as the
/// user's last selection and returns a session token pointing at it.
///
/// Expected Input:
/// ```json
/// { "departmentId": "uuid" }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "department": {
///       "departmentId": "uuid",
///       "roles": ["instructor"],
///       "accessRights": ["content:courses:read"],
///       "isDirectMember": false,
///       "inheritedFrom": "uuid",
///       "childDepartments": []
///     },
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "expiresAt": "2025-01-01T00:00:00Z"
///   }
/// }
/// ```
///
/// Errors: 403 `NOT_A_MEMBER` when no membership reaches the department.
pub async fn switch_department(
    State(state): State<AppState>,
    Extension(AuthSession(claims)): Extension<AuthSession>,
    payload: Result<Json<SwitchDepartmentRequest>, JsonRejection>,
) -> ApiResult<DepartmentSwitch> {
    let Json(payload) = payload?;
    let switched = state
        .sessions
        .switch_department(&claims, payload.department_id)
        .await?;
    Ok(ApiResponse::success(switched))
}
