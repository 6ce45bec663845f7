// handlers/protected/roles/me.rs - GET /roles/me and GET /roles/me/department/:id handlers

use axum::extract::{rejection::PathRejection, Extension, Path, State};
use uuid::Uuid;

use crate::access::{DepartmentView, SessionView};
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthSession};

/// GET /roles/me - Current session view, recomputed from stored data
///
/// Same shape as the `session` object returned by login. Nothing is
/// reissued; clients that want a fresh token call `/auth/continue`.
pub async fn me(
    State(state): State<AppState>,
    Extension(AuthSession(claims)): Extension<AuthSession>,
) -> ApiResult<SessionView> {
    let view = state.sessions.current_view(&claims).await?;
    Ok(ApiResponse::success(view))
}

/// GET /roles/me/department/:id - Resolved roles for one department
///
/// Same department shape as `/auth/switch-department`, without changing the
/// remembered selection.
pub async fn department(
    State(state): State<AppState>,
    Extension(AuthSession(claims)): Extension<AuthSession>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<DepartmentView> {
    let Path(id) = id.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let view = state.sessions.resolve_department(claims.sub, id).await?;
    Ok(ApiResponse::success(view))
}
