// handlers/protected/auth/session.rs - POST /auth/logout handler

use axum::extract::{Extension, State};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthSession};

/// POST /auth/logout - End the session
///
/// Any admin token issued under the session stops working at once, and the
/// session token can no longer be continued.
///
/// Expected Output:
/// ```json
/// { "success": true, "data": { "loggedOut": true } }
/// ```
pub async fn logout(
    State(state): State<AppState>,
    Extension(AuthSession(claims)): Extension<AuthSession>,
) -> ApiResult<Value> {
    let ended = state.sessions.logout(&claims).await;
    Ok(ApiResponse::success(json!({ "loggedOut": ended })))
}
