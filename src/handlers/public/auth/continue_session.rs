// handlers/public/auth/continue_session.rs - POST /auth/continue handler

use axum::extract::State;
use axum::http::HeaderMap;

use crate::access::ContinuedSession;
use crate::app::AppState;
use crate::middleware::{extract_bearer_token, ApiResponse, ApiResult};

/// POST /auth/continue - Refresh a session and report what changed
///
/// Public because the presented session token may already be expired; it is
/// accepted within the configured grace window as long as the session was not
/// ended by logout. The view is recomputed from current data and compared
/// with the roles and rights recorded in the presented token.
///
/// Expected Input: `Authorization: Bearer <session token>`
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "sessionId": "uuid",
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "expiresAt": "2025-01-01T00:00:00Z",
///     "session": { ... },
///     "changes": {
///       "rolesAdded": [], "rolesRemoved": [],
///       "rightsAdded": [], "rightsRemoved": []
///     }
///   }
/// }
/// ```
pub async fn continue_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<ContinuedSession> {
    let token = extract_bearer_token(&headers)?;
    let continued = state.sessions.continue_session(token).await?;
    Ok(ApiResponse::success(continued))
}
