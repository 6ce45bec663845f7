// handlers/elevated/admin/session.rs - GET /admin/session handler

use axum::extract::Extension;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::access::AdminContext;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /admin/session - Describe the admin authority of this request
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "userId": "uuid",
///     "sessionId": "uuid",
///     "roles": ["system-admin"],
///     "accessRights": ["system:*"],
///     "expiresAt": "2025-01-01T00:15:00Z"
///   }
/// }
/// ```
pub async fn session(Extension(admin): Extension<AdminContext>) -> ApiResult<Value> {
    let claims = admin.claims;
    Ok(ApiResponse::success(json!({
        "userId": claims.sub,
        "sessionId": claims.sid,
        "roles": claims.roles,
        "accessRights": claims.rights,
        "expiresAt": DateTime::<Utc>::from_timestamp(claims.exp, 0),
    })))
}
