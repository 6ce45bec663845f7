// handlers/elevated/admin/roles.rs - POST /admin/roles/reload handler

use axum::extract::{Extension, State};
use serde_json::{json, Value};
use tracing::info;

use crate::access::AdminContext;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};

const RELOAD_ROLE: &str = "system-admin";

/// POST /admin/roles/reload - Reload the role catalog from its source
///
/// Requires the `system-admin` role. The new catalog is validated before it
/// replaces the current one; on failure the current catalog stays in place.
///
/// Expected Output:
/// ```json
/// { "success": true, "data": { "roles": 12 } }
/// ```
pub async fn reload_roles(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
) -> ApiResult<Value> {
    admin.require_role(RELOAD_ROLE)?;

    let count = state.catalog.reload(state.role_source.as_ref()).await?;
    info!(target: "audit", user = %admin.claims.sub, roles = count, "role catalog reloaded");
    Ok(ApiResponse::success(json!({ "roles": count })))
}
