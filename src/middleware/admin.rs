use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthSession;
use crate::access::AccessError;
use crate::app::AppState;
use crate::error::ApiError;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin authorization middleware. Runs after `jwt_auth_middleware` and
/// injects an `AdminContext` once the admin token checks out against the
/// current base session.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = request
        .extensions()
        .get::<AuthSession>()
        .cloned()
        .ok_or(AccessError::InvalidSessionToken)?;

    let admin_token = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let context = state.escalation.authorize(&session.0, admin_token).await?;
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}
