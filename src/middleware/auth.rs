use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::access::AccessError;
use crate::app::AppState;
use crate::auth::{SessionClaims, TokenError};
use crate::error::ApiError;

/// Verified session claims, injected for protected handlers
#[derive(Clone, Debug)]
pub struct AuthSession(pub SessionClaims);

/// Session authentication middleware: the token must verify, be unexpired,
/// and belong to a session that has not been ended
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;

    let claims = state.tokens.verify_session_token(token, None).map_err(|e| match e {
        TokenError::Expired => AccessError::SessionExpired,
        _ => AccessError::InvalidSessionToken,
    })?;

    if !state.registry.is_session_live(claims.sid).await {
        return Err(AccessError::InvalidSession.into());
    }

    request.extensions_mut().insert(AuthSession(claims));
    Ok(next.run(request).await)
}

/// Extract the bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AccessError> {
    let auth_str = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AccessError::InvalidSessionToken)?
        .to_str()
        .map_err(|_| AccessError::InvalidSessionToken)?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AccessError::InvalidSessionToken),
    }
}
