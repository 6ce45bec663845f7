pub mod password;
pub mod registry;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::database::models::DepartmentId;
use crate::types::PrincipalKind;

pub use registry::SessionRegistry;

const SESSION_TYP: &str = "session";
const ADMIN_TYP: &str = "admin";

/// Claims carried by the base session token. Everything beyond the
/// identifiers is a transient cache of the last computed session view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub sid: Uuid,
    pub typ: String,
    pub user_types: Vec<PrincipalKind>,
    pub department: Option<DepartmentId>,
    pub roles: BTreeSet<String>,
    pub rights: BTreeSet<String>,
    pub can_escalate: bool,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(user_id: Uuid, session_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            sid: session_id,
            typ: SESSION_TYP.to_string(),
            user_types: Vec::new(),
            department: None,
            roles: BTreeSet::new(),
            rights: BTreeSet::new(),
            can_escalate: false,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

/// Claims carried by the short-lived admin token. `sid` ties it to the
/// base session it was issued under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: Uuid,
    pub sid: Uuid,
    pub jti: Uuid,
    pub typ: String,
    pub roles: BTreeSet<String>,
    pub rights: BTreeSet<String>,
    pub iat: i64,
    pub exp: i64,
}

impl AdminClaims {
    pub fn new(user_id: Uuid, session_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            sid: session_id,
            jti: Uuid::new_v4(),
            typ: ADMIN_TYP.to_string(),
            roles: BTreeSet::new(),
            rights: BTreeSet::new(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("JWT generation error: {0}")]
    Generation(String),

    #[error("Invalid JWT secret configuration")]
    InvalidSecret,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Token issuance and verification, treated as an opaque service by the engine
pub trait TokenService: Send + Sync {
    fn issue_session_token(&self, claims: &SessionClaims) -> Result<String, TokenError>;

    fn issue_admin_token(&self, claims: &AdminClaims) -> Result<String, TokenError>;

    /// `grace` lets a token be accepted that long past its expiry
    fn verify_session_token(&self, token: &str, grace: Option<Duration>) -> Result<SessionClaims, TokenError>;

    fn verify_admin_token(&self, token: &str) -> Result<AdminClaims, TokenError>;
}

/// HS256 tokens; session and admin tokens use separate secrets
pub struct JwtTokenService {
    session_encoding: EncodingKey,
    session_decoding: DecodingKey,
    admin_encoding: EncodingKey,
    admin_decoding: DecodingKey,
}

impl JwtTokenService {
    pub fn new(session_secret: &str, admin_secret: &str) -> Result<Self, TokenError> {
        if session_secret.is_empty() || admin_secret.is_empty() || session_secret == admin_secret {
            return Err(TokenError::InvalidSecret);
        }

        Ok(Self {
            session_encoding: EncodingKey::from_secret(session_secret.as_bytes()),
            session_decoding: DecodingKey::from_secret(session_secret.as_bytes()),
            admin_encoding: EncodingKey::from_secret(admin_secret.as_bytes()),
            admin_decoding: DecodingKey::from_secret(admin_secret.as_bytes()),
        })
    }

    fn validation(leeway_secs: u64) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        validation
    }

    fn map_decode_error(e: jsonwebtoken::errors::Error) -> TokenError {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue_session_token(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.session_encoding)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    fn issue_admin_token(&self, claims: &AdminClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.admin_encoding)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    fn verify_session_token(&self, token: &str, grace: Option<Duration>) -> Result<SessionClaims, TokenError> {
        let leeway = grace.map(|g| g.num_seconds().max(0) as u64).unwrap_or(0);
        let claims = decode::<SessionClaims>(token, &self.session_decoding, &Self::validation(leeway))
            .map_err(Self::map_decode_error)?
            .claims;

        if claims.typ != SESSION_TYP {
            return Err(TokenError::Invalid("not a session token".to_string()));
        }
        Ok(claims)
    }

    fn verify_admin_token(&self, token: &str) -> Result<AdminClaims, TokenError> {
        let claims = decode::<AdminClaims>(token, &self.admin_decoding, &Self::validation(0))
            .map_err(Self::map_decode_error)?
            .claims;

        if claims.typ != ADMIN_TYP {
            return Err(TokenError::Invalid("not an admin token".to_string()));
        }
        Ok(claims)
    }
}
