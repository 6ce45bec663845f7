use thiserror::Error;
use uuid::Uuid;

use crate::auth::TokenError;
use crate::database::StoreError;
use crate::types::PrincipalKind;

/// Failures of the access engine and the session/escalation protocols
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is inactive")]
    InactiveAccount,

    #[error("Not a member of department {0}")]
    NotAMember(Uuid),

    #[error("Role '{0}' is not in the role catalog")]
    UnknownRole(String),

    #[error("Role '{role}' belongs to {expected} principals, found on a {found} membership")]
    RoleKindMismatch {
        role: String,
        expected: PrincipalKind,
        found: PrincipalKind,
    },

    #[error("Department ancestry starting at {start} did not terminate within {limit} steps")]
    DepartmentCycle { start: Uuid, limit: usize },

    #[error("Department {0} does not exist")]
    UnknownDepartment(Uuid),

    #[error("Invalid escalation password")]
    InvalidEscalationPassword,

    #[error("Escalation is not available for this session")]
    EscalationIneligible,

    #[error("Admin token required")]
    AdminTokenRequired,

    #[error("Admin role '{0}' required")]
    InsufficientAdminRole(String),

    #[error("Admin session is no longer valid")]
    AdminSessionStale,

    #[error("Session is invalid or has ended")]
    InvalidSession,

    #[error("Session token expired")]
    SessionExpired,

    #[error("Missing or malformed session token")]
    InvalidSessionToken,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl AccessError {
    /// Stable machine-readable code surfaced to clients
    pub fn error_code(&self) -> &'static str {
        match self {
            AccessError::InvalidCredentials => "INVALID_CREDENTIALS",
            AccessError::InactiveAccount => "INACTIVE_ACCOUNT",
            AccessError::NotAMember(_) => "NOT_A_MEMBER",
            AccessError::UnknownRole(_) => "UNKNOWN_ROLE",
            AccessError::RoleKindMismatch { .. } => "ROLE_KIND_MISMATCH",
            AccessError::DepartmentCycle { .. } => "DEPARTMENT_CYCLE",
            // Reported like a membership failure so department ids can't be probed
            AccessError::UnknownDepartment(_) => "NOT_A_MEMBER",
            AccessError::InvalidEscalationPassword => "INVALID_ESCALATION_PASSWORD",
            AccessError::EscalationIneligible => "ESCALATION_INELIGIBLE",
            AccessError::AdminTokenRequired => "ADMIN_TOKEN_REQUIRED",
            AccessError::InsufficientAdminRole(_) => "INSUFFICIENT_ADMIN_ROLE",
            AccessError::AdminSessionStale => "ADMIN_SESSION_STALE",
            AccessError::InvalidSession => "INVALID_SESSION",
            AccessError::SessionExpired => "SESSION_EXPIRED",
            AccessError::InvalidSessionToken => "INVALID_SESSION_TOKEN",
            AccessError::Store(_) => "INTERNAL_SERVER_ERROR",
            AccessError::Token(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            AccessError::InvalidCredentials
            | AccessError::InvalidEscalationPassword
            | AccessError::EscalationIneligible
            | AccessError::AdminTokenRequired
            | AccessError::AdminSessionStale
            | AccessError::InvalidSession
            | AccessError::SessionExpired
            | AccessError::InvalidSessionToken => 401,
            AccessError::InactiveAccount
            | AccessError::NotAMember(_)
            | AccessError::UnknownDepartment(_)
            | AccessError::InsufficientAdminRole(_) => 403,
            AccessError::UnknownRole(_)
            | AccessError::RoleKindMismatch { .. }
            | AccessError::DepartmentCycle { .. }
            | AccessError::Store(_)
            | AccessError::Token(_) => 500,
        }
    }

    /// Server-side data or infrastructure faults, as opposed to caller mistakes
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }

    /// Message safe to show the caller
    pub fn client_message(&self) -> String {
        match self {
            AccessError::NotAMember(_) | AccessError::UnknownDepartment(_) => {
                "You do not have access to this department".to_string()
            }
            AccessError::EscalationIneligible | AccessError::InvalidEscalationPassword => {
                "Escalation denied".to_string()
            }
            AccessError::InsufficientAdminRole(role) => format!("Admin role '{}' required", role),
            e if e.is_internal() => "An error occurred while resolving access".to_string(),
            e => e.to_string(),
        }
    }
}

pub type AccessResult<T> = Result<T, AccessError>;
