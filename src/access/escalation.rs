//! Admin escalation.
//!
//! A global-admin user holding a live base session can trade a second
//! password for a short-lived admin token. The admin token is bound to the
//! base session: ending that session, de-escalating, or losing the
//! global-admin membership all stale it, whatever its own expiry says.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::aggregator::{rights_permit, AccessRightAggregator, RightSet};
use super::error::{AccessError, AccessResult};
use crate::auth::{AdminClaims, SessionClaims, SessionRegistry, TokenError, TokenService};
use crate::database::models::{DepartmentId, DepartmentMembership};
use crate::database::{CredentialStore, PrincipalStore};
use crate::types::PrincipalKind;

/// Global-admin roles that count toward escalation, from active memberships.
/// With a master department set, only memberships held there count.
pub fn escalation_roles<'a>(
    memberships: impl IntoIterator<Item = &'a DepartmentMembership>,
    master: Option<DepartmentId>,
) -> BTreeSet<String> {
    memberships
        .into_iter()
        .filter(|m| master.map_or(true, |master| m.department_id == master))
        .flat_map(|m| m.roles.iter().cloned())
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSession {
    pub admin_token: String,
    pub expires_at: DateTime<Utc>,
    pub roles: BTreeSet<String>,
    pub access_rights: RightSet,
}

/// Verified admin authority for one request
#[derive(Debug, Clone)]
pub struct AdminContext {
    pub claims: AdminClaims,
}

impl AdminContext {
    pub fn require_role(&self, role: &str) -> AccessResult<()> {
        if self.claims.roles.contains(role) {
            Ok(())
        } else {
            Err(AccessError::InsufficientAdminRole(role.to_string()))
        }
    }

    pub fn require_right(&self, right: &str) -> AccessResult<()> {
        if rights_permit(&self.claims.rights, right) {
            Ok(())
        } else {
            Err(AccessError::InsufficientAdminRole(right.to_string()))
        }
    }
}

#[derive(Clone)]
pub struct EscalationManager {
    aggregator: AccessRightAggregator,
    principals: Arc<dyn PrincipalStore>,
    credentials: Arc<dyn CredentialStore>,
    tokens: Arc<dyn TokenService>,
    registry: SessionRegistry,
    admin_ttl: Duration,
    master_department: Option<DepartmentId>,
}

impl EscalationManager {
    pub fn new(
        aggregator: AccessRightAggregator,
        principals: Arc<dyn PrincipalStore>,
        credentials: Arc<dyn CredentialStore>,
        tokens: Arc<dyn TokenService>,
        registry: SessionRegistry,
        admin_ttl: Duration,
    ) -> Self {
        Self {
            aggregator,
            principals,
            credentials,
            tokens,
            registry,
            admin_ttl,
            master_department: None,
        }
    }

    /// Only count global-admin memberships held in this department
    pub fn with_master_department(mut self, department: Option<DepartmentId>) -> Self {
        self.master_department = department;
        self
    }

    /// Current global-admin roles of `user_id`; empty means ineligible
    async fn admin_roles(&self, user_id: Uuid) -> AccessResult<BTreeSet<String>> {
        let memberships = self
            .principals
            .active_memberships(user_id, PrincipalKind::GlobalAdmin)
            .await?;

        Ok(escalation_roles(&memberships, self.master_department))
    }

    /// Issue an admin token for the session in `session`.
    ///
    /// Eligibility is checked before the password, so a user without a
    /// global-admin membership learns nothing about the escalation secret.
    pub async fn escalate(&self, session: &SessionClaims, password: &str) -> AccessResult<AdminSession> {
        if !self.registry.is_session_live(session.sid).await {
            return Err(AccessError::InvalidSession);
        }

        let roles = self.admin_roles(session.sub).await?;
        if roles.is_empty() {
            warn!(target: "audit", user = %session.sub, "escalation refused: not a global admin");
            return Err(AccessError::EscalationIneligible);
        }

        if !self
            .credentials
            .verify_escalation_password(session.sub, password)
            .await?
        {
            warn!(target: "audit", user = %session.sub, "escalation refused: bad password");
            return Err(AccessError::InvalidEscalationPassword);
        }

        let catalog = self.aggregator.snapshot().await;
        let access_rights =
            AccessRightAggregator::expand_roles_for_kind(&catalog, PrincipalKind::GlobalAdmin, &roles)?;

        let mut claims = AdminClaims::new(session.sub, session.sid, self.admin_ttl);
        claims.roles = roles.clone();
        claims.rights = access_rights.clone();
        let admin_token = self.tokens.issue_admin_token(&claims)?;
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
        self.registry
            .register_admin_token(claims.jti, session.sid, expires_at)
            .await;

        info!(target: "audit", user = %session.sub, session = %session.sid, ?roles, "admin session opened");
        Ok(AdminSession {
            admin_token,
            expires_at,
            roles,
            access_rights,
        })
    }

    /// Check an admin token presented alongside `session`
    pub async fn authorize(
        &self,
        session: &SessionClaims,
        admin_token: Option<&str>,
    ) -> AccessResult<AdminContext> {
        let token = admin_token.ok_or(AccessError::AdminTokenRequired)?;
        let claims = self.tokens.verify_admin_token(token).map_err(|e| match e {
            TokenError::Expired => AccessError::AdminSessionStale,
            _ => AccessError::AdminTokenRequired,
        })?;

        if claims.sub != session.sub || claims.sid != session.sid {
            warn!(target: "audit", user = %session.sub, "admin token presented under another session");
            return Err(AccessError::AdminTokenRequired);
        }
        if !self.registry.is_admin_token_live(claims.jti).await {
            return Err(AccessError::AdminSessionStale);
        }
        if self.admin_roles(session.sub).await?.is_empty() {
            warn!(target: "audit", user = %session.sub, "admin token held after global-admin access was removed");
            self.registry.revoke_admin_tokens(session.sid).await;
            return Err(AccessError::AdminSessionStale);
        }

        Ok(AdminContext { claims })
    }

    /// Drop admin authority, keeping the base session. Safe to repeat.
    pub async fn deescalate(&self, session: &SessionClaims) -> usize {
        let revoked = self.registry.revoke_admin_tokens(session.sid).await;
        info!(target: "audit", user = %session.sub, session = %session.sid, revoked, "admin session closed");
        revoked
    }
}
