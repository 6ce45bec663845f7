//! Session views: login, department switch, continuation.
//!
//! Every call recomputes the view from the stores. Token claims are only a
//! cache of the last view and are never trusted as the source of truth;
//! continuation diffs them against a fresh computation.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::aggregator::{AccessRightAggregator, RightSet};
use super::catalog::RoleCatalog;
use super::error::{AccessError, AccessResult};
use super::escalation::escalation_roles;
use super::resolver::{CascadedChild, ResolvedRoles, RoleResolver};
use crate::auth::{SessionClaims, SessionRegistry, TokenError, TokenService};
use crate::database::models::{Department, DepartmentId, Principal, User};
use crate::database::{CredentialStore, PrincipalStore, UserStore};
use crate::types::{Dashboard, PrincipalKind};

/// Resolved view of one department for one principal capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentView {
    pub department_id: DepartmentId,
    pub name: String,
    pub principal_kind: PrincipalKind,
    pub roles: BTreeSet<String>,
    pub access_rights: RightSet,
    pub is_primary: bool,
    pub is_active: bool,
    pub is_direct_member: bool,
    pub inherited_from: Option<DepartmentId>,
    pub child_departments: Vec<DepartmentView>,
}

impl DepartmentView {
    /// True if `department_id` is this department or any nested child
    pub fn reaches(&self, department_id: DepartmentId) -> bool {
        let mut stack = vec![self];
        while let Some(view) = stack.pop() {
            if view.department_id == department_id {
                return true;
            }
            stack.extend(view.child_departments.iter());
        }
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub user_id: Uuid,
    pub user_types: Vec<PrincipalKind>,
    pub departments: Vec<DepartmentView>,
    pub all_roles: BTreeSet<String>,
    pub all_access_rights: RightSet,
    pub can_escalate_to_admin: bool,
    pub default_dashboard: Dashboard,
    pub selected_department: Option<DepartmentId>,
}

impl SessionView {
    pub fn reaches(&self, department_id: DepartmentId) -> bool {
        self.departments.iter().any(|d| d.reaches(department_id))
    }

    /// Primary membership first, then the first direct membership
    fn default_department(&self) -> Option<DepartmentId> {
        self.departments
            .iter()
            .find(|d| d.is_primary)
            .or_else(|| self.departments.first())
            .map(|d| d.department_id)
    }
}

/// Roles and rights that appeared or disappeared since the previous token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionChanges {
    pub roles_added: Vec<String>,
    pub roles_removed: Vec<String>,
    pub rights_added: Vec<String>,
    pub rights_removed: Vec<String>,
}

impl SessionChanges {
    pub fn between(previous: &SessionClaims, current: &SessionView) -> Self {
        Self {
            roles_added: current.all_roles.difference(&previous.roles).cloned().collect(),
            roles_removed: previous.roles.difference(&current.all_roles).cloned().collect(),
            rights_added: current
                .all_access_rights
                .difference(&previous.rights)
                .cloned()
                .collect(),
            rights_removed: previous
                .rights
                .difference(&current.all_access_rights)
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roles_added.is_empty()
            && self.roles_removed.is_empty()
            && self.rights_added.is_empty()
            && self.rights_removed.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedSession {
    pub session_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub session: SessionView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuedSession {
    #[serde(flatten)]
    pub issued: IssuedSession,
    pub changes: SessionChanges,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSwitch {
    pub department: DepartmentView,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token lifetimes and escalation scope used when assembling sessions
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub session_ttl: Duration,
    /// How long after expiry a session may still be continued
    pub continue_grace: Duration,
    /// Where global-admin memberships must live to count for escalation
    pub master_department: Option<DepartmentId>,
}

#[derive(Clone)]
pub struct SessionAssembler {
    resolver: RoleResolver,
    aggregator: AccessRightAggregator,
    principals: Arc<dyn PrincipalStore>,
    users: Arc<dyn UserStore>,
    credentials: Arc<dyn CredentialStore>,
    tokens: Arc<dyn TokenService>,
    registry: SessionRegistry,
    policy: SessionPolicy,
}

impl SessionAssembler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: RoleResolver,
        aggregator: AccessRightAggregator,
        principals: Arc<dyn PrincipalStore>,
        users: Arc<dyn UserStore>,
        credentials: Arc<dyn CredentialStore>,
        tokens: Arc<dyn TokenService>,
        registry: SessionRegistry,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            resolver,
            aggregator,
            principals,
            users,
            credentials,
            tokens,
            registry,
            policy,
        }
    }

    async fn active_principals(&self, user_id: Uuid) -> AccessResult<Vec<Principal>> {
        Ok(self
            .principals
            .principals(user_id)
            .await?
            .into_iter()
            .filter(|p| p.is_active())
            .collect())
    }

    async fn live_user(&self, user_id: Uuid) -> AccessResult<User> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(AccessError::InvalidSession)?;
        if !user.is_active {
            return Err(AccessError::InactiveAccount);
        }
        Ok(user)
    }

    /// Full view for `user_id`. `preferred` becomes the selected department
    /// when still reachable; otherwise the default department is selected.
    pub async fn build_session_view(
        &self,
        user_id: Uuid,
        preferred: Option<DepartmentId>,
    ) -> AccessResult<SessionView> {
        let principals = self.active_principals(user_id).await?;
        let catalog = self.aggregator.snapshot().await;

        let mut departments = Vec::new();
        let mut role_sets = Vec::new();
        for principal in &principals {
            for membership in principal.active_memberships() {
                let department = match self.resolver.department(membership.department_id).await {
                    Ok(department) => department,
                    Err(AccessError::UnknownDepartment(id)) => {
                        warn!(user = %user_id, department = %id, "membership references a missing department");
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                let resolved = ResolvedRoles {
                    department_id: department.id,
                    roles: membership.roles.clone(),
                    is_direct_member: true,
                    inherited_from: None,
                    is_primary: membership.is_primary,
                };
                role_sets.push((principal.kind(), &membership.roles));
                departments.push(self.department_view(&catalog, principal, department, resolved).await?);
            }
        }

        // Only departments that resolved contribute roles and rights
        let all_roles = role_sets.iter().flat_map(|(_, roles)| roles.iter().cloned()).collect();
        let all_access_rights =
            AccessRightAggregator::union_across_departments(&catalog, role_sets.iter().copied())?;
        let user_types: Vec<PrincipalKind> = principals.iter().map(|p| p.kind()).collect();
        let can_escalate_to_admin = !escalation_roles(
            principals
                .iter()
                .filter(|p| p.kind() == PrincipalKind::GlobalAdmin)
                .flat_map(|p| p.active_memberships()),
            self.policy.master_department,
        )
        .is_empty();

        let mut view = SessionView {
            user_id,
            default_dashboard: Dashboard::for_kinds(&user_types),
            user_types,
            departments,
            all_roles,
            all_access_rights,
            can_escalate_to_admin,
            selected_department: None,
        };
        view.selected_department = match preferred {
            Some(id) if view.reaches(id) => Some(id),
            _ => view.default_department(),
        };
        Ok(view)
    }

    /// Build a department view, nesting cascaded descendants under it
    async fn department_view(
        &self,
        catalog: &RoleCatalog,
        principal: &Principal,
        department: Department,
        resolved: ResolvedRoles,
    ) -> AccessResult<DepartmentView> {
        let access_rights =
            AccessRightAggregator::expand_roles_for_kind(catalog, principal.kind(), &resolved.roles)?;
        let children = self.resolver.cascaded_children(principal, department.id).await?;
        let source = resolved.inherited_from.unwrap_or(department.id);

        let template = DepartmentView {
            department_id: department.id,
            name: department.name,
            principal_kind: principal.kind(),
            roles: resolved.roles,
            access_rights,
            is_primary: resolved.is_primary,
            is_active: true,
            is_direct_member: resolved.is_direct_member,
            inherited_from: resolved.inherited_from,
            child_departments: Vec::new(),
        };

        let child_departments = nest_children(children, &template, source);
        Ok(DepartmentView {
            child_departments,
            ..template
        })
    }

    /// Resolve one department across the user's capacities. A direct
    /// membership beats an inherited one; ties go staff, global-admin, learner.
    pub async fn resolve_department(
        &self,
        user_id: Uuid,
        department_id: DepartmentId,
    ) -> AccessResult<DepartmentView> {
        let principals = self.active_principals(user_id).await?;
        let catalog = self.aggregator.snapshot().await;

        let outcomes = join_all(
            principals
                .iter()
                .map(|p| self.resolver.resolve_roles(p, department_id)),
        )
        .await;

        let mut best: Option<(&Principal, ResolvedRoles)> = None;
        for (principal, outcome) in principals.iter().zip(outcomes) {
            match outcome {
                Ok(resolved) => {
                    let better = match &best {
                        None => true,
                        Some((current, current_resolved)) => {
                            (resolved.is_direct_member, kind_rank(principal.kind()))
                                > (current_resolved.is_direct_member, kind_rank(current.kind()))
                        }
                    };
                    if better {
                        best = Some((principal, resolved));
                    }
                }
                Err(AccessError::NotAMember(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        let (principal, resolved) = best.ok_or(AccessError::NotAMember(department_id))?;
        let department = self.resolver.department(department_id).await?;
        self.department_view(&catalog, principal, department, resolved).await
    }

    fn session_claims(&self, session_id: Uuid, view: &SessionView) -> SessionClaims {
        let mut claims = SessionClaims::new(view.user_id, session_id, self.policy.session_ttl);
        claims.user_types = view.user_types.clone();
        claims.department = view.selected_department;
        claims.roles = view.all_roles.clone();
        claims.rights = view.all_access_rights.clone();
        claims.can_escalate = view.can_escalate_to_admin;
        claims
    }

    async fn issue(&self, session_id: Uuid, view: SessionView) -> AccessResult<IssuedSession> {
        let claims = self.session_claims(session_id, &view);
        let token = self.tokens.issue_session_token(&claims)?;
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
        self.registry
            .open_session(session_id, expires_at + self.policy.continue_grace)
            .await;

        Ok(IssuedSession {
            session_id,
            token,
            expires_at,
            session: view,
        })
    }

    /// Verify credentials and open a new session
    pub async fn login(&self, login: &str, password: &str) -> AccessResult<IssuedSession> {
        let user = match self.users.find_by_login(login).await? {
            Some(user) => user,
            None => {
                warn!(target: "audit", "login rejected: unknown account");
                return Err(AccessError::InvalidCredentials);
            }
        };

        if !self.credentials.verify_password(user.id, password).await? {
            warn!(target: "audit", user = %user.id, "login rejected: bad password");
            return Err(AccessError::InvalidCredentials);
        }
        if !user.is_active {
            warn!(target: "audit", user = %user.id, "login rejected: inactive account");
            return Err(AccessError::InactiveAccount);
        }

        let view = self
            .build_session_view(user.id, user.last_selected_department)
            .await?;
        if let Some(selected) = view.selected_department {
            if user.last_selected_department != Some(selected) {
                self.users.set_last_selected_department(user.id, selected).await?;
            }
        }

        let issued = self.issue(Uuid::new_v4(), view).await?;
        info!(target: "audit", user = %user.id, session = %issued.session_id, "session opened");
        Ok(issued)
    }

    /// Re-resolve one department, remember it as the user's selection and
    /// reissue the session token pointing at it
    pub async fn switch_department(
        &self,
        claims: &SessionClaims,
        department_id: DepartmentId,
    ) -> AccessResult<DepartmentSwitch> {
        self.live_user(claims.sub).await?;
        let department = self.resolve_department(claims.sub, department_id).await?;
        self.users
            .set_last_selected_department(claims.sub, department_id)
            .await?;

        let mut next = claims.clone();
        let fresh = SessionClaims::new(claims.sub, claims.sid, self.policy.session_ttl);
        next.department = Some(department_id);
        next.iat = fresh.iat;
        next.exp = fresh.exp;
        let token = self.tokens.issue_session_token(&next)?;
        let expires_at = DateTime::<Utc>::from_timestamp(next.exp, 0).unwrap_or_else(Utc::now);
        self.registry
            .open_session(claims.sid, expires_at + self.policy.continue_grace)
            .await;

        info!(user = %claims.sub, department = %department_id, "department switched");
        Ok(DepartmentSwitch {
            department,
            token,
            expires_at,
        })
    }

    /// Refresh a session from current data and report what changed since
    /// the presented token was issued. The token may be expired as long as it
    /// is within the grace window and the session was not ended.
    pub async fn continue_session(&self, token: &str) -> AccessResult<ContinuedSession> {
        let previous = self
            .tokens
            .verify_session_token(token, Some(self.policy.continue_grace))
            .map_err(|e| {
                if !matches!(e, TokenError::Expired) {
                    warn!(target: "audit", error = %e, "continue rejected: bad token");
                }
                AccessError::InvalidSession
            })?;

        if !self.registry.is_session_live(previous.sid).await {
            return Err(AccessError::InvalidSession);
        }
        self.live_user(previous.sub).await?;

        let view = self.build_session_view(previous.sub, previous.department).await?;
        let changes = SessionChanges::between(&previous, &view);
        if !changes.is_empty() {
            info!(user = %previous.sub, ?changes, "access changed since last token");
        }

        let issued = self.issue(previous.sid, view).await?;
        Ok(ContinuedSession { issued, changes })
    }

    /// Full view for an existing session, without issuing anything
    pub async fn current_view(&self, claims: &SessionClaims) -> AccessResult<SessionView> {
        self.live_user(claims.sub).await?;
        self.build_session_view(claims.sub, claims.department).await
    }

    pub async fn logout(&self, claims: &SessionClaims) -> bool {
        let ended = self.registry.end_session(claims.sid).await;
        info!(target: "audit", user = %claims.sub, session = %claims.sid, "session closed");
        ended
    }
}

fn kind_rank(kind: PrincipalKind) -> u8 {
    match kind {
        PrincipalKind::Staff => 2,
        PrincipalKind::GlobalAdmin => 1,
        PrincipalKind::Learner => 0,
    }
}

/// Turn the flat breadth-first child list into nested views. Parents always
/// precede their children in `children`, so walking backwards lets every
/// node be moved into its parent once its own subtree is complete.
fn nest_children(
    children: Vec<CascadedChild>,
    template: &DepartmentView,
    source: DepartmentId,
) -> Vec<DepartmentView> {
    let parents: Vec<Option<usize>> = children.iter().map(|c| c.parent).collect();
    let mut slots: Vec<Option<DepartmentView>> = children
        .into_iter()
        .map(|c| {
            Some(DepartmentView {
                department_id: c.department.id,
                name: c.department.name,
                principal_kind: template.principal_kind,
                roles: template.roles.clone(),
                access_rights: template.access_rights.clone(),
                is_primary: false,
                is_active: true,
                is_direct_member: false,
                inherited_from: Some(source),
                child_departments: Vec::new(),
            })
        })
        .collect();

    let mut roots = Vec::new();
    for i in (0..slots.len()).rev() {
        let Some(mut view) = slots[i].take() else { continue };
        view.child_departments.reverse();
        match parents[i].and_then(|p| slots.get_mut(p)).and_then(Option::as_mut) {
            Some(parent) => parent.child_departments.push(view),
            None => roots.push(view),
        }
    }
    roots.reverse();
    roots
}
