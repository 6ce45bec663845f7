use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::department::DepartmentId;
use crate::types::PrincipalKind;

/// One department membership embedded in a principal record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentMembership {
    pub department_id: DepartmentId,
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub joined_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl DepartmentMembership {
    pub fn new<I, S>(department_id: DepartmentId, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            department_id,
            roles: roles.into_iter().map(Into::into).collect(),
            is_primary: false,
            is_active: true,
            joined_at: Utc::now(),
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Fields shared by every principal kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalRecord {
    pub user_id: Uuid,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub memberships: Vec<DepartmentMembership>,
}

impl PrincipalRecord {
    pub fn new(user_id: Uuid, memberships: Vec<DepartmentMembership>) -> Self {
        Self {
            user_id,
            is_active: true,
            memberships,
        }
    }
}

/// A user's record in one capacity. A user id may own one of each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Principal {
    Learner(PrincipalRecord),
    Staff(PrincipalRecord),
    GlobalAdmin(PrincipalRecord),
}

impl Principal {
    pub fn from_parts(kind: PrincipalKind, record: PrincipalRecord) -> Self {
        match kind {
            PrincipalKind::Learner => Principal::Learner(record),
            PrincipalKind::Staff => Principal::Staff(record),
            PrincipalKind::GlobalAdmin => Principal::GlobalAdmin(record),
        }
    }

    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::Learner(_) => PrincipalKind::Learner,
            Principal::Staff(_) => PrincipalKind::Staff,
            Principal::GlobalAdmin(_) => PrincipalKind::GlobalAdmin,
        }
    }

    pub fn record(&self) -> &PrincipalRecord {
        match self {
            Principal::Learner(r) | Principal::Staff(r) | Principal::GlobalAdmin(r) => r,
        }
    }

    pub fn record_mut(&mut self) -> &mut PrincipalRecord {
        match self {
            Principal::Learner(r) | Principal::Staff(r) | Principal::GlobalAdmin(r) => r,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.record().user_id
    }

    pub fn is_active(&self) -> bool {
        self.record().is_active
    }

    /// Active memberships only; an inactive principal has none.
    pub fn active_memberships(&self) -> impl Iterator<Item = &DepartmentMembership> {
        let active = self.is_active();
        self.record()
            .memberships
            .iter()
            .filter(move |m| active && m.is_active)
    }

    pub fn active_membership_in(&self, department_id: DepartmentId) -> Option<&DepartmentMembership> {
        self.active_memberships()
            .find(|m| m.department_id == department_id)
    }
}
