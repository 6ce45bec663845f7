use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub type DepartmentId = Uuid;

/// A node in the department forest. Only read by this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: DepartmentId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<DepartmentId>,
    /// When set, memberships held in ancestors never cascade into this department.
    #[serde(default)]
    pub require_explicit_membership: bool,
}

impl Department {
    pub fn new(id: DepartmentId, name: impl Into<String>, parent_id: Option<DepartmentId>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id,
            require_explicit_membership: false,
        }
    }

    pub fn walled(mut self) -> Self {
        self.require_explicit_membership = true;
        self
    }
}
