// Store contracts consumed by the access engine.
//
// The engine only ever reads through these traits; both the in-memory store
// and the Postgres store implement all of them.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::models::{Department, DepartmentId, DepartmentMembership, Principal, Role, User};
use crate::types::PrincipalKind;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] super::manager::DatabaseError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DepartmentStore: Send + Sync {
    async fn get_department(&self, id: DepartmentId) -> StoreResult<Option<Department>>;

    async fn get_children(&self, id: DepartmentId) -> StoreResult<Vec<Department>>;

    async fn get_parent(&self, id: DepartmentId) -> StoreResult<Option<Department>> {
        match self.get_department(id).await? {
            Some(Department { parent_id: Some(parent), .. }) => self.get_department(parent).await,
            _ => Ok(None),
        }
    }

    /// Connectivity probe used by `/health`
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Every principal record (any kind, active or not) owned by `user_id`
    async fn principals(&self, user_id: Uuid) -> StoreResult<Vec<Principal>>;

    async fn active_memberships(
        &self,
        user_id: Uuid,
        kind: PrincipalKind,
    ) -> StoreResult<Vec<DepartmentMembership>> {
        Ok(self
            .principals(user_id)
            .await?
            .into_iter()
            .filter(|p| p.kind() == kind)
            .flat_map(|p| p.active_memberships().cloned().collect::<Vec<_>>())
            .collect())
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_login(&self, login: &str) -> StoreResult<Option<User>>;

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn set_last_selected_department(
        &self,
        user_id: Uuid,
        department_id: DepartmentId,
    ) -> StoreResult<()>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn verify_password(&self, user_id: Uuid, password: &str) -> StoreResult<bool>;

    /// Checked against the GlobalAdmin principal's own secret, never the login password
    async fn verify_escalation_password(&self, user_id: Uuid, password: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait RoleSource: Send + Sync {
    async fn load_roles(&self) -> StoreResult<Vec<Role>>;
}
