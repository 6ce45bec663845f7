use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Department, DepartmentId, Principal, Role, User};
use super::store::{
    CredentialStore, DepartmentStore, PrincipalStore, RoleSource, StoreError, StoreResult,
    UserStore,
};
use crate::auth::password;
use crate::types::PrincipalKind;

#[derive(Default)]
struct Tables {
    departments: HashMap<DepartmentId, Department>,
    roles: Vec<Role>,
    users: HashMap<Uuid, User>,
    principals: HashMap<Uuid, Vec<Principal>>,
    escalation_hashes: HashMap<Uuid, String>,
}

/// Process-local store behind every store trait. Used by tests and by
/// `serve --fixtures` for local runs.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_department(&self, department: Department) {
        let mut tables = self.tables.write().await;
        tables.departments.insert(department.id, department);
    }

    pub async fn insert_role(&self, role: Role) {
        let mut tables = self.tables.write().await;
        tables.roles.retain(|r| r.name != role.name);
        tables.roles.push(role);
    }

    pub async fn insert_user(&self, user: User) {
        let mut tables = self.tables.write().await;
        tables.users.insert(user.id, user);
    }

    /// Replaces any existing principal of the same kind for that user
    pub async fn upsert_principal(&self, principal: Principal) {
        let mut tables = self.tables.write().await;
        let entry = tables.principals.entry(principal.user_id()).or_default();
        entry.retain(|p| p.kind() != principal.kind());
        entry.push(principal);
    }

    pub async fn remove_principal(&self, user_id: Uuid, kind: PrincipalKind) {
        let mut tables = self.tables.write().await;
        if let Some(entry) = tables.principals.get_mut(&user_id) {
            entry.retain(|p| p.kind() != kind);
        }
    }

    pub async fn set_escalation_hash(&self, user_id: Uuid, hash: impl Into<String>) {
        let mut tables = self.tables.write().await;
        tables.escalation_hashes.insert(user_id, hash.into());
    }

    /// Apply an in-place change to one principal; a no-op if it doesn't exist
    pub async fn update_principal<F>(&self, user_id: Uuid, kind: PrincipalKind, change: F)
    where
        F: FnOnce(&mut Principal),
    {
        let mut tables = self.tables.write().await;
        if let Some(principal) = tables
            .principals
            .get_mut(&user_id)
            .and_then(|all| all.iter_mut().find(|p| p.kind() == kind))
        {
            change(principal);
        }
    }
}

#[async_trait]
impl DepartmentStore for InMemoryStore {
    async fn get_department(&self, id: DepartmentId) -> StoreResult<Option<Department>> {
        Ok(self.tables.read().await.departments.get(&id).cloned())
    }

    async fn get_children(&self, id: DepartmentId) -> StoreResult<Vec<Department>> {
        let tables = self.tables.read().await;
        let mut children: Vec<Department> = tables
            .departments
            .values()
            .filter(|d| d.parent_id == Some(id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(children)
    }
}

#[async_trait]
impl PrincipalStore for InMemoryStore {
    async fn principals(&self, user_id: Uuid) -> StoreResult<Vec<Principal>> {
        let tables = self.tables.read().await;
        let mut principals = tables.principals.get(&user_id).cloned().unwrap_or_default();
        principals.sort_by_key(|p| p.kind());
        Ok(principals)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_login(&self, login: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.login == login).cloned())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn set_last_selected_department(
        &self,
        user_id: Uuid,
        department_id: DepartmentId,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;
        user.last_selected_department = Some(department_id);
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn verify_password(&self, user_id: Uuid, candidate: &str) -> StoreResult<bool> {
        let hash = match self.tables.read().await.users.get(&user_id) {
            Some(user) => user.password_hash.clone(),
            None => return Ok(false),
        };
        password::verify_password(&hash, candidate).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    async fn verify_escalation_password(&self, user_id: Uuid, candidate: &str) -> StoreResult<bool> {
        let hash = match self.tables.read().await.escalation_hashes.get(&user_id) {
            Some(hash) => hash.clone(),
            None => return Ok(false),
        };
        password::verify_password(&hash, candidate).map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}

#[async_trait]
impl RoleSource for InMemoryStore {
    async fn load_roles(&self) -> StoreResult<Vec<Role>> {
        Ok(self.tables.read().await.roles.clone())
    }
}
