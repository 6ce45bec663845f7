use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::manager::DatabaseManager;
use super::models::{
    Department, DepartmentId, DepartmentMembership, Principal, PrincipalRecord, Role, User,
};
use super::store::{
    CredentialStore, DepartmentStore, PrincipalStore, RoleSource, StoreError, StoreResult,
    UserStore,
};
use crate::auth::password;
use crate::types::PrincipalKind;

/// Postgres-backed implementation of every store trait.
/// Schema lives in `migrations/0001_access.sql`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn parse_kind(raw: &str) -> StoreResult<PrincipalKind> {
        raw.parse().map_err(StoreError::Corrupt)
    }
}

#[async_trait]
impl DepartmentStore for PgStore {
    async fn get_department(&self, id: DepartmentId) -> StoreResult<Option<Department>> {
        let department = sqlx::query_as::<_, Department>(
            r#"
            SELECT id, name, parent_id, require_explicit_membership
            FROM departments
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(department)
    }

    async fn get_children(&self, id: DepartmentId) -> StoreResult<Vec<Department>> {
        let children = sqlx::query_as::<_, Department>(
            r#"
            SELECT id, name, parent_id, require_explicit_membership
            FROM departments
            WHERE parent_id = $1 AND deleted_at IS NULL
            ORDER BY name, id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(children)
    }

    async fn ping(&self) -> StoreResult<()> {
        DatabaseManager::health_check(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl PrincipalStore for PgStore {
    async fn principals(&self, user_id: Uuid) -> StoreResult<Vec<Principal>> {
        let principal_rows = sqlx::query(
            r#"
            SELECT principal_kind, is_active
            FROM principals
            WHERE user_id = $1
            ORDER BY principal_kind
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        // One snapshot for all memberships of this user
        let membership_rows = sqlx::query(
            r#"
            SELECT principal_kind, department_id, roles, is_primary, is_active, joined_at
            FROM department_memberships
            WHERE user_id = $1
            ORDER BY joined_at, department_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut principals = Vec::with_capacity(principal_rows.len());
        for row in principal_rows {
            let kind = Self::parse_kind(row.get::<String, _>("principal_kind").as_str())?;
            let mut record = PrincipalRecord::new(user_id, Vec::new());
            record.is_active = row.get("is_active");

            for m in membership_rows.iter() {
                if Self::parse_kind(m.get::<String, _>("principal_kind").as_str())? != kind {
                    continue;
                }
                let roles: Vec<String> = m.get("roles");
                record.memberships.push(DepartmentMembership {
                    department_id: m.get("department_id"),
                    roles: roles.into_iter().collect::<BTreeSet<_>>(),
                    is_primary: m.get("is_primary"),
                    is_active: m.get("is_active"),
                    joined_at: m.get::<DateTime<Utc>, _>("joined_at"),
                });
            }

            principals.push(Principal::from_parts(kind, record));
        }

        Ok(principals)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_login(&self, login: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, login, password_hash, is_active, last_selected_department,
                   created_at, updated_at
            FROM users
            WHERE login = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, login, password_hash, is_active, last_selected_department,
                   created_at, updated_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn set_last_selected_department(
        &self,
        user_id: Uuid,
        department_id: DepartmentId,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET last_selected_department = $2, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(department_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn verify_password(&self, user_id: Uuid, candidate: &str) -> StoreResult<bool> {
        let hash: Option<String> = sqlx::query_scalar(
            "SELECT password_hash FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match hash {
            Some(hash) => password::verify_password(&hash, candidate)
                .map_err(|e| StoreError::Corrupt(e.to_string())),
            None => Ok(false),
        }
    }

    async fn verify_escalation_password(&self, user_id: Uuid, candidate: &str) -> StoreResult<bool> {
        let hash: Option<Option<String>> = sqlx::query_scalar(
            r#"
            SELECT escalation_password_hash
            FROM principals
            WHERE user_id = $1 AND principal_kind = 'global-admin'
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match hash.flatten() {
            Some(hash) => password::verify_password(&hash, candidate)
                .map_err(|e| StoreError::Corrupt(e.to_string())),
            None => Ok(false),
        }
    }
}

#[async_trait]
impl RoleSource for PgStore {
    async fn load_roles(&self) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query("SELECT name, principal_kind, access_rights FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Role {
                    name: row.get("name"),
                    principal_kind: Self::parse_kind(row.get::<String, _>("principal_kind").as_str())?,
                    access_rights: row.get("access_rights"),
                })
            })
            .collect()
    }
}
