// YAML seed data for the in-memory store (`serve --fixtures FILE`).
//
// Passwords are given in clear text here and hashed while loading; this
// format is only meant for local runs and demos.

use serde::Deserialize;
use std::path::Path;
use uuid::Uuid;

use super::memory::InMemoryStore;
use super::models::{Department, DepartmentMembership, Principal, PrincipalRecord, Role, User};
use crate::auth::password::{self, PasswordError};
use crate::types::PrincipalKind;

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("Failed to read fixtures: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid fixture YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixtures {
    #[serde(default)]
    pub departments: Vec<Department>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub users: Vec<FixtureUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureUser {
    pub id: Uuid,
    pub login: String,
    pub password: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub escalation_password: Option<String>,
    #[serde(default)]
    pub principals: Vec<FixturePrincipal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixturePrincipal {
    pub kind: PrincipalKind,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub memberships: Vec<DepartmentMembership>,
}

fn default_true() -> bool {
    true
}

impl Fixtures {
    pub fn from_yaml(source: &str) -> Result<Self, FixtureError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// Build a fresh in-memory store holding everything in this file
    pub async fn into_store(self) -> Result<InMemoryStore, FixtureError> {
        let store = InMemoryStore::new();

        for department in self.departments {
            store.insert_department(department).await;
        }
        for role in self.roles {
            store.insert_role(role).await;
        }

        for fixture in self.users {
            let mut user = User::new(fixture.id, fixture.login, password::hash_password(&fixture.password)?);
            user.is_active = fixture.is_active;
            store.insert_user(user).await;

            if let Some(secret) = fixture.escalation_password {
                store
                    .set_escalation_hash(fixture.id, password::hash_password(&secret)?)
                    .await;
            }

            for p in fixture.principals {
                let mut record = PrincipalRecord::new(fixture.id, p.memberships);
                record.is_active = p.is_active;
                store.upsert_principal(Principal::from_parts(p.kind, record)).await;
            }
        }

        Ok(store)
    }
}
