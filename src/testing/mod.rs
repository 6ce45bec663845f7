// In-memory worlds for unit tests

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::access::catalog::RoleCatalog;
use crate::auth::password;
use crate::database::models::{Department, Principal, Role, User};
use crate::database::InMemoryStore;
use crate::types::PrincipalKind;

pub const PASSWORD: &str = "login-password";
pub const ESCALATION_PASSWORD: &str = "escalation-password";

// Hashing is slow in debug builds, so each secret is hashed once per run
static PASSWORD_HASH: Lazy<String> = Lazy::new(|| password::hash_password(PASSWORD).unwrap());
static ESCALATION_HASH: Lazy<String> =
    Lazy::new(|| password::hash_password(ESCALATION_PASSWORD).unwrap());

/// Named departments over an in-memory store
pub struct Tree {
    pub store: InMemoryStore,
    ids: Mutex<HashMap<String, Uuid>>,
}

impl Tree {
    pub async fn new() -> Self {
        Self::with_store(InMemoryStore::new())
    }

    pub fn with_store(store: InMemoryStore) -> Self {
        Self {
            store,
            ids: Mutex::new(HashMap::new()),
        }
    }

    /// Linear root → leaf chain; names listed in `walled` require explicit membership
    pub async fn chain(names: &[&str], walled: &[&str]) -> Self {
        let tree = Self::new().await;
        let mut parent = None;
        for name in names {
            parent = Some(tree.add(name, parent, walled.contains(name)).await);
        }
        tree
    }

    pub async fn add(&self, name: &str, parent: Option<Uuid>, walled: bool) -> Uuid {
        let mut department = Department::new(Uuid::new_v4(), name, parent);
        department.require_explicit_membership = walled;
        let id = department.id;
        self.store.insert_department(department).await;
        self.ids.lock().unwrap().insert(name.to_string(), id);
        id
    }

    pub fn id(&self, name: &str) -> Uuid {
        *self
            .ids
            .lock()
            .unwrap()
            .get(name)
            .unwrap_or_else(|| panic!("no department named {}", name))
    }
}

pub fn standard_roles() -> Vec<Role> {
    vec![
        Role::new(
            "instructor",
            PrincipalKind::Staff,
            ["content:courses:read", "content:lessons:read", "grades:own-classes:manage"],
        ),
        Role::new(
            "content-admin",
            PrincipalKind::Staff,
            ["content:courses:manage", "content:lessons:manage", "content:materials:manage"],
        ),
        Role::new("student", PrincipalKind::Learner, ["content:courses:read", "assessments:own:submit"]),
        Role::new("system-admin", PrincipalKind::GlobalAdmin, ["system:*"]),
        Role::new("support-admin", PrincipalKind::GlobalAdmin, ["system:users:read"]),
    ]
}

pub fn standard_catalog() -> RoleCatalog {
    RoleCatalog::from_roles(standard_roles()).unwrap()
}

/// Insert a user with the shared test password and the given principals
pub async fn seed_user(store: &InMemoryStore, login: &str, principals: Vec<Principal>) -> Uuid {
    let id = Uuid::new_v4();
    store.insert_user(User::new(id, login, PASSWORD_HASH.clone())).await;
    for principal in principals {
        let mut principal = principal;
        principal.record_mut().user_id = id;
        if principal.kind() == PrincipalKind::GlobalAdmin {
            store.set_escalation_hash(id, ESCALATION_HASH.clone()).await;
        }
        store.upsert_principal(principal).await;
    }
    id
}
