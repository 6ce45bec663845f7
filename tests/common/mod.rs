#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use chrono::Duration;
use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

use learnhub_access::access::RoleCatalog;
use learnhub_access::auth::password::hash_password;
use learnhub_access::database::models::{
    Department, DepartmentMembership, Principal, PrincipalRecord, Role, User,
};
use learnhub_access::database::InMemoryStore;
use learnhub_access::types::PrincipalKind;
use learnhub_access::{app, AppState, EngineSettings, Stores};

pub const PASSWORD: &str = "correct horse battery staple";
pub const ESCALATION_PASSWORD: &str = "second factor of sorts";
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

// argon2 is slow in debug builds; hash each secret once per test binary
fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).expect("hash password"))
}

fn escalation_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(ESCALATION_PASSWORD).expect("hash escalation password"))
}

pub fn roles() -> Vec<Role> {
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

/// A running service over a seeded in-memory store.
///
/// Departments:
/// ```text
/// Master
/// University
/// ├── Science
/// │   └── Physics
/// │       └── Quantum Lab (explicit membership required)
/// └── Arts
/// ```
///
/// Users (all share `PASSWORD`):
/// - `instructor`: staff, instructor in Science (primary)
/// - `hybrid`: staff instructor in Physics, learner student in Arts
/// - `admin`: global-admin system-admin in Master, staff content-admin in University
/// - `support`: global-admin support-admin in Master
/// - `retired`: staff instructor in Arts, account deactivated
pub struct TestWorld {
    pub store: InMemoryStore,
    pub base_url: String,
    departments: HashMap<&'static str, Uuid>,
    users: HashMap<&'static str, Uuid>,
    client: reqwest::Client,
}

impl TestWorld {
    pub async fn start() -> Result<Self> {
        let store = InMemoryStore::new();
        let mut departments = HashMap::new();

        let mut add = |name: &'static str, parent: Option<&'static str>, walled: bool| {
            let parent_id = parent.map(|p| departments[p]);
            let mut department = Department::new(Uuid::new_v4(), name, parent_id);
            department.require_explicit_membership = walled;
            departments.insert(name, department.id);
            department
        };
        let tree = vec![
            add("Master", None, false),
            add("University", None, false),
            add("Science", Some("University"), false),
            add("Physics", Some("Science"), false),
            add("Quantum Lab", Some("Physics"), true),
            add("Arts", Some("University"), false),
        ];
        for department in tree {
            store.insert_department(department).await;
        }
        for role in roles() {
            store.insert_role(role).await;
        }

        let mut world = Self {
            store,
            base_url: String::new(),
            departments,
            users: HashMap::new(),
            client: reqwest::Client::new(),
        };

        world
            .seed_user("instructor", true, vec![staff(vec![world.membership("Science", &["instructor"]).primary()])])
            .await;
        world
            .seed_user(
                "hybrid",
                true,
                vec![
                    staff(vec![world.membership("Physics", &["instructor"])]),
                    learner(vec![world.membership("Arts", &["student"])]),
                ],
            )
            .await;
        world
            .seed_user(
                "admin",
                true,
                vec![
                    global_admin(vec![world.membership("Master", &["system-admin"])]),
                    staff(vec![world.membership("University", &["content-admin"]).primary()]),
                ],
            )
            .await;
        world
            .seed_user("support", true, vec![global_admin(vec![world.membership("Master", &["support-admin"])])])
            .await;
        world
            .seed_user("retired", false, vec![staff(vec![world.membership("Arts", &["instructor"])])])
            .await;

        world.serve().await?;
        Ok(world)
    }

    async fn serve(&mut self) -> Result<()> {
        let catalog = RoleCatalog::from_roles(roles())?;
        let settings = EngineSettings {
            session_secret: "test-session-secret".to_string(),
            admin_secret: "test-admin-secret".to_string(),
            session_ttl: Duration::hours(1),
            continue_grace: Duration::hours(1),
            admin_ttl: Duration::minutes(15),
            max_department_depth: 64,
            master_department: Some(self.department("Master")),
            cors_origins: None,
        };
        let state = AppState::new(Stores::shared(Arc::new(self.store.clone())), catalog, settings)?;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind ephemeral port")?;
        self.base_url = format!("http://{}", listener.local_addr()?);

        let router = app(state);
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        Ok(())
    }

    fn membership(&self, department: &str, roles: &[&str]) -> DepartmentMembership {
        DepartmentMembership::new(self.department(department), roles.iter().copied())
    }

    async fn seed_user(&mut self, login: &'static str, active: bool, principals: Vec<Principal>) {
        let id = Uuid::new_v4();
        let mut user = User::new(id, login, password_hash());
        user.is_active = active;
        self.store.insert_user(user).await;

        for mut principal in principals {
            principal.record_mut().user_id = id;
            if principal.kind() == PrincipalKind::GlobalAdmin {
                self.store.set_escalation_hash(id, escalation_hash()).await;
            }
            self.store.upsert_principal(principal).await;
        }
        self.users.insert(login, id);
    }

    pub fn department(&self, name: &str) -> Uuid {
        self.departments[name]
    }

    pub fn user(&self, login: &str) -> Uuid {
        self.users[login]
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        let mut request = self.client.post(format!("{}{}", self.base_url, path)).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Ok((response.status(), response.json().await?))
    }

    pub async fn get(&self, path: &str, token: Option<&str>, admin_token: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut request = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(admin_token) = admin_token {
            request = request.header(ADMIN_TOKEN_HEADER, admin_token);
        }
        let response = request.send().await?;
        Ok((response.status(), response.json().await?))
    }

    pub async fn post_admin(&self, path: &str, token: &str, admin_token: &str) -> Result<(StatusCode, Value)> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .header(ADMIN_TOKEN_HEADER, admin_token)
            .send()
            .await?;
        Ok((response.status(), response.json().await?))
    }

    /// Log in and return the `data` object of the response
    pub async fn login(&self, login: &str) -> Result<Value> {
        let (status, body) = self
            .post("/auth/login", None, serde_json::json!({ "login": login, "password": PASSWORD }))
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login as {} failed: {} {}", login, status, body);
        Ok(body["data"].clone())
    }

    /// Log in and return just the session token
    pub async fn token(&self, login: &str) -> Result<String> {
        let data = self.login(login).await?;
        data["token"]
            .as_str()
            .map(str::to_string)
            .context("login response has no token")
    }
}

pub fn staff(memberships: Vec<DepartmentMembership>) -> Principal {
    Principal::Staff(PrincipalRecord::new(Uuid::nil(), memberships))
}

pub fn learner(memberships: Vec<DepartmentMembership>) -> Principal {
    Principal::Learner(PrincipalRecord::new(Uuid::nil(), memberships))
}

pub fn global_admin(memberships: Vec<DepartmentMembership>) -> Principal {
    Principal::GlobalAdmin(PrincipalRecord::new(Uuid::nil(), memberships))
}

/// Machine code of an error response
pub fn code(body: &Value) -> &str {
    body["code"].as_str().unwrap_or_default()
}

/// String values of a JSON array, for order-independent comparisons
pub fn strings(value: &Value) -> Vec<String> {
    let mut out: Vec<String> = value
        .as_array()
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    out.sort();
    out
}
