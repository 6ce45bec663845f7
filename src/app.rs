// app.rs - shared application state and the router
//
// Routes are grouped by security tier:
// Public (no auth) → Protected (session token) → Elevated (session + admin token)

use axum::{
    http::{HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use chrono::Duration;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::access::{
    AccessRightAggregator, CatalogHandle, EscalationManager, RoleCatalog, RoleResolver, SessionAssembler,
    SessionPolicy,
};
use crate::auth::{JwtTokenService, SessionRegistry, TokenError, TokenService};
use crate::config::AppConfig;
use crate::database::{CredentialStore, DepartmentStore, PrincipalStore, RoleSource, UserStore};
use crate::handlers::{elevated, protected, public};
use crate::middleware::{admin_auth_middleware, jwt_auth_middleware, ADMIN_TOKEN_HEADER};

/// Every store the engine reads through
#[derive(Clone)]
pub struct Stores {
    pub departments: Arc<dyn DepartmentStore>,
    pub principals: Arc<dyn PrincipalStore>,
    pub users: Arc<dyn UserStore>,
    pub credentials: Arc<dyn CredentialStore>,
    pub roles: Arc<dyn RoleSource>,
}

impl Stores {
    /// Use one backend for every store
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: DepartmentStore + PrincipalStore + UserStore + CredentialStore + RoleSource + 'static,
    {
        Self {
            departments: store.clone(),
            principals: store.clone(),
            users: store.clone(),
            credentials: store.clone(),
            roles: store,
        }
    }
}

/// Values the engine is built from; taken from `AppConfig` in the binary
/// and spelled out directly in tests
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub session_secret: String,
    pub admin_secret: String,
    pub session_ttl: Duration,
    pub continue_grace: Duration,
    pub admin_ttl: Duration,
    pub max_department_depth: usize,
    pub master_department: Option<Uuid>,
    /// `None` disables cross-origin access
    pub cors_origins: Option<Vec<String>>,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            session_secret: config.security.jwt_secret.clone(),
            admin_secret: config.security.admin_jwt_secret.clone(),
            session_ttl: Duration::hours(config.security.session_expiry_hours as i64),
            continue_grace: Duration::hours(config.security.continue_grace_hours as i64),
            admin_ttl: Duration::minutes(config.security.admin_token_minutes as i64),
            max_department_depth: config.access.max_department_depth,
            master_department: config.access.master_department,
            cors_origins: config
                .security
                .enable_cors
                .then(|| config.security.cors_origins.clone()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionAssembler,
    pub escalation: EscalationManager,
    pub tokens: Arc<dyn TokenService>,
    pub registry: SessionRegistry,
    pub catalog: CatalogHandle,
    pub role_source: Arc<dyn RoleSource>,
    pub departments: Arc<dyn DepartmentStore>,
    pub cors_origins: Option<Vec<String>>,
}

impl AppState {
    pub fn new(stores: Stores, catalog: RoleCatalog, settings: EngineSettings) -> Result<Self, TokenError> {
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(
            &settings.session_secret,
            &settings.admin_secret,
        )?);
        let registry = SessionRegistry::new();
        let catalog = CatalogHandle::new(catalog);
        let aggregator = AccessRightAggregator::new(catalog.clone());

        let sessions = SessionAssembler::new(
            RoleResolver::new(stores.departments.clone(), settings.max_department_depth),
            aggregator.clone(),
            stores.principals.clone(),
            stores.users.clone(),
            stores.credentials.clone(),
            tokens.clone(),
            registry.clone(),
            SessionPolicy {
                session_ttl: settings.session_ttl,
                continue_grace: settings.continue_grace,
                master_department: settings.master_department,
            },
        );
        let escalation = EscalationManager::new(
            aggregator,
            stores.principals.clone(),
            stores.credentials.clone(),
            tokens.clone(),
            registry.clone(),
            settings.admin_ttl,
        )
        .with_master_department(settings.master_department);

        Ok(Self {
            sessions,
            escalation,
            tokens,
            registry,
            catalog,
            role_source: stores.roles,
            departments: stores.departments,
            cors_origins: settings.cors_origins,
        })
    }
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.cors_origins.as_deref());

    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(elevated_routes(state.clone()))
        // Global middleware, outermost first
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/auth/login", post(public::auth::login))
        .route("/auth/continue", post(public::auth::continue_session))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{auth, roles};

    Router::new()
        .route("/auth/switch-department", post(auth::switch_department))
        .route("/auth/escalate", post(auth::escalate))
        .route("/auth/deescalate", post(auth::deescalate))
        .route("/auth/logout", post(auth::logout))
        .route("/roles/me", get(roles::me))
        .route("/roles/me/department/:id", get(roles::department))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn elevated_routes(state: AppState) -> Router<AppState> {
    use elevated::admin;

    // route_layer wraps outward, so the session check runs before the admin check
    Router::new()
        .route("/admin/session", get(admin::session))
        .route("/admin/roles/reload", post(admin::reload_roles))
        .route_layer(from_fn_with_state(state.clone(), admin_auth_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let Some(list) = origins else {
        return CorsLayer::new();
    };

    let parsed: Vec<HeaderValue> = list
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(ADMIN_TOKEN_HEADER),
        ])
}
