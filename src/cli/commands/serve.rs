use anyhow::{bail, Context};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::access::{RoleCatalog, RoleFile};
use crate::app::{app, AppState, EngineSettings, Stores};
use crate::config::config;
use crate::database::{DatabaseManager, Fixtures, PgStore};
use crate::is_production;

pub async fn handle(port: Option<u16>, fixtures: Option<PathBuf>) -> anyhow::Result<()> {
    let config = config();
    info!("Starting LearnHub Access in {:?} mode", config.environment);

    let mut stores = match fixtures {
        Some(path) => {
            if is_production!() {
                bail!("fixture stores are for local runs and cannot be used in production");
            }
            warn!("Serving in-memory fixtures from {}", path.display());
            let store = Fixtures::from_file(&path)
                .with_context(|| format!("failed to load fixtures from {}", path.display()))?
                .into_store()
                .await?;
            Stores::shared(Arc::new(store))
        }
        None => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to Postgres")?;
            Stores::shared(Arc::new(PgStore::new(pool)))
        }
    };

    // A configured catalog file takes over from the store's roles table
    if let Some(path) = &config.access.role_catalog_path {
        info!("Loading role catalog from {}", path);
        stores.roles = Arc::new(RoleFile::new(path));
    }
    let roles = stores.roles.load_roles().await.context("failed to load roles")?;
    let catalog = RoleCatalog::from_roles(roles).context("role catalog is invalid")?;
    info!("Role catalog ready with {} roles", catalog.len());

    let state = AppState::new(stores, catalog, EngineSettings::from_config(config))
        .context("token secrets are missing or identical")?;

    let port = port.unwrap_or(config.api.port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("LearnHub Access listening on http://{}", bind_addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
