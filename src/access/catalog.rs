use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::database::models::Role;
use crate::database::{RoleSource, StoreError, StoreResult};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Role '{0}' is defined more than once")]
    DuplicateRole(String),

    #[error("Role '{0}' has an empty access right")]
    EmptyRight(String),

    #[error("Role '{role}' has a misplaced wildcard in '{right}'")]
    MisplacedWildcard { role: String, right: String },

    #[error("Failed to read role catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid role catalog YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Immutable snapshot of the role registry
#[derive(Debug, Default)]
pub struct RoleCatalog {
    roles: HashMap<String, Role>,
}

#[derive(Deserialize)]
struct CatalogFile {
    roles: Vec<Role>,
}

impl RoleCatalog {
    /// Validate and index roles. Names are unique across all principal kinds.
    pub fn from_roles(roles: Vec<Role>) -> Result<Self, CatalogError> {
        let mut indexed = HashMap::with_capacity(roles.len());
        for role in roles {
            for right in &role.access_rights {
                if right.is_empty() {
                    return Err(CatalogError::EmptyRight(role.name.clone()));
                }
                if right.find('*').is_some_and(|pos| pos != right.len() - 1) {
                    return Err(CatalogError::MisplacedWildcard {
                        role: role.name.clone(),
                        right: right.clone(),
                    });
                }
            }
            if indexed.contains_key(&role.name) {
                return Err(CatalogError::DuplicateRole(role.name));
            }
            indexed.insert(role.name.clone(), role);
        }
        Ok(Self { roles: indexed })
    }

    pub fn from_yaml(source: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(source)?;
        Self::from_roles(file.roles)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Role source backed by a YAML catalog file, re-read on every load
#[derive(Debug, Clone)]
pub struct RoleFile {
    path: PathBuf,
}

impl RoleFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RoleSource for RoleFile {
    async fn load_roles(&self) -> StoreResult<Vec<Role>> {
        let source = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        let file: CatalogFile =
            serde_yaml::from_str(&source).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(file.roles)
    }
}

/// Shared, reloadable handle to the current catalog. Each request takes one
/// snapshot and resolves everything against it.
#[derive(Clone, Default)]
pub struct CatalogHandle {
    current: Arc<RwLock<Arc<RoleCatalog>>>,
}

impl CatalogHandle {
    pub fn new(catalog: RoleCatalog) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    pub async fn snapshot(&self) -> Arc<RoleCatalog> {
        self.current.read().await.clone()
    }

    /// Replace the catalog with whatever `source` currently holds.
    /// On validation failure the previous catalog stays in place.
    pub async fn reload(&self, source: &dyn RoleSource) -> Result<usize, CatalogError> {
        let catalog = RoleCatalog::from_roles(source.load_roles().await?)?;
        let count = catalog.len();
        *self.current.write().await = Arc::new(catalog);
        info!("Role catalog reloaded with {} roles", count);
        Ok(count)
    }
}
