//! Per-tenant connection strings kept in one JSON document.
//!
//! Every mutation loads the whole document, changes it and writes it back, so
//! all writers in the process share a single lock. The document is replaced
//! through a temporary file and a rename, never rewritten in place.

use crate::domain::connection_string::{
    ConnectionStringSetting, DbProvider, ResolvedConnection, TenantDatabases,
};
use crate::{ConnectionStringValidator, CoreError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

// One critical section for every registry write, whatever the tenant or instance
static WRITE_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

#[derive(Clone)]
pub struct ConnectionStringRegistry {
    path: PathBuf,
    validator: Arc<dyn ConnectionStringValidator>,
}

impl ConnectionStringRegistry {
    pub fn new(path: impl Into<PathBuf>, validator: Arc<dyn ConnectionStringValidator>) -> Self {
        Self {
            path: path.into(),
            validator,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the document with an empty list if it does not exist yet.
    /// Returns whether a new document was written.
    pub async fn initialize(&self) -> Result<bool, CoreError> {
        let _guard = WRITE_LOCK.lock().await;
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        self.persist(&TenantDatabases::default()).await?;
        info!(path = %self.path.display(), "Connection string store initialized");
        Ok(true)
    }

    pub async fn resolve(
        &self,
        tenant_key: &str,
        environment: &str,
    ) -> Result<ResolvedConnection, CoreError> {
        let document = self.load().await?;
        Ok(document
            .tenants
            .into_iter()
            .find(|s| s.matches(tenant_key, environment))
            .map(|s| ResolvedConnection::Dedicated {
                provider: s.provider,
                connection_string: s.connection_string,
            })
            .unwrap_or(ResolvedConnection::SharedDefault))
    }

    pub async fn list(&self) -> Result<Vec<ConnectionStringSetting>, CoreError> {
        Ok(self.load().await?.tenants)
    }

    pub async fn save(
        &self,
        tenant_key: &str,
        environment: &str,
        provider: DbProvider,
        connection_string: &str,
    ) -> Result<(), CoreError> {
        if tenant_key.trim().is_empty() || environment.trim().is_empty() {
            return Err(CoreError::Validation(
                "Tenant key and environment are required".into(),
            ));
        }
        if !self.validator.try_validate(connection_string, provider) {
            return Err(CoreError::Validation(format!(
                "Invalid connection string for tenant {}",
                tenant_key
            )));
        }

        let _guard = WRITE_LOCK.lock().await;
        let mut document = self.load().await?;
        match document
            .tenants
            .iter_mut()
            .find(|s| s.matches(tenant_key, environment))
        {
            Some(existing) => {
                existing.provider = provider;
                existing.connection_string = connection_string.to_string();
            }
            None => document.tenants.push(ConnectionStringSetting {
                tenant_key: tenant_key.to_string(),
                environment: environment.to_string(),
                provider,
                connection_string: connection_string.to_string(),
            }),
        }
        self.persist(&document).await?;

        info!(tenant_key = %tenant_key, environment = %environment, "Connection string saved");
        Ok(())
    }

    /// Drops every environment entry of a tenant key. Returns how many were removed.
    pub async fn remove(&self, tenant_key: &str) -> Result<usize, CoreError> {
        let _guard = WRITE_LOCK.lock().await;
        let mut document = self.load().await?;
        let before = document.tenants.len();
        document
            .tenants
            .retain(|s| !s.tenant_key.eq_ignore_ascii_case(tenant_key));
        let removed = before - document.tenants.len();
        self.persist(&document).await?;

        info!(tenant_key = %tenant_key, removed, "Connection strings removed");
        Ok(removed)
    }

    async fn load(&self) -> Result<TenantDatabases, CoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CoreError::NotFound(format!(
                    "Tenant database connection store {}",
                    self.path.display()
                )));
            }
            Err(e) => return Err(CoreError::Io(e)),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn persist(&self, document: &TenantDatabases) -> Result<(), CoreError> {
        let payload = serde_json::to_vec_pretty(document)?;
        let temp_path = self
            .path
            .with_extension(format!("{}.tmp", Uuid::new_v4().simple()));

        if let Err(e) = write_synced(&temp_path, &payload).await {
            discard(&temp_path).await;
            return Err(CoreError::Io(e));
        }
        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            discard(&temp_path).await;
            return Err(CoreError::Io(e));
        }
        Ok(())
    }
}

async fn write_synced(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(payload).await?;
    file.sync_all().await
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), "Failed to clean up temporary store file: {}", e);
        }
    }
}
