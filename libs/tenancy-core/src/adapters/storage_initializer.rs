use crate::domain::tenant::TenantInfo;
use crate::{CoreError, StorageInitializer};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

/// Initializer for deployments where tenant storage needs no preparation
/// (in-memory mode, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStorageInitializer;

#[async_trait]
impl StorageInitializer for NoopStorageInitializer {
    async fn initialize(&self, tenant: &dyn TenantInfo) -> Result<(), CoreError> {
        info!(tenant_id = %tenant.id(), "No storage to initialize");
        Ok(())
    }
}

/// Creates a per-tenant schema in the shared PostgreSQL database.
#[derive(Debug, Clone)]
pub struct PostgresSchemaInitializer {
    pool: PgPool,
}

impl PostgresSchemaInitializer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `tenant_` followed by the id with everything but ASCII alphanumerics
/// replaced by underscores.
pub fn schema_name(tenant_id: &str) -> String {
    let sanitized: String = tenant_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("tenant_{}", sanitized)
}

#[async_trait]
impl StorageInitializer for PostgresSchemaInitializer {
    async fn initialize(&self, tenant: &dyn TenantInfo) -> Result<(), CoreError> {
        let schema = schema_name(tenant.id());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CoreError::Infrastructure(Box::new(e)))?;

        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS \"{schema}\""))
            .execute(&mut *tx)
            .await
            .map_err(|e| CoreError::Infrastructure(Box::new(e)))?;

        sqlx::query(&format!(
            r#"CREATE TABLE IF NOT EXISTS "{schema}".tenant_settings (
                key   VARCHAR(128) PRIMARY KEY,
                value TEXT NOT NULL
            )"#
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| CoreError::Infrastructure(Box::new(e)))?;

        tx.commit()
            .await
            .map_err(|e| CoreError::Infrastructure(Box::new(e)))?;

        info!(tenant_id = %tenant.id(), schema = %schema, "Tenant schema initialized");
        Ok(())
    }
}
