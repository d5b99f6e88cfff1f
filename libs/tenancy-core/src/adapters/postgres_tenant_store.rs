use crate::domain::tenant::TenantRecord;
use crate::{CoreError, TenantStore};
use async_trait::async_trait;
use sqlx::PgPool;

// Row shape of the `tenants` table
#[derive(sqlx::FromRow, Debug)]
struct TenantRow {
    id: String,
    identifier: String,
    name: String,
    connection_string: String,
    admin_email: String,
    is_active: bool,
    issuer: Option<String>,
}

impl From<TenantRow> for TenantRecord {
    fn from(row: TenantRow) -> Self {
        TenantRecord {
            id: row.id,
            identifier: row.identifier,
            name: row.name,
            connection_string: row.connection_string,
            admin_email: row.admin_email,
            is_active: row.is_active,
            issuer: row.issuer,
        }
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, identifier, name, connection_string, admin_email, is_active, issuer FROM tenants";

/// PostgreSQL implementation of the TenantStore port using sqlx.
/// Identifier uniqueness is the table's UNIQUE constraint.
#[derive(Debug, Clone)]
pub struct PostgresTenantStore {
    pool: PgPool,
}

impl PostgresTenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn infra(e: sqlx::Error) -> CoreError {
    CoreError::Infrastructure(Box::new(e))
}

#[async_trait]
impl TenantStore for PostgresTenantStore {
    async fn add(&self, record: &TenantRecord) -> Result<(), CoreError> {
        let result = sqlx::query(
            "INSERT INTO tenants (id, identifier, name, connection_string, admin_email, is_active, issuer)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&record.id)
        .bind(&record.identifier)
        .bind(&record.name)
        .bind(&record.connection_string)
        .bind(&record.admin_email)
        .bind(record.is_active)
        .bind(&record.issuer)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(CoreError::DuplicateKey(record.identifier.clone()))
            }
            Err(e) => Err(infra(e)),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<TenantRecord>, CoreError> {
        let row: Option<TenantRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;
        Ok(row.map(TenantRecord::from))
    }

    async fn get_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<TenantRecord>, CoreError> {
        let row: Option<TenantRow> =
            sqlx::query_as(&format!("{} WHERE identifier = $1", SELECT_COLUMNS))
                .bind(identifier)
                .fetch_optional(&self.pool)
                .await
                .map_err(infra)?;
        Ok(row.map(TenantRecord::from))
    }

    async fn list(&self) -> Result<Vec<TenantRecord>, CoreError> {
        let rows: Vec<TenantRow> = sqlx::query_as(&format!("{} ORDER BY id", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?;
        Ok(rows.into_iter().map(TenantRecord::from).collect())
    }

    async fn update(&self, record: &TenantRecord) -> Result<(), CoreError> {
        // The identifier is part of the key and never rewritten
        let result = sqlx::query(
            "UPDATE tenants
             SET name = $2, connection_string = $3, admin_email = $4, is_active = $5,
                 issuer = $6, updated_at = NOW()
             WHERE id = $1 AND identifier = $7",
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.connection_string)
        .bind(&record.admin_email)
        .bind(record.is_active)
        .bind(&record.issuer)
        .bind(&record.identifier)
        .execute(&self.pool)
        .await
        .map_err(infra)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Tenant {}", record.id)));
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        Ok(result.rows_affected() > 0)
    }
}
