use crate::domain::subscription::SubscriptionEntry;
use crate::{CoreError, SubscriptionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(sqlx::FromRow, Debug)]
struct SubscriptionRow {
    id: String,
    tenant_id: String,
    expiry_date: DateTime<Utc>,
    is_demo: bool,
}

impl From<SubscriptionRow> for SubscriptionEntry {
    fn from(row: SubscriptionRow) -> Self {
        SubscriptionEntry {
            id: row.id,
            tenant_id: row.tenant_id,
            expiry_date: row.expiry_date,
            is_demo: row.is_demo,
        }
    }
}

/// PostgreSQL implementation of the SubscriptionStore port using sqlx.
#[derive(Debug, Clone)]
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn infra(e: sqlx::Error) -> CoreError {
    CoreError::Infrastructure(Box::new(e))
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn insert(&self, entry: &SubscriptionEntry) -> Result<(), CoreError> {
        let result = sqlx::query(
            "INSERT INTO tenant_subscriptions (id, tenant_id, expiry_date, is_demo)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&entry.id)
        .bind(&entry.tenant_id)
        .bind(entry.expiry_date)
        .bind(entry.is_demo)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(CoreError::DuplicateKey(entry.id.clone()))
            }
            Err(e) => Err(infra(e)),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<SubscriptionEntry>, CoreError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            "SELECT id, tenant_id, expiry_date, is_demo FROM tenant_subscriptions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;
        Ok(row.map(SubscriptionEntry::from))
    }

    async fn update(&self, entry: &SubscriptionEntry) -> Result<(), CoreError> {
        let result = sqlx::query(
            "UPDATE tenant_subscriptions SET expiry_date = $2, is_demo = $3 WHERE id = $1",
        )
        .bind(&entry.id)
        .bind(entry.expiry_date)
        .bind(entry.is_demo)
        .execute(&self.pool)
        .await
        .map_err(infra)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Subscription {}", entry.id)));
        }
        Ok(())
    }

    async fn list_for_tenant(&self, tenant_id: &str) -> Result<Vec<SubscriptionEntry>, CoreError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(
            "SELECT id, tenant_id, expiry_date, is_demo FROM tenant_subscriptions
             WHERE tenant_id = $1 ORDER BY expiry_date DESC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;
        Ok(rows.into_iter().map(SubscriptionEntry::from).collect())
    }
}
