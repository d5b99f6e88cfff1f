// Declare modules within the adapters directory
pub mod in_memory_notification_queue;
pub mod in_memory_subscription_store;
pub mod in_memory_tenant_store;
pub mod postgres_subscription_store;
pub mod postgres_tenant_store;
pub mod storage_initializer;

#[cfg(test)]
pub(crate) mod postgres_test_support;

/// Schema migrations for the PostgreSQL adapters.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
