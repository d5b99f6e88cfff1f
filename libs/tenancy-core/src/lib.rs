use async_trait::async_trait;
use std::error::Error as StdError;

// Declare modules
pub mod activation;
pub mod adapters;
pub mod config;
pub mod directory;
pub mod domain;
pub mod ledger;
pub mod locks;
pub mod provisioning;
pub mod registry;
pub mod resolver;
pub mod service;

use domain::connection_string::DbProvider;
use domain::notification::WelcomeNotification;
use domain::subscription::SubscriptionEntry;
use domain::tenant::{TenantInfo, TenantRecord};

// Common error type for the tenancy control plane
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Infrastructure error: {0}")]
    Infrastructure(#[from] Box<dyn StdError + Send + Sync>),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

// Implement From<TenantError> for CoreError
impl From<domain::tenant::TenantError> for CoreError {
    fn from(err: domain::tenant::TenantError) -> Self {
        use domain::tenant::TenantError;
        match err {
            TenantError::Core(ce) => ce,
            TenantError::RootTenantProtected(id) => {
                CoreError::InvalidOperation(format!("Tenant {} is protected", id))
            }
            TenantError::AlreadyActive(id) => {
                CoreError::Conflict(format!("Tenant {} is already activated", id))
            }
            TenantError::AlreadyInactive(id) => {
                CoreError::Conflict(format!("Tenant {} is already deactivated", id))
            }
            TenantError::InvalidInput(msg) => CoreError::Validation(msg),
        }
    }
}

// Implement From<SubscriptionError> for CoreError
impl From<domain::subscription::SubscriptionError> for CoreError {
    fn from(err: domain::subscription::SubscriptionError) -> Self {
        use domain::subscription::SubscriptionError;
        match err {
            SubscriptionError::Core(ce) => ce,
            SubscriptionError::Backdated { current, requested } => CoreError::Validation(
                format!(
                    "Subscription cannot be backdated: current expiry {}, requested {}",
                    current, requested
                ),
            ),
            SubscriptionError::InvalidDuration(msg) => CoreError::Validation(msg),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

// Port for the durable tenant store behind the directory
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Insert a new record. The identifier uniqueness check must be part of the
    /// insert itself, never a separate lookup.
    async fn add(&self, record: &TenantRecord) -> Result<(), CoreError>;
    async fn get(&self, id: &str) -> Result<Option<TenantRecord>, CoreError>;
    async fn get_by_identifier(&self, identifier: &str)
        -> Result<Option<TenantRecord>, CoreError>;
    async fn list(&self) -> Result<Vec<TenantRecord>, CoreError>;
    /// Full replace keyed by id. Returns `NotFound` for an unknown id.
    async fn update(&self, record: &TenantRecord) -> Result<(), CoreError>;
    /// Returns whether a record was removed.
    async fn remove(&self, id: &str) -> Result<bool, CoreError>;
}

// Port for the durable subscription store behind the ledger
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn insert(&self, entry: &SubscriptionEntry) -> Result<(), CoreError>;
    async fn get(&self, id: &str) -> Result<Option<SubscriptionEntry>, CoreError>;
    async fn update(&self, entry: &SubscriptionEntry) -> Result<(), CoreError>;
    async fn list_for_tenant(&self, tenant_id: &str) -> Result<Vec<SubscriptionEntry>, CoreError>;
}

// Port for the downstream per-tenant storage initializer
#[async_trait]
pub trait StorageInitializer: Send + Sync {
    async fn initialize(&self, tenant: &dyn TenantInfo) -> Result<(), CoreError>;
}

// Port for provider-specific connection string grammar checks
pub trait ConnectionStringValidator: Send + Sync {
    fn try_validate(&self, connection_string: &str, provider: DbProvider) -> bool;
}

// Port for hiding credentials before a connection string leaves the core
pub trait ConnectionStringSecurer: Send + Sync {
    fn make_secure(&self, connection_string: &str, provider: DbProvider) -> String;
}

/// Fire-and-forget submission of a notification job. Implementations must not
/// wait for delivery.
pub trait NotificationQueue: Send + Sync {
    fn enqueue(&self, job: WelcomeNotification) -> Result<(), CoreError>;
}

// Port for whatever actually delivers a notification (mail, webhook, ...)
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, job: &WelcomeNotification) -> Result<(), CoreError>;
}
