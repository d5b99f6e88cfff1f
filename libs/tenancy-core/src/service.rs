//! Operation surface of the control plane. Wires the core components together
//! and keeps raw credentials out of everything it hands back for display.

use crate::activation::ActivationStateMachine;
use crate::adapters::in_memory_subscription_store::InMemorySubscriptionStore;
use crate::adapters::in_memory_tenant_store::InMemoryTenantStore;
use crate::adapters::storage_initializer::NoopStorageInitializer;
use crate::config::TenancySettings;
use crate::directory::TenantDirectory;
use crate::domain::connection_string::{
    ConnectionStringMasker, DbProvider, DefaultConnectionStringValidator, ResolvedConnection,
};
use crate::domain::subscription::SubscriptionEntry;
use crate::domain::tenant::TenantRecord;
use crate::ledger::SubscriptionLedger;
use crate::locks::TenantLocks;
use crate::provisioning::{CreateTenantRequest, ProvisioningOrchestrator};
use crate::registry::ConnectionStringRegistry;
use crate::{
    ConnectionStringSecurer, ConnectionStringValidator, CoreError, NotificationQueue,
    StorageInitializer, SubscriptionStore, TenantStore,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// The collaborators a deployment plugs in.
#[derive(Clone)]
pub struct Adapters {
    pub tenants: Arc<dyn TenantStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub initializer: Arc<dyn StorageInitializer>,
    pub notifications: Arc<dyn NotificationQueue>,
    pub validator: Arc<dyn ConnectionStringValidator>,
    pub securer: Arc<dyn ConnectionStringSecurer>,
}

impl Adapters {
    /// In-memory stores, no storage preparation, default grammar and masking.
    pub fn in_memory(notifications: Arc<dyn NotificationQueue>) -> Self {
        Self {
            tenants: Arc::new(InMemoryTenantStore::default()),
            subscriptions: Arc::new(InMemorySubscriptionStore::default()),
            initializer: Arc::new(NoopStorageInitializer),
            notifications,
            validator: Arc::new(DefaultConnectionStringValidator),
            securer: Arc::new(ConnectionStringMasker),
        }
    }
}

#[derive(Clone)]
pub struct TenantService {
    directory: TenantDirectory,
    ledger: SubscriptionLedger,
    activation: ActivationStateMachine,
    provisioning: ProvisioningOrchestrator,
    registry: ConnectionStringRegistry,
    securer: Arc<dyn ConnectionStringSecurer>,
    settings: Arc<TenancySettings>,
}

impl TenantService {
    pub fn new(settings: TenancySettings, adapters: Adapters) -> Self {
        let settings = Arc::new(settings);
        let locks = TenantLocks::default();
        let directory = TenantDirectory::new(
            adapters.tenants,
            settings.cache_capacity,
            settings.cache_ttl_seconds,
        );
        let ledger = SubscriptionLedger::new(adapters.subscriptions, locks.clone());
        let activation = ActivationStateMachine::new(directory.clone(), ledger.clone(), locks);
        let provisioning = ProvisioningOrchestrator::new(
            directory.clone(),
            ledger.clone(),
            adapters.initializer,
            adapters.notifications,
            adapters.validator.clone(),
            settings.clone(),
        );
        let registry =
            ConnectionStringRegistry::new(settings.connection_store_path.clone(), adapters.validator);

        Self {
            directory,
            ledger,
            activation,
            provisioning,
            registry,
            securer: adapters.securer,
            settings,
        }
    }

    pub fn settings(&self) -> &TenancySettings {
        &self.settings
    }

    pub fn registry(&self) -> &ConnectionStringRegistry {
        &self.registry
    }

    // --- Tenants ---

    pub async fn list(&self) -> Result<Vec<TenantRecord>, CoreError> {
        let records = self.directory.list().await?;
        Ok(records.into_iter().map(|r| self.secure(r)).collect())
    }

    pub async fn get_by_id(&self, id: &str) -> Result<TenantRecord, CoreError> {
        let record = self.directory.get(id).await?;
        Ok(self.secure(record))
    }

    /// Tenant a request resolved to, masked. `None` when the identifier is unknown.
    pub async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<TenantRecord>, CoreError> {
        let record = self.directory.find_by_identifier(identifier).await?;
        Ok(record.map(|r| self.secure(r)))
    }

    pub async fn exists_with_id(&self, id: &str) -> Result<bool, CoreError> {
        Ok(self.directory.find(id).await?.is_some())
    }

    pub async fn exists_with_name(&self, name: &str) -> Result<bool, CoreError> {
        Ok(self.directory.list().await?.iter().any(|r| r.name == name))
    }

    pub async fn create(&self, request: CreateTenantRequest) -> Result<String, CoreError> {
        self.provisioning.create_tenant(request).await
    }

    pub async fn activate(&self, id: &str) -> Result<(), CoreError> {
        self.activation.activate(id).await
    }

    pub async fn deactivate(&self, id: &str) -> Result<(), CoreError> {
        self.activation.deactivate(id).await
    }

    // --- Subscriptions ---

    pub async fn renew_subscription(
        &self,
        subscription_id: &str,
        new_expiry: DateTime<Utc>,
    ) -> Result<SubscriptionEntry, CoreError> {
        self.ledger.renew(subscription_id, new_expiry).await
    }

    pub async fn active_subscriptions(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<SubscriptionEntry>, CoreError> {
        self.ledger.active_for(tenant_id).await
    }

    // --- Connection strings ---

    pub async fn save_connection_string(
        &self,
        tenant_key: &str,
        environment: &str,
        provider: DbProvider,
        connection_string: &str,
    ) -> Result<(), CoreError> {
        self.registry
            .save(tenant_key, environment, provider, connection_string)
            .await
    }

    pub async fn remove_connection_strings(&self, tenant_key: &str) -> Result<usize, CoreError> {
        self.registry.remove(tenant_key).await
    }

    /// Where the tenant's traffic goes: its own connection string, then the
    /// registry entry for its key in the configured environment, then the shared pool.
    pub async fn connection_for(&self, tenant_id: &str) -> Result<ResolvedConnection, CoreError> {
        let record = self.directory.get(tenant_id).await?;
        if !record.uses_shared_database() {
            return Ok(ResolvedConnection::Dedicated {
                provider: self.settings.db_provider,
                connection_string: record.connection_string,
            });
        }

        match self
            .registry
            .resolve(&record.key(), &self.settings.environment)
            .await
        {
            Ok(resolved) => Ok(resolved),
            Err(CoreError::NotFound(what)) => {
                debug!(tenant_id = %tenant_id, "{} missing, using shared default", what);
                Ok(ResolvedConnection::SharedDefault)
            }
            Err(e) => Err(e),
        }
    }

    /// [`Self::connection_for`] with credentials masked.
    pub async fn display_connection_for(
        &self,
        tenant_id: &str,
    ) -> Result<ResolvedConnection, CoreError> {
        Ok(match self.connection_for(tenant_id).await? {
            ResolvedConnection::Dedicated {
                provider,
                connection_string,
            } => ResolvedConnection::Dedicated {
                provider,
                connection_string: self.securer.make_secure(&connection_string, provider),
            },
            ResolvedConnection::SharedDefault => ResolvedConnection::SharedDefault,
        })
    }

    fn secure(&self, mut record: TenantRecord) -> TenantRecord {
        record.connection_string = self
            .securer
            .make_secure(&record.connection_string, self.settings.db_provider);
        record
    }
}
