//! Tenant creation saga.
//!
//! Steps: normalize the request, insert the directory record, open the initial
//! subscription, initialize downstream storage, enqueue the welcome notification.
//! A failure from storage initialization removes the directory record again and
//! is returned unchanged. The subscription opened in step three is kept: entries
//! are never deleted. Once validation passes the writing steps run detached from
//! the caller.

use crate::config::TenancySettings;
use crate::directory::TenantDirectory;
use crate::domain::notification::WelcomeNotification;
use crate::domain::tenant::TenantRecord;
use crate::ledger::SubscriptionLedger;
use crate::{ConnectionStringValidator, CoreError, NotificationQueue, StorageInitializer};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Months granted to every new tenant.
pub const INITIAL_SUBSCRIPTION_MONTHS: u32 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTenantRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub connection_string: Option<String>,
    pub admin_email: String,
    #[serde(default)]
    pub issuer: Option<String>,
}

#[derive(Clone)]
pub struct ProvisioningOrchestrator {
    directory: TenantDirectory,
    ledger: SubscriptionLedger,
    initializer: Arc<dyn StorageInitializer>,
    notifications: Arc<dyn NotificationQueue>,
    validator: Arc<dyn ConnectionStringValidator>,
    settings: Arc<TenancySettings>,
}

impl ProvisioningOrchestrator {
    pub fn new(
        directory: TenantDirectory,
        ledger: SubscriptionLedger,
        initializer: Arc<dyn StorageInitializer>,
        notifications: Arc<dyn NotificationQueue>,
        validator: Arc<dyn ConnectionStringValidator>,
        settings: Arc<TenancySettings>,
    ) -> Self {
        Self {
            directory,
            ledger,
            initializer,
            notifications,
            validator,
            settings,
        }
    }

    /// Runs the saga and returns the new tenant id.
    ///
    /// Validation happens on the caller. Everything that writes runs on its own
    /// task, so dropping the returned future never leaves a half-provisioned
    /// tenant: the saga either completes or compensates regardless.
    pub async fn create_tenant(&self, request: CreateTenantRequest) -> Result<String, CoreError> {
        let connection_string = self.normalize_connection_string(request.connection_string);
        if !connection_string.is_empty()
            && !self
                .validator
                .try_validate(&connection_string, self.settings.db_provider)
        {
            return Err(CoreError::Validation(format!(
                "Invalid connection string for tenant {}",
                request.id
            )));
        }

        let record = TenantRecord::new(
            request.id,
            request.name,
            Some(connection_string),
            request.admin_email,
            request.issuer,
        )?;

        let saga = self.clone();
        tokio::spawn(async move { saga.provision(record).await })
            .await
            .map_err(|e| CoreError::Internal(format!("Provisioning task failed: {}", e)))?
    }

    async fn provision(&self, record: TenantRecord) -> Result<String, CoreError> {
        // Duplicate identifiers stop here, nothing written yet
        self.directory.add(&record).await?;

        let subscription = match self
            .ledger
            .create(&record.id, INITIAL_SUBSCRIPTION_MONTHS, false)
            .await
        {
            Ok(subscription) => subscription,
            Err(e) => {
                compensate(&self.directory, &record.id).await;
                return Err(e);
            }
        };

        if let Err(e) = self.initializer.initialize(&record).await {
            error!(tenant_id = %record.id, "Storage initialization failed: {}", e);
            compensate(&self.directory, &record.id).await;
            return Err(e);
        }

        let notification = WelcomeNotification {
            tenant_id: record.id.clone(),
            tenant_name: record.name.clone(),
            admin_email: record.admin_email.clone(),
            subscription_expiry: subscription.expiry_date,
            site_url: self.settings.site_url(subscription.is_demo, &record.key()),
        };
        if let Err(e) = self.notifications.enqueue(notification) {
            warn!(tenant_id = %record.id, "Welcome notification not enqueued: {}", e);
        }

        info!(tenant_id = %record.id, "Tenant provisioned");
        Ok(record.id)
    }

    /// The platform's own connection string is stored as empty, meaning the shared pool.
    fn normalize_connection_string(&self, connection_string: Option<String>) -> String {
        let connection_string = connection_string.unwrap_or_default();
        if connection_string.trim() == self.settings.default_connection_string.trim() {
            String::new()
        } else {
            connection_string
        }
    }
}

async fn compensate(directory: &TenantDirectory, tenant_id: &str) {
    match directory.remove(tenant_id).await {
        Ok(_) => warn!(tenant_id = %tenant_id, "Provisioning compensated: tenant record removed"),
        Err(e) => error!(
            tenant_id = %tenant_id,
            "Compensation failed, tenant record left behind: {}", e
        ),
    }
}
