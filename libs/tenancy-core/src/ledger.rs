use crate::domain::subscription::{SubscriptionEntry, months_from};
use crate::locks::{TenantGuard, TenantLocks};
use crate::{CoreError, SubscriptionStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// Months granted by a tenant activation.
pub const ACTIVATION_GRANT_MONTHS: u32 = 1;

/// Subscription entries per tenant. Entries are never deleted; validity is
/// `expiry_date > now`.
#[derive(Clone)]
pub struct SubscriptionLedger {
    store: Arc<dyn SubscriptionStore>,
    locks: TenantLocks,
}

impl SubscriptionLedger {
    pub fn new(store: Arc<dyn SubscriptionStore>, locks: TenantLocks) -> Self {
        Self { store, locks }
    }

    pub async fn create(
        &self,
        tenant_id: &str,
        duration_months: u32,
        is_demo: bool,
    ) -> Result<SubscriptionEntry, CoreError> {
        let entry = SubscriptionEntry::for_months(tenant_id, duration_months, is_demo, Utc::now())?;
        self.store.insert(&entry).await?;
        info!(
            tenant_id = %tenant_id,
            subscription_id = %entry.id,
            expiry = %entry.expiry_date,
            is_demo,
            "Subscription created"
        );
        Ok(entry)
    }

    pub async fn create_demo(
        &self,
        tenant_id: &str,
        days: u32,
    ) -> Result<SubscriptionEntry, CoreError> {
        let entry = SubscriptionEntry::demo_for_days(tenant_id, days, Utc::now())?;
        self.store.insert(&entry).await?;
        info!(tenant_id = %tenant_id, subscription_id = %entry.id, "Demo subscription created");
        Ok(entry)
    }

    pub async fn get(&self, subscription_id: &str) -> Result<SubscriptionEntry, CoreError> {
        self.store
            .get(subscription_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Subscription {}", subscription_id)))
    }

    /// Sets a later expiry. Serialized with activation flows of the same tenant.
    pub async fn renew(
        &self,
        subscription_id: &str,
        new_expiry: DateTime<Utc>,
    ) -> Result<SubscriptionEntry, CoreError> {
        let tenant_id = self.get(subscription_id).await?.tenant_id;
        let _guard = self.locks.lock(&tenant_id).await;

        // Re-read under the lock
        let mut entry = self.get(subscription_id).await?;
        entry.renew(new_expiry)?;
        self.store.update(&entry).await?;
        info!(
            subscription_id = %entry.id,
            expiry = %entry.expiry_date,
            "Subscription renewed"
        );
        Ok(entry)
    }

    /// Entries still valid now, latest expiry first.
    pub async fn active_for(&self, tenant_id: &str) -> Result<Vec<SubscriptionEntry>, CoreError> {
        let now = Utc::now();
        let mut active: Vec<_> = self
            .store
            .list_for_tenant(tenant_id)
            .await?
            .into_iter()
            .filter(|entry| entry.is_valid_at(now))
            .collect();
        active.sort_by(|a, b| b.expiry_date.cmp(&a.expiry_date));
        Ok(active)
    }

    /// Activation side effect: push the latest non-demo entry to at least
    /// now + one month, or open a new one if the tenant has none. Requires the
    /// tenant's lock, which the guard proves.
    pub async fn on_activate(&self, guard: &TenantGuard) -> Result<SubscriptionEntry, CoreError> {
        let tenant_id = guard.tenant_id();
        let latest = self
            .store
            .list_for_tenant(tenant_id)
            .await?
            .into_iter()
            .filter(|entry| !entry.is_demo)
            .max_by_key(|entry| entry.expiry_date);

        let Some(mut entry) = latest else {
            return self.create(tenant_id, ACTIVATION_GRANT_MONTHS, false).await;
        };

        let granted = months_from(Utc::now(), ACTIVATION_GRANT_MONTHS)?;
        if granted > entry.expiry_date {
            entry.expiry_date = granted;
            self.store.update(&entry).await?;
            info!(
                tenant_id = %tenant_id,
                subscription_id = %entry.id,
                expiry = %entry.expiry_date,
                "Subscription extended on activation"
            );
        }
        Ok(entry)
    }
}
