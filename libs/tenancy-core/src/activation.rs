use crate::CoreError;
use crate::directory::TenantDirectory;
use crate::domain::tenant::{ROOT_TENANT_ID, TenantError};
use crate::ledger::SubscriptionLedger;
use crate::locks::TenantLocks;
use tracing::info;

/// Active/Inactive transitions of a tenant. The root tenant never transitions,
/// and activation renews billing through the ledger.
#[derive(Clone)]
pub struct ActivationStateMachine {
    directory: TenantDirectory,
    ledger: SubscriptionLedger,
    locks: TenantLocks,
}

impl ActivationStateMachine {
    pub fn new(directory: TenantDirectory, ledger: SubscriptionLedger, locks: TenantLocks) -> Self {
        Self {
            directory,
            ledger,
            locks,
        }
    }

    pub async fn activate(&self, id: &str) -> Result<(), CoreError> {
        if id == ROOT_TENANT_ID {
            return Err(TenantError::RootTenantProtected(id.to_string()).into());
        }
        let guard = self.locks.lock(id).await;

        let mut record = self.directory.get_uncached(id).await?;
        record.activate()?;
        // Billing moves first; a retry after a failed update re-grants at most now + one month
        let subscription = self.ledger.on_activate(&guard).await?;
        self.directory.update(&record).await?;

        info!(
            tenant_id = %id,
            valid_until = %subscription.expiry_date,
            "Tenant {} is now activated", id
        );
        Ok(())
    }

    pub async fn deactivate(&self, id: &str) -> Result<(), CoreError> {
        if id == ROOT_TENANT_ID {
            return Err(TenantError::RootTenantProtected(id.to_string()).into());
        }
        let _guard = self.locks.lock(id).await;

        let mut record = self.directory.get_uncached(id).await?;
        record.deactivate()?;
        self.directory.update(&record).await?;

        info!(tenant_id = %id, "Tenant {} is now deactivated", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory_subscription_store::InMemorySubscriptionStore;
    use crate::adapters::in_memory_tenant_store::InMemoryTenantStore;
    use crate::domain::tenant::TenantRecord;
    use crate::{SubscriptionStore, TenantStore};
    use async_trait::async_trait;
    use chrono::{Duration, Months, Utc};
    use futures_util::future::join_all;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Fixture {
        machine: ActivationStateMachine,
        directory: TenantDirectory,
        subscriptions: InMemorySubscriptionStore,
    }

    async fn fixture() -> Fixture {
        let locks = TenantLocks::default();
        let directory = TenantDirectory::new(Arc::new(InMemoryTenantStore::default()), 100, 60);
        let subscriptions = InMemorySubscriptionStore::default();
        let ledger = SubscriptionLedger::new(Arc::new(subscriptions.clone()), locks.clone());
        directory
            .add(&TenantRecord::new("acme", "Acme Co", None, "a@acme.io", None).unwrap())
            .await
            .unwrap();
        directory
            .add(&TenantRecord::new(ROOT_TENANT_ID, "Root", None, "admin@root.com", None).unwrap())
            .await
            .unwrap();
        Fixture {
            machine: ActivationStateMachine::new(directory.clone(), ledger, locks),
            directory,
            subscriptions,
        }
    }

    #[tokio::test]
    async fn test_activate_when_active_is_conflict() {
        let f = fixture().await;
        let result = f.machine.activate("acme").await;
        assert!(matches!(result, Err(CoreError::Conflict(_))));
        assert!(f.subscriptions.list_for_tenant("acme").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deactivate_then_activate() {
        let f = fixture().await;
        f.machine.deactivate("acme").await.unwrap();
        assert!(!f.directory.get("acme").await.unwrap().is_active);

        let again = f.machine.deactivate("acme").await;
        assert!(matches!(again, Err(CoreError::Conflict(_))));

        f.machine.activate("acme").await.unwrap();
        assert!(f.directory.get("acme").await.unwrap().is_active);
        let entries = f.subscriptions.list_for_tenant("acme").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_demo);
    }

    #[tokio::test]
    async fn test_root_tenant_is_protected() {
        let f = fixture().await;
        let activate = f.machine.activate(ROOT_TENANT_ID).await;
        assert!(matches!(activate, Err(CoreError::InvalidOperation(_))));
        let deactivate = f.machine.deactivate(ROOT_TENANT_ID).await;
        assert!(matches!(deactivate, Err(CoreError::InvalidOperation(_))));
        assert!(f.directory.get(ROOT_TENANT_ID).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_unknown_tenant_is_not_found() {
        let f = fixture().await;
        let result = f.machine.deactivate("ghost").await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_activations_apply_once() {
        let f = fixture().await;
        f.machine.deactivate("acme").await.unwrap();

        let attempts = (0..8).map(|_| {
            let machine = f.machine.clone();
            tokio::spawn(async move { machine.activate("acme").await })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(CoreError::Conflict(_))))
                .count(),
            7
        );
        assert_eq!(f.subscriptions.list_for_tenant("acme").await.unwrap().len(), 1);
    }

    // Fails the next update once, then behaves like the in-memory store
    #[derive(Default)]
    struct FlakyTenantStore {
        inner: InMemoryTenantStore,
        fail_next_update: AtomicBool,
    }

    #[async_trait]
    impl TenantStore for FlakyTenantStore {
        async fn add(&self, record: &TenantRecord) -> Result<(), CoreError> {
            self.inner.add(record).await
        }

        async fn get(&self, id: &str) -> Result<Option<TenantRecord>, CoreError> {
            self.inner.get(id).await
        }

        async fn get_by_identifier(
            &self,
            identifier: &str,
        ) -> Result<Option<TenantRecord>, CoreError> {
            self.inner.get_by_identifier(identifier).await
        }

        async fn list(&self) -> Result<Vec<TenantRecord>, CoreError> {
            self.inner.list().await
        }

        async fn update(&self, record: &TenantRecord) -> Result<(), CoreError> {
            if self.fail_next_update.swap(false, Ordering::SeqCst) {
                return Err(CoreError::Internal("tenant store unavailable".into()));
            }
            self.inner.update(record).await
        }

        async fn remove(&self, id: &str) -> Result<bool, CoreError> {
            self.inner.remove(id).await
        }
    }

    fn about_one_month_from_now(expiry: chrono::DateTime<Utc>) -> bool {
        let expected = Utc::now().checked_add_months(Months::new(1)).unwrap();
        (expected - expiry).num_seconds().abs() < 5
    }

    #[tokio::test]
    async fn test_retry_after_failed_update_does_not_double_grant() {
        let store = Arc::new(FlakyTenantStore::default());
        let locks = TenantLocks::default();
        let directory = TenantDirectory::new(store.clone(), 100, 60);
        let subscriptions = InMemorySubscriptionStore::default();
        let ledger = SubscriptionLedger::new(Arc::new(subscriptions.clone()), locks.clone());
        let machine = ActivationStateMachine::new(directory.clone(), ledger, locks);

        directory
            .add(&TenantRecord::new("acme", "Acme Co", None, "a@acme.io", None).unwrap())
            .await
            .unwrap();
        machine.deactivate("acme").await.unwrap();

        store.fail_next_update.store(true, Ordering::SeqCst);
        let failed = machine.activate("acme").await;
        assert!(matches!(failed, Err(CoreError::Internal(_))));
        assert!(!directory.get("acme").await.unwrap().is_active);
        let granted = subscriptions.list_for_tenant("acme").await.unwrap();
        assert_eq!(granted.len(), 1);
        assert!(about_one_month_from_now(granted[0].expiry_date));

        machine.activate("acme").await.unwrap();
        assert!(directory.get("acme").await.unwrap().is_active);
        let after_retry = subscriptions.list_for_tenant("acme").await.unwrap();
        assert_eq!(after_retry.len(), 1);
        assert_eq!(after_retry[0].id, granted[0].id);
        assert!(about_one_month_from_now(after_retry[0].expiry_date));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_renew_and_activate_on_same_tenant_keep_later_expiry() {
        for _ in 0..20 {
            let f = fixture().await;
            f.machine.deactivate("acme").await.unwrap();
            let entry = f.machine.ledger.create("acme", 1, false).await.unwrap();
            let yearly = Utc::now() + Duration::days(365);

            let ledger = f.machine.ledger.clone();
            let subscription_id = entry.id.clone();
            let renew = tokio::spawn(async move { ledger.renew(&subscription_id, yearly).await });
            let machine = f.machine.clone();
            let activate = tokio::spawn(async move { machine.activate("acme").await });

            renew.await.unwrap().unwrap();
            activate.await.unwrap().unwrap();

            let entries = f.subscriptions.list_for_tenant("acme").await.unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].expiry_date, yearly);
            assert!(f.directory.get("acme").await.unwrap().is_active);
        }
    }
}
