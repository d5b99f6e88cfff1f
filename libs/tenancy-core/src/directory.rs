use crate::domain::tenant::TenantRecord;
use crate::{CoreError, TenantStore};
use moka::future::Cache as MokaCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Authoritative tenant lookup with a read-through cache keyed by id.
///
/// The cache only ever serves reads. Uniqueness stays with the store, and every
/// write invalidates the affected id.
#[derive(Clone)]
pub struct TenantDirectory {
    store: Arc<dyn TenantStore>,
    cache: MokaCache<String, TenantRecord>,
}

impl TenantDirectory {
    pub fn new(store: Arc<dyn TenantStore>, cache_capacity: u64, cache_ttl_seconds: u64) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(cache_capacity)
            .time_to_live(Duration::from_secs(cache_ttl_seconds))
            .build();
        Self { store, cache }
    }

    pub async fn add(&self, record: &TenantRecord) -> Result<(), CoreError> {
        self.store.add(record).await?;
        self.cache.invalidate(&record.id).await;
        info!(tenant_id = %record.id, "Tenant added to directory");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<TenantRecord, CoreError> {
        self.find(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Tenant {}", id)))
    }

    pub async fn find(&self, id: &str) -> Result<Option<TenantRecord>, CoreError> {
        if let Some(record) = self.cache.get(id).await {
            debug!(tenant_id = %id, "directory cache hit");
            return Ok(Some(record));
        }
        let record = self.store.get(id).await?;
        if let Some(record) = &record {
            self.cache.insert(id.to_string(), record.clone()).await;
        }
        Ok(record)
    }

    /// Bypasses the cache. State transitions decide on this, never on a cached copy.
    pub(crate) async fn get_uncached(&self, id: &str) -> Result<TenantRecord, CoreError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Tenant {}", id)))
    }

    /// Lookup by routing identifier, the value a request carries.
    pub async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<TenantRecord>, CoreError> {
        // Identifier and id coincide for every record created here
        if let Some(record) = self.cache.get(identifier).await {
            if record.identifier == identifier {
                return Ok(Some(record));
            }
        }
        self.store.get_by_identifier(identifier).await
    }

    pub async fn list(&self) -> Result<Vec<TenantRecord>, CoreError> {
        self.store.list().await
    }

    pub async fn update(&self, record: &TenantRecord) -> Result<(), CoreError> {
        let result = self.store.update(record).await;
        self.cache.invalidate(&record.id).await;
        result
    }

    /// Only for compensating a failed provisioning.
    pub(crate) async fn remove(&self, id: &str) -> Result<bool, CoreError> {
        let removed = self.store.remove(id).await;
        self.cache.invalidate(id).await;
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory_tenant_store::InMemoryTenantStore;

    fn directory_over(store: &InMemoryTenantStore) -> TenantDirectory {
        TenantDirectory::new(Arc::new(store.clone()), 100, 60)
    }

    fn acme() -> TenantRecord {
        TenantRecord::new("acme", "Acme Co", None, "a@acme.io", None).unwrap()
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let directory = directory_over(&InMemoryTenantStore::default());
        match directory.get("ghost").await {
            Err(CoreError::NotFound(msg)) => assert!(msg.contains("ghost")),
            other => panic!("Expected NotFound error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_twice_is_duplicate() {
        let directory = directory_over(&InMemoryTenantStore::default());
        directory.add(&acme()).await.unwrap();
        let second = directory.add(&acme()).await;
        assert!(matches!(second, Err(CoreError::DuplicateKey(_))));
    }

    #[tokio::test]
    async fn test_update_invalidates_cache() {
        let store = InMemoryTenantStore::default();
        let directory = directory_over(&store);
        directory.add(&acme()).await.unwrap();

        // Warm the cache
        let mut cached = directory.get("acme").await.unwrap();
        assert!(cached.is_active);

        cached.is_active = false;
        directory.update(&cached).await.unwrap();
        assert!(!directory.get("acme").await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_remove_invalidates_cache() {
        let store = InMemoryTenantStore::default();
        let directory = directory_over(&store);
        directory.add(&acme()).await.unwrap();
        directory.get("acme").await.unwrap();

        assert!(directory.remove("acme").await.unwrap());
        assert!(directory.find("acme").await.unwrap().is_none());
        assert!(directory.find_by_identifier("acme").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let directory = directory_over(&InMemoryTenantStore::default());
        let result = directory.update(&acme()).await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list() {
        let directory = directory_over(&InMemoryTenantStore::default());
        directory.add(&acme()).await.unwrap();
        directory
            .add(&TenantRecord::new("globex", "Globex", None, "g@globex.io", None).unwrap())
            .await
            .unwrap();
        assert_eq!(directory.list().await.unwrap().len(), 2);
    }
}
