use crate::domain::subscription::SubscriptionEntry;
use crate::{CoreError, SubscriptionStore};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// In-memory implementation of the SubscriptionStore port.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionStore {
    // Store: Subscription ID -> entry
    entries: Arc<DashMap<String, SubscriptionEntry>>,
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn insert(&self, entry: &SubscriptionEntry) -> Result<(), CoreError> {
        match self.entries.entry(entry.id.clone()) {
            Entry::Occupied(_) => Err(CoreError::DuplicateKey(entry.id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<SubscriptionEntry>, CoreError> {
        Ok(self.entries.get(id).map(|e| e.value().clone()))
    }

    async fn update(&self, entry: &SubscriptionEntry) -> Result<(), CoreError> {
        match self.entries.get_mut(&entry.id) {
            Some(mut existing) => {
                *existing = entry.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("Subscription {}", entry.id))),
        }
    }

    async fn list_for_tenant(&self, tenant_id: &str) -> Result<Vec<SubscriptionEntry>, CoreError> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.value().tenant_id == tenant_id)
            .map(|e| e.value().clone())
            .collect())
    }
}
