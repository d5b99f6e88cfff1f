use crate::domain::tenant::TenantRecord;
use crate::{CoreError, TenantStore};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// In-memory implementation of the TenantStore port for testing and single-executable mode.
/// The identifier index is the unique constraint: an identifier is claimed through the
/// map's entry API before the record is written.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTenantStore {
    // Store: Tenant ID -> record
    records: Arc<DashMap<String, TenantRecord>>,
    // Index: Identifier -> Tenant ID
    identifiers: Arc<DashMap<String, String>>,
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn add(&self, record: &TenantRecord) -> Result<(), CoreError> {
        match self.identifiers.entry(record.identifier.clone()) {
            Entry::Occupied(_) => {
                return Err(CoreError::DuplicateKey(record.identifier.clone()));
            }
            Entry::Vacant(slot) => {
                slot.insert(record.id.clone());
            }
        }

        match self.records.entry(record.id.clone()) {
            Entry::Occupied(_) => {
                // Release the identifier claimed above
                self.identifiers.remove(&record.identifier);
                Err(CoreError::DuplicateKey(record.id.clone()))
            }
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<TenantRecord>, CoreError> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    async fn get_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<TenantRecord>, CoreError> {
        let Some(id) = self.identifiers.get(identifier).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        self.get(&id).await
    }

    async fn list(&self) -> Result<Vec<TenantRecord>, CoreError> {
        Ok(self.records.iter().map(|e| e.value().clone()).collect())
    }

    async fn update(&self, record: &TenantRecord) -> Result<(), CoreError> {
        match self.records.get_mut(&record.id) {
            Some(mut existing) => {
                if existing.identifier != record.identifier {
                    return Err(CoreError::Validation(format!(
                        "Identifier of tenant {} cannot change",
                        record.id
                    )));
                }
                *existing = record.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("Tenant {}", record.id))),
        }
    }

    async fn remove(&self, id: &str) -> Result<bool, CoreError> {
        match self.records.remove(id) {
            Some((_, record)) => {
                self.identifiers.remove(&record.identifier);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
