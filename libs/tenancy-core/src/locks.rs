use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-tenant mutual exclusion for read-modify-write flows on a single tenant
/// (activation, deactivation, subscription renewal).
#[derive(Debug, Clone, Default)]
pub struct TenantLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

/// Proof that the holder owns the lock of `tenant_id`.
#[derive(Debug)]
pub struct TenantGuard {
    tenant_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl TenantGuard {
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

impl TenantLocks {
    pub async fn lock(&self, tenant_id: &str) -> TenantGuard {
        let mutex = self
            .locks
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        TenantGuard {
            tenant_id: tenant_id.to_string(),
            _guard: mutex.lock_owned().await,
        }
    }
}
