use crate::CoreError;
use serde::{Deserialize, Serialize};

/// Reserved id of the system tenant. It can never change activation state.
pub const ROOT_TENANT_ID: &str = "root";

// --- Capability contract ---

/// Read-only view of a tenant, the shape generic collaborators (storage
/// initializers, routing) depend on instead of the full record.
pub trait TenantInfo: Send + Sync {
    fn id(&self) -> &str;
    fn identifier(&self) -> &str;
    fn name(&self) -> &str;
    /// Empty means the shared default pool.
    fn connection_string(&self) -> &str;
}

// --- Record ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    pub id: String,
    pub identifier: String,
    pub name: String,
    pub connection_string: String,
    pub admin_email: String,
    pub is_active: bool,
    pub issuer: Option<String>,
}

// --- Errors ---

#[derive(thiserror::Error, Debug)]
pub enum TenantError {
    #[error("Core Error: {0}")]
    Core(#[from] CoreError),
    #[error("Tenant is protected (ID: {0})")]
    RootTenantProtected(String),
    #[error("Tenant is already activated (ID: {0})")]
    AlreadyActive(String),
    #[error("Tenant is already deactivated (ID: {0})")]
    AlreadyInactive(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TenantRecord {
    /// Builds a new, active record. The identifier is always the id.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        connection_string: Option<String>,
        admin_email: impl Into<String>,
        issuer: Option<String>,
    ) -> Result<Self, TenantError> {
        let id = id.into();
        let name = name.into();
        let admin_email = admin_email.into();

        if id.trim().is_empty() {
            return Err(TenantError::InvalidInput("Tenant ID cannot be empty".into()));
        }
        if name.trim().is_empty() {
            return Err(TenantError::InvalidInput(
                "Tenant name cannot be empty".into(),
            ));
        }
        if admin_email.trim().is_empty() || !admin_email.contains('@') {
            return Err(TenantError::InvalidInput(format!(
                "Invalid admin email: '{}'",
                admin_email
            )));
        }

        Ok(Self {
            identifier: id.clone(),
            id,
            name,
            connection_string: connection_string.unwrap_or_default(),
            admin_email,
            is_active: true,
            issuer,
        })
    }

    /// Lookup key derived from the display name: lower-cased, spaces as dashes.
    pub fn key(&self) -> String {
        self.name.to_lowercase().replace(' ', "-")
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_TENANT_ID
    }

    pub fn uses_shared_database(&self) -> bool {
        self.connection_string.is_empty()
    }

    pub fn activate(&mut self) -> Result<(), TenantError> {
        if self.is_root() {
            return Err(TenantError::RootTenantProtected(self.id.clone()));
        }
        if self.is_active {
            return Err(TenantError::AlreadyActive(self.id.clone()));
        }
        self.is_active = true;
        Ok(())
    }

    pub fn deactivate(&mut self) -> Result<(), TenantError> {
        if self.is_root() {
            return Err(TenantError::RootTenantProtected(self.id.clone()));
        }
        if !self.is_active {
            return Err(TenantError::AlreadyInactive(self.id.clone()));
        }
        self.is_active = false;
        Ok(())
    }
}

impl TenantInfo for TenantRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn connection_string(&self) -> &str {
        &self.connection_string
    }
}
