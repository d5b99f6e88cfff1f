use crate::CoreError;
use crate::domain::connection_string::DbProvider;
use std::path::PathBuf;
use std::str::FromStr;

/// Runtime settings of the tenancy control plane.
#[derive(Debug, Clone)]
pub struct TenancySettings {
    /// Connection string of the shared database. Tenants created with exactly this
    /// value are stored with an empty connection string.
    pub default_connection_string: String,
    pub db_provider: DbProvider,
    /// Environment label used for connection-string registry lookups.
    pub environment: String,
    pub connection_store_path: PathBuf,
    pub demo_site_url: String,
    pub prod_site_url: String,
    pub cache_capacity: u64,
    pub cache_ttl_seconds: u64,
}

impl Default for TenancySettings {
    fn default() -> Self {
        Self {
            default_connection_string: String::new(),
            db_provider: DbProvider::PostgreSql,
            environment: "Production".to_string(),
            connection_store_path: PathBuf::from("Configurations/tenant-dbs.json"),
            demo_site_url: "https://demo.abcd.com".to_string(),
            prod_site_url: "https://prod.abcd.com".to_string(),
            cache_capacity: 10_000,
            cache_ttl_seconds: 300,
        }
    }
}

impl TenancySettings {
    /// Reads `TENANCY_*` variables from the process environment, falling back to
    /// the defaults for anything unset.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let db_provider = match lookup("TENANCY_DB_PROVIDER") {
            Some(raw) => DbProvider::from_str(&raw)
                .map_err(|e| CoreError::Configuration(e.to_string()))?,
            None => defaults.db_provider,
        };

        Ok(Self {
            default_connection_string: lookup("TENANCY_DEFAULT_CONNECTION_STRING")
                .unwrap_or(defaults.default_connection_string),
            db_provider,
            environment: lookup("TENANCY_ENVIRONMENT").unwrap_or(defaults.environment),
            connection_store_path: lookup("TENANCY_CONNECTION_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.connection_store_path),
            demo_site_url: lookup("TENANCY_DEMO_SITE_URL").unwrap_or(defaults.demo_site_url),
            prod_site_url: lookup("TENANCY_PROD_SITE_URL").unwrap_or(defaults.prod_site_url),
            cache_capacity: parse_number(&lookup, "TENANCY_CACHE_CAPACITY", defaults.cache_capacity)?,
            cache_ttl_seconds: parse_number(
                &lookup,
                "TENANCY_CACHE_TTL_SECONDS",
                defaults.cache_ttl_seconds,
            )?,
        })
    }

    pub fn site_url(&self, is_demo: bool, tenant_key: &str) -> String {
        let base = if is_demo {
            &self.demo_site_url
        } else {
            &self.prod_site_url
        };
        format!("{}/{}", base.trim_end_matches('/'), tenant_key)
    }
}

fn parse_number<F>(lookup: &F, name: &str, default: u64) -> Result<u64, CoreError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CoreError::Configuration(format!("{}: {}", name, e))),
        None => Ok(default),
    }
}
