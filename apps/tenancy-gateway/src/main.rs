use async_trait::async_trait;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tenancy_core::adapters::{
    MIGRATOR,
    in_memory_notification_queue::{InMemoryNotificationQueue, spawn_notification_worker},
    postgres_subscription_store::PostgresSubscriptionStore,
    postgres_tenant_store::PostgresTenantStore,
    storage_initializer::PostgresSchemaInitializer,
};
use tenancy_core::config::TenancySettings;
use tenancy_core::domain::notification::WelcomeNotification;
use tenancy_core::service::{Adapters, TenantService};
use tenancy_core::{CoreError, NotificationDispatcher};
use tenancy_gateway::{AppState, create_app};
use tokio::net::TcpListener;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

// Delivery stand-in until a mail integration exists: the welcome message goes to the log
struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn dispatch(&self, job: &WelcomeNotification) -> Result<(), CoreError> {
        info!(
            to = %job.admin_email,
            subject = job.subject(),
            site_url = %job.site_url,
            expires = %job.subscription_expiry,
            "Welcome to {}", job.tenant_name
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting Tenancy Gateway v{}...", env!("CARGO_PKG_VERSION"));
    dotenv().ok();

    let settings = match TenancySettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    let (queue, receiver) = InMemoryNotificationQueue::channel();
    let _worker = spawn_notification_worker(receiver, Arc::new(LoggingDispatcher));
    let mut adapters = Adapters::in_memory(Arc::new(queue));

    match std::env::var("DATABASE_URL") {
        Ok(url) => match PgPoolOptions::new().max_connections(5).connect(&url).await {
            Ok(pool) => {
                info!("Applying database migrations...");
                if let Err(e) = MIGRATOR.run(&pool).await {
                    error!("Database migration failed: {}", e);
                    return; // Exit if migrations fail - database is in inconsistent state
                }
                info!("Connected to Postgres, using durable tenant storage");
                adapters.tenants = Arc::new(PostgresTenantStore::new(pool.clone()));
                adapters.subscriptions = Arc::new(PostgresSubscriptionStore::new(pool.clone()));
                adapters.initializer = Arc::new(PostgresSchemaInitializer::new(pool));
            }
            Err(e) => {
                error!("Failed to connect to Postgres: {}", e);
                return;
            }
        },
        Err(_) => warn!("DATABASE_URL not set, tenants are kept in memory only"),
    }

    let tenants = TenantService::new(settings, adapters);
    match tenants.registry().initialize().await {
        Ok(true) => info!(
            path = %tenants.registry().path().display(),
            "Created empty connection string store"
        ),
        Ok(false) => {}
        Err(e) => {
            error!("Connection string store unavailable: {}", e);
            return;
        }
    }

    let app = create_app(AppState::new(tenants));

    let addr: SocketAddr = match std::env::var("TENANCY_BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
        .parse()
    {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid TENANCY_BIND_ADDR: {}", e);
            return;
        }
    };
    info!("Tenancy Gateway listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap_or_else(|e| {
        panic!("Failed to bind to address {}: {}", addr, e);
    });

    axum::serve(listener, app.into_make_service())
        .await
        .unwrap_or_else(|e| {
            panic!("Server failed to run: {}", e);
        });
}
