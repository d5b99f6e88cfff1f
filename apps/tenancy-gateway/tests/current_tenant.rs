use axum::{Extension, Router};
use axum_test::TestServer;
use http::{HeaderName, HeaderValue, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tenancy_core::adapters::in_memory_notification_queue::InMemoryNotificationQueue;
use tenancy_core::config::TenancySettings;
use tenancy_core::domain::connection_string::DbProvider;
use tenancy_core::provisioning::CreateTenantRequest;
use tenancy_core::service::{Adapters, TenantService};

use tenancy_gateway::{AppState, Claims, create_app};

async fn seeded_service() -> (TenantService, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let settings = TenancySettings {
        connection_store_path: dir.path().join("tenant-dbs.json"),
        ..TenancySettings::default()
    };
    let (queue, _receiver) = InMemoryNotificationQueue::channel();
    let tenants = TenantService::new(settings, Adapters::in_memory(Arc::new(queue)));
    tenants.registry().initialize().await.unwrap();

    for (id, name) in [("acme", "Acme Co"), ("globex", "Globex")] {
        tenants
            .create(CreateTenantRequest {
                id: id.into(),
                name: name.into(),
                connection_string: None,
                admin_email: format!("admin@{}.io", id),
                issuer: None,
            })
            .await
            .unwrap();
    }
    tenants
        .save_connection_string(
            "globex",
            "Production",
            DbProvider::PostgreSql,
            "Host=globex-db;Database=globex;Password=s3cret",
        )
        .await
        .unwrap();
    (tenants, dir)
}

async fn setup_test_app() -> (TestServer, TempDir) {
    let (tenants, dir) = seeded_service().await;
    let app: Router = create_app(AppState::new(tenants));
    (TestServer::new(app).expect("Failed to create TestServer"), dir)
}

#[tokio::test]
async fn test_tenant_from_header() {
    let (server, _dir) = setup_test_app().await;

    let response = server
        .get("/api/tenant/current")
        .add_header(
            HeaderName::from_static("tenant"),
            HeaderValue::from_static("acme"),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["tenant"]["id"], "acme");
    assert_eq!(body["resolved_by"], "header");
    assert_eq!(body["connection"], json!({ "kind": "shared_default" }));
}

#[tokio::test]
async fn test_tenant_from_query_with_masked_routing() {
    let (server, _dir) = setup_test_app().await;

    let response = server
        .get("/api/tenant/current")
        .add_query_param("tenant", "globex")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["resolved_by"], "query");
    assert_eq!(body["connection"]["kind"], "dedicated");
    assert_eq!(body["connection"]["provider"], "postgresql");
    assert_eq!(
        body["connection"]["connection_string"],
        "Host=globex-db;Database=globex;Password=*******"
    );
}

#[tokio::test]
async fn test_claim_takes_priority() {
    let (tenants, _dir) = seeded_service().await;
    let app: Router = create_app(AppState::new(tenants))
        .layer(Extension(Claims::default().with("tenant", "globex")));
    let server = TestServer::new(app).expect("Failed to create TestServer");

    let response = server
        .get("/api/tenant/current")
        .add_header(
            HeaderName::from_static("tenant"),
            HeaderValue::from_static("acme"),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["tenant"]["id"], "globex");
    assert_eq!(body["resolved_by"], "claim");
}

#[tokio::test]
async fn test_unresolved_and_unknown_tenant() {
    let (server, _dir) = setup_test_app().await;

    let unresolved = server.get("/api/tenant/current").await;
    assert_eq!(unresolved.status_code(), StatusCode::BAD_REQUEST);

    let blank = server
        .get("/api/tenant/current")
        .add_query_param("tenant", "   ")
        .await;
    assert_eq!(blank.status_code(), StatusCode::BAD_REQUEST);

    let unknown = server
        .get("/api/tenant/current")
        .add_query_param("tenant", "initech")
        .await;
    assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);
}
