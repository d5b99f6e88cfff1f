use axum::{
    Json, Router,
    middleware::{self},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use http::StatusCode;
use std::sync::Arc;
use tenancy_core::CoreError;
use tenancy_core::resolver::TenantResolver;
use tenancy_core::service::TenantService;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

pub mod application;
use application::{
    commands::{
        handle_activate_tenant, handle_create_tenant, handle_deactivate_tenant,
        handle_remove_connection_strings, handle_renew_subscription, handle_save_connection_string,
    },
    middleware::resolve_tenant,
    query::{
        handle_current_tenant, handle_get_tenant, handle_list_active_subscriptions,
        handle_list_tenants, handle_tenant_exists,
    },
};

pub use application::middleware::{Claims, CurrentTenant};

// Holds shared dependencies
#[derive(Clone)]
pub struct AppState {
    pub tenants: TenantService,
    pub resolver: Arc<TenantResolver>,
}

impl AppState {
    pub fn new(tenants: TenantService) -> Self {
        Self {
            tenants,
            resolver: Arc::new(TenantResolver::default()),
        }
    }
}

pub fn create_app(app_state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/tenants", get(handle_list_tenants).post(handle_create_tenant))
        // Static segment, matched before the {id} route
        .route("/tenants/exists", get(handle_tenant_exists))
        .route("/tenants/{id}", get(handle_get_tenant))
        .route("/tenants/{id}/activate", post(handle_activate_tenant))
        .route("/tenants/{id}/deactivate", post(handle_deactivate_tenant))
        .route(
            "/tenants/{id}/subscriptions",
            get(handle_list_active_subscriptions),
        )
        .route(
            "/subscriptions/{subscription_id}/renew",
            post(handle_renew_subscription),
        )
        .route("/connection-strings", put(handle_save_connection_string))
        .route(
            "/connection-strings/{tenant_key}",
            delete(handle_remove_connection_strings),
        )
        .route("/tenant/current", get(handle_current_tenant))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            resolve_tenant,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(app_state)
}

pub fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::DuplicateKey(_) | CoreError::Conflict(_) => StatusCode::CONFLICT,
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::InvalidOperation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::Io(_)
        | CoreError::Serialization(_)
        | CoreError::Infrastructure(_)
        | CoreError::Configuration(_)
        | CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn map_core_error(err: CoreError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("CoreError occurred: {:?}", err);
    } else {
        warn!("Request rejected: {}", err);
    }
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}
