use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tenancy_core::CoreError;
use tracing::debug;

use super::ApplicationError;
use super::middleware::CurrentTenant;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExistsQuery {
    pub id: Option<String>,
    pub name: Option<String>,
}

// GET /api/tenants
pub async fn handle_list_tenants(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApplicationError> {
    let tenants = state.tenants.list().await?;
    debug!(count = tenants.len(), "Listing tenants");
    Ok(Json(tenants))
}

// GET /api/tenants/{id}
pub async fn handle_get_tenant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApplicationError> {
    Ok(Json(state.tenants.get_by_id(&id).await?))
}

// GET /api/tenants/exists?id=... or ?name=...
pub async fn handle_tenant_exists(
    State(state): State<AppState>,
    Query(params): Query<ExistsQuery>,
) -> Result<impl IntoResponse, ApplicationError> {
    let exists = match (params.id, params.name) {
        (Some(id), None) => state.tenants.exists_with_id(&id).await?,
        (None, Some(name)) => state.tenants.exists_with_name(&name).await?,
        _ => {
            return Err(ApplicationError::BadRequest(
                "Exactly one of 'id' or 'name' is required".into(),
            ));
        }
    };
    Ok(Json(serde_json::json!({ "exists": exists })))
}

// GET /api/tenants/{id}/subscriptions
pub async fn handle_list_active_subscriptions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApplicationError> {
    // Unknown tenants are a 404, not an empty list
    state.tenants.get_by_id(&id).await?;
    Ok(Json(state.tenants.active_subscriptions(&id).await?))
}

// GET /api/tenant/current
pub async fn handle_current_tenant(
    State(state): State<AppState>,
    current: Option<Extension<CurrentTenant>>,
) -> Result<impl IntoResponse, ApplicationError> {
    let Some(Extension(current)) = current else {
        return Err(ApplicationError::TenantUnresolved);
    };

    let tenant = state
        .tenants
        .find_by_identifier(&current.identifier)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("Tenant {}", current.identifier)))?;
    let connection = state.tenants.display_connection_for(&tenant.id).await?;

    Ok(Json(serde_json::json!({
        "tenant": tenant,
        "resolved_by": current.resolved_by.as_str(),
        "connection": connection,
    })))
}
