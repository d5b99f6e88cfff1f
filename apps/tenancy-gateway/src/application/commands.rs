use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::str::FromStr;
use tenancy_core::domain::connection_string::DbProvider;
use tenancy_core::provisioning::CreateTenantRequest;

use super::ApplicationError;
use crate::{AppState, map_core_error};

#[derive(Deserialize, Debug)]
pub struct RenewSubscriptionDto {
    pub expiry_date: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
pub struct SaveConnectionStringDto {
    pub tenant_key: String,
    pub environment: String,
    pub provider: String,
    pub connection_string: String,
}

// POST /api/tenants
pub async fn handle_create_tenant(
    State(state): State<AppState>,
    Json(payload): Json<CreateTenantRequest>,
) -> impl IntoResponse {
    match state.tenants.create(payload).await {
        Ok(tenant_id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "tenant_id": tenant_id })),
        )
            .into_response(),
        Err(e) => map_core_error(e),
    }
}

// POST /api/tenants/{id}/activate
pub async fn handle_activate_tenant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApplicationError> {
    state.tenants.activate(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/tenants/{id}/deactivate
pub async fn handle_deactivate_tenant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApplicationError> {
    state.tenants.deactivate(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/subscriptions/{subscription_id}/renew
pub async fn handle_renew_subscription(
    State(state): State<AppState>,
    Path(subscription_id): Path<String>,
    Json(payload): Json<RenewSubscriptionDto>,
) -> Result<impl IntoResponse, ApplicationError> {
    let renewed = state
        .tenants
        .renew_subscription(&subscription_id, payload.expiry_date)
        .await?;
    Ok(Json(renewed))
}

// PUT /api/connection-strings
pub async fn handle_save_connection_string(
    State(state): State<AppState>,
    Json(payload): Json<SaveConnectionStringDto>,
) -> Result<StatusCode, ApplicationError> {
    let provider = DbProvider::from_str(&payload.provider)?;
    state
        .tenants
        .save_connection_string(
            &payload.tenant_key,
            &payload.environment,
            provider,
            &payload.connection_string,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// DELETE /api/connection-strings/{tenant_key}
pub async fn handle_remove_connection_strings(
    State(state): State<AppState>,
    Path(tenant_key): Path<String>,
) -> Result<impl IntoResponse, ApplicationError> {
    let removed = state.tenants.remove_connection_strings(&tenant_key).await?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}
