use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use tenancy_core::CoreError;

pub mod commands;
pub mod middleware;
pub mod query;

// Errors raised by the HTTP layer itself, on top of whatever the core returns
#[derive(thiserror::Error, Debug)]
pub enum ApplicationError {
    #[error("Core Error: {0}")]
    Core(#[from] CoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("No tenant could be resolved from the request")]
    TenantUnresolved,
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        match self {
            ApplicationError::Core(e) => crate::map_core_error(e),
            other => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": other.to_string() })),
            )
                .into_response(),
        }
    }
}
