use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use http::HeaderMap;
use std::collections::HashMap;
use tenancy_core::resolver::{RequestContext, ResolutionStrategy};
use tracing::debug;

use crate::AppState;

/// Claims of an already authenticated caller. Whatever authenticates requests
/// in front of this service inserts them as a request extension.
#[derive(Clone, Debug, Default)]
pub struct Claims(pub HashMap<String, String>);

impl Claims {
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_string(), value.to_string());
        self
    }
}

/// Tenant identifier resolved for the current request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentTenant {
    pub identifier: String,
    pub resolved_by: ResolutionStrategy,
}

/// Read-only view of an axum request for the tenant resolver.
pub struct HttpRequestContext<'a> {
    claims: Option<&'a Claims>,
    headers: &'a HeaderMap,
    query: HashMap<String, String>,
}

impl<'a> HttpRequestContext<'a> {
    pub fn from_request(req: &'a Request) -> Self {
        let query = Query::<HashMap<String, String>>::try_from_uri(req.uri())
            .map(|Query(params)| params)
            .unwrap_or_default();
        Self {
            claims: req.extensions().get::<Claims>(),
            headers: req.headers(),
            query,
        }
    }
}

impl RequestContext for HttpRequestContext<'_> {
    fn claim(&self, name: &str) -> Option<&str> {
        self.claims
            .and_then(|claims| claims.0.get(name))
            .map(String::as_str)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// Attaches a [`CurrentTenant`] extension when the request names a tenant.
/// Requests without one pass through untouched.
pub async fn resolve_tenant(
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let resolved = app_state
        .resolver
        .resolve_with_source(&HttpRequestContext::from_request(&req));

    if let Some((identifier, resolved_by)) = resolved {
        debug!(tenant = %identifier, source = resolved_by.as_str(), "Tenant resolved");
        req.extensions_mut().insert(CurrentTenant {
            identifier,
            resolved_by,
        });
    }
    next.run(req).await
}
