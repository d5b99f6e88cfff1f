//! Tenant identification from inbound request metadata.
//!
//! The resolver is a pure function over whatever the request pipeline exposes
//! through [`RequestContext`]. Strategies run in a fixed order and the first
//! non-empty value wins.

use std::collections::HashMap;

/// Key shared by the claim, header and query-string strategies.
pub const TENANT_KEY_NAME: &str = "tenant";

/// Read access to the three resolution inputs of a request.
pub trait RequestContext {
    fn claim(&self, name: &str) -> Option<&str>;
    fn header(&self, name: &str) -> Option<&str>;
    fn query(&self, name: &str) -> Option<&str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStrategy {
    Claim,
    Header,
    QueryString,
}

impl ResolutionStrategy {
    pub const ORDER: [ResolutionStrategy; 3] = [
        ResolutionStrategy::Claim,
        ResolutionStrategy::Header,
        ResolutionStrategy::QueryString,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::Claim => "claim",
            ResolutionStrategy::Header => "header",
            ResolutionStrategy::QueryString => "query",
        }
    }

    fn extract<'a, C: RequestContext + ?Sized>(&self, ctx: &'a C, key: &str) -> Option<&'a str> {
        match self {
            ResolutionStrategy::Claim => ctx.claim(key),
            ResolutionStrategy::Header => ctx.header(key),
            ResolutionStrategy::QueryString => ctx.query(key),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TenantResolver {
    key_name: String,
}

impl Default for TenantResolver {
    fn default() -> Self {
        Self::new(TENANT_KEY_NAME)
    }
}

impl TenantResolver {
    pub fn new(key_name: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
        }
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn resolve<C: RequestContext + ?Sized>(&self, ctx: &C) -> Option<String> {
        self.resolve_with_source(ctx).map(|(id, _)| id)
    }

    /// Like [`resolve`](Self::resolve) but also reports which strategy matched.
    pub fn resolve_with_source<C: RequestContext + ?Sized>(
        &self,
        ctx: &C,
    ) -> Option<(String, ResolutionStrategy)> {
        ResolutionStrategy::ORDER.iter().find_map(|strategy| {
            strategy
                .extract(ctx, &self.key_name)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(|value| (value.to_string(), *strategy))
        })
    }
}

/// Owned request metadata, handy outside an HTTP stack.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    pub claims: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
}

impl RequestMetadata {
    pub fn with_claim(mut self, name: &str, value: &str) -> Self {
        self.claims.insert(name.to_string(), value.to_string());
        self
    }

    /// Header names are stored lower-cased; lookups are case-insensitive.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.insert(name.to_string(), value.to_string());
        self
    }
}

impl RequestContext for RequestMetadata {
    fn claim(&self, name: &str) -> Option<&str> {
        self.claims.get(name).map(String::as_str)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}
