pub mod tenant;

pub use tenant::{Claims, CurrentTenant, HttpRequestContext, resolve_tenant};
