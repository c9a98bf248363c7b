//! Request middleware.

pub mod tenant;

pub use tenant::{Tenant, tenant_middleware};
