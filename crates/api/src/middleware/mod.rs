//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`]: the caller, from a JWT Bearer token.
//! - [`rbac::RequireStaff`]: principal, teacher, or admin.

pub mod auth;
pub mod rbac;
