//! Request middleware: authentication, tenant resolution, permission
//! enforcement

pub mod auth;
pub mod require_permission;
pub mod tenant;

pub use auth::{authenticate, AuthState, CurrentUser};
pub use require_permission::require_permission;
pub use tenant::bind_tenant;
