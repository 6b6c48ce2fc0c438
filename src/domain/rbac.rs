//! RBAC (Role-Based Access Control) domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Well-known permission codes enforced by the middleware.
///
/// Codes follow the `<RESOURCE>_<ACTION>` convention and enforcement is an
/// exact, case-sensitive membership test.
pub mod codes {
    pub const USER_CREATE: &str = "USER_CREATE";
    pub const USER_VIEW: &str = "USER_VIEW";
    pub const USER_UPDATE: &str = "USER_UPDATE";
    pub const USER_DELETE: &str = "USER_DELETE";
    pub const ROLE_CREATE: &str = "ROLE_CREATE";
    pub const ROLE_VIEW: &str = "ROLE_VIEW";
    pub const ROLE_UPDATE: &str = "ROLE_UPDATE";
    pub const ROLE_DELETE: &str = "ROLE_DELETE";
    pub const PERMISSION_CREATE: &str = "PERMISSION_CREATE";
    pub const PERMISSION_VIEW: &str = "PERMISSION_VIEW";
    pub const PERMISSION_UPDATE: &str = "PERMISSION_UPDATE";
    pub const PERMISSION_DELETE: &str = "PERMISSION_DELETE";
    pub const MENU_CREATE: &str = "MENU_CREATE";
    pub const MENU_VIEW: &str = "MENU_VIEW";
    pub const MENU_UPDATE: &str = "MENU_UPDATE";
    pub const MENU_DELETE: &str = "MENU_DELETE";
    pub const AUDIT_TRAIL_VIEW: &str = "AUDIT_TRAIL_VIEW";
}

/// Role entity, tenant-scoped
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub tenant_id: i32,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Permission entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: i32,
    /// Permission code (e.g., "MENU_CREATE")
    pub code: String,
    pub name: String,
    /// Module grouping (e.g., "inventory", "administration")
    pub module: String,
    pub tenant_id: i32,
}

/// Input for creating a role
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoleInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
}

/// Input for updating a role
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRoleInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
}

/// Input for creating a permission
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePermissionInput {
    #[validate(length(min = 1, max = 100), custom(function = "validate_permission_code"))]
    pub code: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub module: String,
}

/// Input for updating a permission
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePermissionInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub module: String,
}

/// Input naming the associations to replace or remove on a role.
///
/// An empty list is valid for replace-all assignment: it clears the set.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignmentInput {
    pub ids: Vec<i32>,
}

/// Validate permission code format: `<RESOURCE>_<ACTION>` in upper snake case
fn validate_permission_code(code: &str) -> Result<(), validator::ValidationError> {
    let well_formed = code.contains('_')
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && !code.starts_with('_')
        && !code.ends_with('_');
    if well_formed {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_permission_code"))
    }
}

/// Role with its permissions (for API responses)
#[derive(Debug, Clone, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}
