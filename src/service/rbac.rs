//! RBAC business logic

use crate::domain::{
    AssignmentInput, CreatePermissionInput, CreateRoleInput, Menu, Permission, Role,
    RoleWithPermissions, TenantContext, UpdatePermissionInput, UpdateRoleInput,
};
use crate::error::{AppError, Result};
use crate::repository::{PermissionRepository, RoleRepository};
use std::sync::Arc;
use validator::Validate;

pub struct RbacService<R: RoleRepository, P: PermissionRepository> {
    role_repo: Arc<R>,
    permission_repo: Arc<P>,
}

impl<R: RoleRepository, P: PermissionRepository> RbacService<R, P> {
    pub fn new(role_repo: Arc<R>, permission_repo: Arc<P>) -> Self {
        Self {
            role_repo,
            permission_repo,
        }
    }

    // ==================== Roles ====================

    pub async fn create_role(&self, input: CreateRoleInput, ctx: &TenantContext) -> Result<Role> {
        input.validate()?;
        if self
            .role_repo
            .find_by_name(&input.name, ctx.tenant_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Role '{}' already exists",
                input.name
            )));
        }
        self.role_repo.create(&input, ctx).await
    }

    pub async fn get_role(&self, id: i32, tenant_id: i32) -> Result<Role> {
        self.role_repo
            .find_by_id(id, tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role {} not found", id)))
    }

    pub async fn get_role_with_permissions(
        &self,
        id: i32,
        tenant_id: i32,
    ) -> Result<RoleWithPermissions> {
        let role = self.get_role(id, tenant_id).await?;
        let permissions = self.role_repo.role_permissions(id, tenant_id).await?;
        Ok(RoleWithPermissions { role, permissions })
    }

    pub async fn list_roles(&self, tenant_id: i32) -> Result<Vec<Role>> {
        self.role_repo.find_all(tenant_id).await
    }

    pub async fn update_role(
        &self,
        id: i32,
        input: UpdateRoleInput,
        ctx: &TenantContext,
    ) -> Result<Role> {
        input.validate()?;
        if let Some(existing) = self
            .role_repo
            .find_by_name(&input.name, ctx.tenant_id)
            .await?
        {
            if existing.id != id {
                return Err(AppError::Conflict(format!(
                    "Role '{}' already exists",
                    input.name
                )));
            }
        }
        self.role_repo.update(id, &input, ctx).await
    }

    pub async fn delete_role(&self, id: i32, ctx: &TenantContext) -> Result<()> {
        self.role_repo.delete(id, ctx).await
    }

    // ==================== Role-Permission ====================

    /// Replace the role's permission set with the given ids.
    pub async fn assign_permissions(
        &self,
        role_id: i32,
        input: AssignmentInput,
        ctx: &TenantContext,
    ) -> Result<Vec<Permission>> {
        input.validate()?;
        for id in &input.ids {
            if self
                .permission_repo
                .find_by_id(*id, ctx.tenant_id)
                .await?
                .is_none()
            {
                return Err(AppError::NotFound(format!("Permission {} not found", id)));
            }
        }
        self.role_repo
            .assign_permissions(role_id, &input.ids, ctx)
            .await?;
        self.role_repo.role_permissions(role_id, ctx.tenant_id).await
    }

    /// Remove only the named permissions from the role.
    pub async fn remove_permissions(
        &self,
        role_id: i32,
        input: AssignmentInput,
        ctx: &TenantContext,
    ) -> Result<Vec<Permission>> {
        input.validate()?;
        if input.ids.is_empty() {
            return Err(AppError::Validation(
                "ids must name at least one permission to remove".to_string(),
            ));
        }
        self.role_repo
            .remove_permissions(role_id, &input.ids, ctx)
            .await?;
        self.role_repo.role_permissions(role_id, ctx.tenant_id).await
    }

    pub async fn role_permissions(&self, role_id: i32, tenant_id: i32) -> Result<Vec<Permission>> {
        let _ = self.get_role(role_id, tenant_id).await?;
        self.role_repo.role_permissions(role_id, tenant_id).await
    }

    // ==================== Role-Menu ====================

    /// Replace the role's menu set with the given ids.
    pub async fn assign_menus(
        &self,
        role_id: i32,
        input: AssignmentInput,
        ctx: &TenantContext,
    ) -> Result<Vec<Menu>> {
        input.validate()?;
        self.role_repo.assign_menus(role_id, &input.ids, ctx).await?;
        self.role_repo.role_menus(role_id, ctx.tenant_id).await
    }

    /// Remove only the named menus from the role.
    pub async fn remove_menus(
        &self,
        role_id: i32,
        input: AssignmentInput,
        ctx: &TenantContext,
    ) -> Result<Vec<Menu>> {
        input.validate()?;
        if input.ids.is_empty() {
            return Err(AppError::Validation(
                "ids must name at least one menu to remove".to_string(),
            ));
        }
        self.role_repo.remove_menus(role_id, &input.ids, ctx).await?;
        self.role_repo.role_menus(role_id, ctx.tenant_id).await
    }

    pub async fn role_menus(&self, role_id: i32, tenant_id: i32) -> Result<Vec<Menu>> {
        let _ = self.get_role(role_id, tenant_id).await?;
        self.role_repo.role_menus(role_id, tenant_id).await
    }

    // ==================== Permissions ====================

    pub async fn create_permission(
        &self,
        input: CreatePermissionInput,
        ctx: &TenantContext,
    ) -> Result<Permission> {
        input.validate()?;
        if self
            .permission_repo
            .find_by_code(&input.code, ctx.tenant_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Permission '{}' already exists",
                input.code
            )));
        }
        self.permission_repo.create(&input, ctx).await
    }

    pub async fn get_permission(&self, id: i32, tenant_id: i32) -> Result<Permission> {
        self.permission_repo
            .find_by_id(id, tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Permission {} not found", id)))
    }

    pub async fn list_permissions(&self, tenant_id: i32) -> Result<Vec<Permission>> {
        self.permission_repo.find_all(tenant_id).await
    }

    pub async fn update_permission(
        &self,
        id: i32,
        input: UpdatePermissionInput,
        ctx: &TenantContext,
    ) -> Result<Permission> {
        input.validate()?;
        self.permission_repo.update(id, &input, ctx).await
    }

    pub async fn delete_permission(&self, id: i32, ctx: &TenantContext) -> Result<()> {
        self.permission_repo.delete(id, ctx).await
    }
}
