//! Permission repository

use crate::domain::{
    CreatePermissionInput, NewAuditEntry, Permission, TenantContext, UpdatePermissionInput,
};
use crate::error::{AppError, Result};
use crate::repository::audit::append_entry;
use async_trait::async_trait;
use sqlx::PgPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn create(&self, input: &CreatePermissionInput, ctx: &TenantContext)
        -> Result<Permission>;
    async fn find_by_id(&self, id: i32, tenant_id: i32) -> Result<Option<Permission>>;
    async fn find_by_code(&self, code: &str, tenant_id: i32) -> Result<Option<Permission>>;
    async fn find_all(&self, tenant_id: i32) -> Result<Vec<Permission>>;
    async fn update(
        &self,
        id: i32,
        input: &UpdatePermissionInput,
        ctx: &TenantContext,
    ) -> Result<Permission>;
    async fn delete(&self, id: i32, ctx: &TenantContext) -> Result<()>;
}

pub struct PermissionRepositoryImpl {
    pool: PgPool,
}

impl PermissionRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionRepository for PermissionRepositoryImpl {
    async fn create(
        &self,
        input: &CreatePermissionInput,
        ctx: &TenantContext,
    ) -> Result<Permission> {
        let mut tx = self.pool.begin().await?;

        let permission = sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (code, name, module, tenant_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, code, name, module, tenant_id
            "#,
        )
        .bind(&input.code)
        .bind(&input.name)
        .bind(&input.module)
        .bind(ctx.tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        append_entry(
            &mut *tx,
            &NewAuditEntry::created(
                "permission",
                permission.id,
                &permission,
                &ctx.actor,
                ctx.tenant_id,
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(permission)
    }

    async fn find_by_id(&self, id: i32, tenant_id: i32) -> Result<Option<Permission>> {
        let permission = sqlx::query_as::<_, Permission>(
            "SELECT id, code, name, module, tenant_id FROM permissions WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(permission)
    }

    async fn find_by_code(&self, code: &str, tenant_id: i32) -> Result<Option<Permission>> {
        let permission = sqlx::query_as::<_, Permission>(
            "SELECT id, code, name, module, tenant_id FROM permissions WHERE code = $1 AND tenant_id = $2",
        )
        .bind(code)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(permission)
    }

    async fn find_all(&self, tenant_id: i32) -> Result<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT id, code, name, module, tenant_id FROM permissions WHERE tenant_id = $1 ORDER BY id ASC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }

    async fn update(
        &self,
        id: i32,
        input: &UpdatePermissionInput,
        ctx: &TenantContext,
    ) -> Result<Permission> {
        let mut tx = self.pool.begin().await?;

        let before = sqlx::query_as::<_, Permission>(
            "SELECT id, code, name, module, tenant_id FROM permissions WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Permission {} not found", id)))?;

        let after = sqlx::query_as::<_, Permission>(
            r#"
            UPDATE permissions
            SET name = $1, module = $2
            WHERE id = $3 AND tenant_id = $4
            RETURNING id, code, name, module, tenant_id
            "#,
        )
        .bind(&input.name)
        .bind(&input.module)
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        append_entry(
            &mut *tx,
            &NewAuditEntry::updated("permission", id, &before, &after, &ctx.actor, ctx.tenant_id),
        )
        .await?;

        tx.commit().await?;
        Ok(after)
    }

    /// Delete a permission, cascade-detaching it from every role that holds
    /// it, in one transaction.
    async fn delete(&self, id: i32, ctx: &TenantContext) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let before = sqlx::query_as::<_, Permission>(
            "SELECT id, code, name, module, tenant_id FROM permissions WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Permission {} not found", id)))?;

        sqlx::query("DELETE FROM role_permissions WHERE permission_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM permissions WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .execute(&mut *tx)
            .await?;

        append_entry(
            &mut *tx,
            &NewAuditEntry::deleted("permission", id, &before, &ctx.actor, ctx.tenant_id),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
