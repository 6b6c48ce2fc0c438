//! Role repository and role/menu/permission assignment manager

use crate::domain::{
    CreateRoleInput, Menu, NewAuditEntry, Permission, Role, TenantContext, UpdateRoleInput,
};
use crate::error::{AppError, Result};
use crate::repository::audit::append_entry;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

const ROLE_COLUMNS: &str =
    "id, name, description, tenant_id, created_by, updated_by, created_at, updated_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn create(&self, input: &CreateRoleInput, ctx: &TenantContext) -> Result<Role>;
    async fn find_by_id(&self, id: i32, tenant_id: i32) -> Result<Option<Role>>;
    async fn find_by_name(&self, name: &str, tenant_id: i32) -> Result<Option<Role>>;
    async fn find_all(&self, tenant_id: i32) -> Result<Vec<Role>>;
    async fn update(&self, id: i32, input: &UpdateRoleInput, ctx: &TenantContext) -> Result<Role>;
    async fn delete(&self, id: i32, ctx: &TenantContext) -> Result<()>;

    // Role-Permission associations
    async fn assign_permissions(
        &self,
        role_id: i32,
        permission_ids: &[i32],
        ctx: &TenantContext,
    ) -> Result<()>;
    async fn remove_permissions(
        &self,
        role_id: i32,
        permission_ids: &[i32],
        ctx: &TenantContext,
    ) -> Result<()>;
    async fn role_permissions(&self, role_id: i32, tenant_id: i32) -> Result<Vec<Permission>>;

    // Role-Menu associations
    async fn assign_menus(&self, role_id: i32, menu_ids: &[i32], ctx: &TenantContext)
        -> Result<()>;
    async fn remove_menus(&self, role_id: i32, menu_ids: &[i32], ctx: &TenantContext)
        -> Result<()>;
    async fn role_menus(&self, role_id: i32, tenant_id: i32) -> Result<Vec<Menu>>;
}

pub struct RoleRepositoryImpl {
    pool: PgPool,
}

impl RoleRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verify the role exists in the caller's tenant before any mutation.
    async fn require_role_in_tenant(
        tx: &mut Transaction<'_, Postgres>,
        role_id: i32,
        tenant_id: i32,
    ) -> Result<()> {
        let exists: Option<(i32,)> =
            sqlx::query_as("SELECT id FROM roles WHERE id = $1 AND tenant_id = $2")
                .bind(role_id)
                .bind(tenant_id)
                .fetch_optional(&mut **tx)
                .await?;

        if exists.is_none() {
            return Err(AppError::NotFound(format!("Role {} not found", role_id)));
        }
        Ok(())
    }

    async fn fetch_permission_ids(
        tx: &mut Transaction<'_, Postgres>,
        role_id: i32,
    ) -> Result<Vec<i32>> {
        let rows: Vec<(i32,)> =
            sqlx::query_as("SELECT permission_id FROM role_permissions WHERE role_id = $1 ORDER BY permission_id")
                .bind(role_id)
                .fetch_all(&mut **tx)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn fetch_menu_ids(tx: &mut Transaction<'_, Postgres>, role_id: i32) -> Result<Vec<i32>> {
        let rows: Vec<(i32,)> =
            sqlx::query_as("SELECT menu_id FROM role_menus WHERE role_id = $1 ORDER BY menu_id")
                .bind(role_id)
                .fetch_all(&mut **tx)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[async_trait]
impl RoleRepository for RoleRepositoryImpl {
    async fn create(&self, input: &CreateRoleInput, ctx: &TenantContext) -> Result<Role> {
        let mut tx = self.pool.begin().await?;

        let role = sqlx::query_as::<_, Role>(&format!(
            r#"
            INSERT INTO roles (name, description, tenant_id, created_by, updated_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4, NOW(), NOW())
            RETURNING {ROLE_COLUMNS}
            "#,
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(ctx.tenant_id)
        .bind(&ctx.actor)
        .fetch_one(&mut *tx)
        .await?;

        append_entry(
            &mut *tx,
            &NewAuditEntry::created("role", role.id, &role, &ctx.actor, ctx.tenant_id),
        )
        .await?;

        tx.commit().await?;
        Ok(role)
    }

    async fn find_by_id(&self, id: i32, tenant_id: i32) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1 AND tenant_id = $2",
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    async fn find_by_name(&self, name: &str, tenant_id: i32) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1 AND tenant_id = $2",
        ))
        .bind(name)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    async fn find_all(&self, tenant_id: i32) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE tenant_id = $1 ORDER BY id ASC",
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    async fn update(&self, id: i32, input: &UpdateRoleInput, ctx: &TenantContext) -> Result<Role> {
        let mut tx = self.pool.begin().await?;

        let before = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1 AND tenant_id = $2",
        ))
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Role {} not found", id)))?;

        let after = sqlx::query_as::<_, Role>(&format!(
            r#"
            UPDATE roles
            SET name = $1, description = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $4 AND tenant_id = $5
            RETURNING {ROLE_COLUMNS}
            "#,
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(&ctx.actor)
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        append_entry(
            &mut *tx,
            &NewAuditEntry::updated("role", id, &before, &after, &ctx.actor, ctx.tenant_id),
        )
        .await?;

        tx.commit().await?;
        Ok(after)
    }

    async fn delete(&self, id: i32, ctx: &TenantContext) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let before = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1 AND tenant_id = $2",
        ))
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Role {} not found", id)))?;

        // Junction rows are owned by the role; cascade-delete them first
        sqlx::query("DELETE FROM role_menus WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM roles WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .execute(&mut *tx)
            .await?;

        append_entry(
            &mut *tx,
            &NewAuditEntry::deleted("role", id, &before, &ctx.actor, ctx.tenant_id),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Replace the role's entire permission set atomically. A failure at any
    /// point rolls the whole transaction back, leaving the previous set
    /// intact; a concurrent reader never observes a partial set.
    async fn assign_permissions(
        &self,
        role_id: i32,
        permission_ids: &[i32],
        ctx: &TenantContext,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::require_role_in_tenant(&mut tx, role_id, ctx.tenant_id).await?;

        let before = Self::fetch_permission_ids(&mut tx, role_id).await?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        for permission_id in permission_ids {
            sqlx::query(
                r#"
                INSERT INTO role_permissions (role_id, permission_id, tenant_id, created_by, created_at)
                VALUES ($1, $2, $3, $4, NOW())
                "#,
            )
            .bind(role_id)
            .bind(permission_id)
            .bind(ctx.tenant_id)
            .bind(&ctx.actor)
            .execute(&mut *tx)
            .await?;
        }

        append_entry(
            &mut *tx,
            &NewAuditEntry::updated(
                "role_permissions",
                role_id,
                &before,
                &permission_ids,
                &ctx.actor,
                ctx.tenant_id,
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove only the named associations with a genuine delete.
    async fn remove_permissions(
        &self,
        role_id: i32,
        permission_ids: &[i32],
        ctx: &TenantContext,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::require_role_in_tenant(&mut tx, role_id, ctx.tenant_id).await?;

        let before = Self::fetch_permission_ids(&mut tx, role_id).await?;

        sqlx::query(
            "DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = ANY($2)",
        )
        .bind(role_id)
        .bind(permission_ids)
        .execute(&mut *tx)
        .await?;

        let after = Self::fetch_permission_ids(&mut tx, role_id).await?;

        append_entry(
            &mut *tx,
            &NewAuditEntry::updated(
                "role_permissions",
                role_id,
                &before,
                &after,
                &ctx.actor,
                ctx.tenant_id,
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn role_permissions(&self, role_id: i32, tenant_id: i32) -> Result<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.id, p.code, p.name, p.module, p.tenant_id
            FROM permissions p
            INNER JOIN role_permissions rp ON p.id = rp.permission_id
            WHERE rp.role_id = $1 AND rp.tenant_id = $2
            ORDER BY p.id ASC
            "#,
        )
        .bind(role_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }

    async fn assign_menus(
        &self,
        role_id: i32,
        menu_ids: &[i32],
        ctx: &TenantContext,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::require_role_in_tenant(&mut tx, role_id, ctx.tenant_id).await?;

        let before = Self::fetch_menu_ids(&mut tx, role_id).await?;

        sqlx::query("DELETE FROM role_menus WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        for menu_id in menu_ids {
            sqlx::query(
                r#"
                INSERT INTO role_menus (role_id, menu_id, tenant_id, created_by, created_at)
                VALUES ($1, $2, $3, $4, NOW())
                "#,
            )
            .bind(role_id)
            .bind(menu_id)
            .bind(ctx.tenant_id)
            .bind(&ctx.actor)
            .execute(&mut *tx)
            .await?;
        }

        append_entry(
            &mut *tx,
            &NewAuditEntry::updated(
                "role_menus",
                role_id,
                &before,
                &menu_ids,
                &ctx.actor,
                ctx.tenant_id,
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove_menus(
        &self,
        role_id: i32,
        menu_ids: &[i32],
        ctx: &TenantContext,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::require_role_in_tenant(&mut tx, role_id, ctx.tenant_id).await?;

        let before = Self::fetch_menu_ids(&mut tx, role_id).await?;

        sqlx::query("DELETE FROM role_menus WHERE role_id = $1 AND menu_id = ANY($2)")
            .bind(role_id)
            .bind(menu_ids)
            .execute(&mut *tx)
            .await?;

        let after = Self::fetch_menu_ids(&mut tx, role_id).await?;

        append_entry(
            &mut *tx,
            &NewAuditEntry::updated(
                "role_menus",
                role_id,
                &before,
                &after,
                &ctx.actor,
                ctx.tenant_id,
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn role_menus(&self, role_id: i32, tenant_id: i32) -> Result<Vec<Menu>> {
        let menus = sqlx::query_as::<_, Menu>(
            r#"
            SELECT m.id, m.name, m.url, m.icon, m.parent_id, m.tenant_id, m.created_at, m.updated_at
            FROM menus m
            INNER JOIN role_menus rm ON m.id = rm.menu_id
            WHERE rm.role_id = $1 AND m.tenant_id = $2
            ORDER BY m.id ASC
            "#,
        )
        .bind(role_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(menus)
    }
}
