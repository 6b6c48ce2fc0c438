//! Menu repository

use crate::domain::{CreateMenuInput, Menu, NewAuditEntry, TenantContext, UpdateMenuInput};
use crate::error::{AppError, Result};
use crate::repository::audit::append_entry;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

const MENU_COLUMNS: &str = "id, name, url, icon, parent_id, tenant_id, created_at, updated_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn create(&self, input: &CreateMenuInput, ctx: &TenantContext) -> Result<Menu>;
    async fn find_by_id(&self, id: i32, tenant_id: i32) -> Result<Option<Menu>>;
    /// All menus of a tenant in stable insertion order
    async fn find_all(&self, tenant_id: i32) -> Result<Vec<Menu>>;
    /// Menus assigned to a role, tenant-scoped, in stable insertion order
    async fn find_by_role(&self, role_id: i32, tenant_id: i32) -> Result<Vec<Menu>>;
    /// Menus reachable by a user through their role
    async fn find_by_user(&self, user_id: Uuid, tenant_id: i32) -> Result<Vec<Menu>>;
    async fn update(&self, id: i32, input: &UpdateMenuInput, ctx: &TenantContext) -> Result<Menu>;
    async fn delete(&self, id: i32, ctx: &TenantContext) -> Result<()>;
}

pub struct MenuRepositoryImpl {
    pool: PgPool,
}

impl MenuRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A parent reference must point at a menu in the same tenant.
    async fn check_parent<'e, E>(executor: E, parent_id: i32, tenant_id: i32) -> Result<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let exists: Option<(i32,)> =
            sqlx::query_as("SELECT id FROM menus WHERE id = $1 AND tenant_id = $2")
                .bind(parent_id)
                .bind(tenant_id)
                .fetch_optional(executor)
                .await?;

        if exists.is_none() {
            return Err(AppError::Validation(format!(
                "Parent menu {} does not exist in this tenant",
                parent_id
            )));
        }
        Ok(())
    }

    /// Reparenting must not close a cycle: walk the proposed parent's
    /// ancestor chain and reject if it reaches the menu being updated.
    async fn check_no_cycle(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: i32,
        parent_id: i32,
        tenant_id: i32,
    ) -> Result<()> {
        let mut current = Some(parent_id);
        while let Some(ancestor) = current {
            if ancestor == id {
                return Err(AppError::Validation(format!(
                    "Menu {} is a descendant of menu {}; assigning it as parent would create a cycle",
                    parent_id, id
                )));
            }
            current = sqlx::query_scalar::<_, Option<i32>>(
                "SELECT parent_id FROM menus WHERE id = $1 AND tenant_id = $2",
            )
            .bind(ancestor)
            .bind(tenant_id)
            .fetch_optional(&mut **tx)
            .await?
            .flatten();
        }
        Ok(())
    }
}

#[async_trait]
impl MenuRepository for MenuRepositoryImpl {
    async fn create(&self, input: &CreateMenuInput, ctx: &TenantContext) -> Result<Menu> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = input.parent_id {
            Self::check_parent(&mut *tx, parent_id, ctx.tenant_id).await?;
        }

        let menu = sqlx::query_as::<_, Menu>(&format!(
            r#"
            INSERT INTO menus (name, url, icon, parent_id, tenant_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING {MENU_COLUMNS}
            "#,
        ))
        .bind(&input.name)
        .bind(&input.url)
        .bind(&input.icon)
        .bind(input.parent_id)
        .bind(ctx.tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        append_entry(
            &mut *tx,
            &NewAuditEntry::created("menu", menu.id, &menu, &ctx.actor, ctx.tenant_id),
        )
        .await?;

        tx.commit().await?;
        Ok(menu)
    }

    async fn find_by_id(&self, id: i32, tenant_id: i32) -> Result<Option<Menu>> {
        let menu = sqlx::query_as::<_, Menu>(&format!(
            "SELECT {MENU_COLUMNS} FROM menus WHERE id = $1 AND tenant_id = $2",
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(menu)
    }

    async fn find_all(&self, tenant_id: i32) -> Result<Vec<Menu>> {
        let menus = sqlx::query_as::<_, Menu>(&format!(
            "SELECT {MENU_COLUMNS} FROM menus WHERE tenant_id = $1 ORDER BY id ASC",
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(menus)
    }

    async fn find_by_role(&self, role_id: i32, tenant_id: i32) -> Result<Vec<Menu>> {
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

    async fn find_by_user(&self, user_id: Uuid, tenant_id: i32) -> Result<Vec<Menu>> {
        let menus = sqlx::query_as::<_, Menu>(
            r#"
            SELECT m.id, m.name, m.url, m.icon, m.parent_id, m.tenant_id, m.created_at, m.updated_at
            FROM menus m
            INNER JOIN role_menus rm ON m.id = rm.menu_id
            INNER JOIN users u ON rm.role_id = u.role_id
            WHERE u.id = $1 AND u.tenant_id = $2 AND m.tenant_id = $2
            ORDER BY m.id ASC
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(menus)
    }

    async fn update(&self, id: i32, input: &UpdateMenuInput, ctx: &TenantContext) -> Result<Menu> {
        let mut tx = self.pool.begin().await?;

        let before = sqlx::query_as::<_, Menu>(&format!(
            "SELECT {MENU_COLUMNS} FROM menus WHERE id = $1 AND tenant_id = $2",
        ))
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Menu {} not found", id)))?;

        if let Some(parent_id) = input.parent_id {
            if parent_id == id {
                return Err(AppError::Validation(
                    "A menu cannot be its own parent".to_string(),
                ));
            }
            Self::check_parent(&mut *tx, parent_id, ctx.tenant_id).await?;
            Self::check_no_cycle(&mut tx, id, parent_id, ctx.tenant_id).await?;
        }

        let after = sqlx::query_as::<_, Menu>(&format!(
            r#"
            UPDATE menus
            SET name = $1, url = $2, icon = $3, parent_id = $4, updated_at = NOW()
            WHERE id = $5 AND tenant_id = $6
            RETURNING {MENU_COLUMNS}
            "#,
        ))
        .bind(&input.name)
        .bind(&input.url)
        .bind(&input.icon)
        .bind(input.parent_id)
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        append_entry(
            &mut *tx,
            &NewAuditEntry::updated("menu", id, &before, &after, &ctx.actor, ctx.tenant_id),
        )
        .await?;

        tx.commit().await?;
        Ok(after)
    }

    async fn delete(&self, id: i32, ctx: &TenantContext) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let before = sqlx::query_as::<_, Menu>(&format!(
            "SELECT {MENU_COLUMNS} FROM menus WHERE id = $1 AND tenant_id = $2",
        ))
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Menu {} not found", id)))?;

        // Children of a deleted menu become roots on the next tree build
        sqlx::query("UPDATE menus SET parent_id = NULL WHERE parent_id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM role_menus WHERE menu_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM menus WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .execute(&mut *tx)
            .await?;

        append_entry(
            &mut *tx,
            &NewAuditEntry::deleted("menu", id, &before, &ctx.actor, ctx.tenant_id),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
