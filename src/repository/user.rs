//! User repository

use crate::domain::{NewAuditEntry, TenantContext, UpdateUserInput, User};
use crate::error::{AppError, Result};
use crate::repository::audit::append_entry;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role_id, tenant_id, created_at, updated_at";

/// Insert payload carrying an already-hashed password. The service layer is
/// responsible for hashing; plain passwords never reach this module.
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: i32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &NewUser, ctx: &TenantContext) -> Result<User>;
    async fn find_by_id(&self, id: Uuid, tenant_id: i32) -> Result<Option<User>>;
    /// Lookup by email for login. Not tenant-scoped: the tenant is taken
    /// from the stored user row, not from the caller.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_all(&self, tenant_id: i32, limit: i64, offset: i64) -> Result<Vec<User>>;
    async fn count(&self, tenant_id: i32) -> Result<i64>;
    async fn update_profile(
        &self,
        id: Uuid,
        input: &UpdateUserInput,
        ctx: &TenantContext,
    ) -> Result<User>;
    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        ctx: &TenantContext,
    ) -> Result<()>;
    async fn assign_role(&self, id: Uuid, role_id: i32, ctx: &TenantContext) -> Result<User>;
    async fn delete(&self, id: Uuid, ctx: &TenantContext) -> Result<()>;
    /// Distinct permission codes reachable from the user's role.
    async fn resolve_permissions(&self, user_id: Uuid, tenant_id: i32) -> Result<Vec<String>>;
}

pub struct UserRepositoryImpl {
    pool: PgPool,
}

impl UserRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn require_user<'e, E>(executor: E, id: Uuid, tenant_id: i32) -> Result<User>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND tenant_id = $2",
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn create(&self, user: &NewUser, ctx: &TenantContext) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, role_id, tenant_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role_id)
        .bind(ctx.tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        append_entry(
            &mut *tx,
            &NewAuditEntry::created("user", created.id, &created, &ctx.actor, ctx.tenant_id),
        )
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid, tenant_id: i32) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND tenant_id = $2",
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1",
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_all(&self, tenant_id: i32, limit: i64, offset: i64) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE tenant_id = $1 ORDER BY created_at ASC LIMIT $2 OFFSET $3",
        ))
        .bind(tenant_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn count(&self, tenant_id: i32) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        input: &UpdateUserInput,
        ctx: &TenantContext,
    ) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let before = Self::require_user(&mut *tx, id, ctx.tenant_id).await?;

        let after = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = $1, email = $2, updated_at = NOW()
            WHERE id = $3 AND tenant_id = $4
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(&input.username)
        .bind(&input.email)
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        append_entry(
            &mut *tx,
            &NewAuditEntry::updated("user", id, &before, &after, &ctx.actor, ctx.tenant_id),
        )
        .await?;

        tx.commit().await?;
        Ok(after)
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        ctx: &TenantContext,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let before = Self::require_user(&mut *tx, id, ctx.tenant_id).await?;

        let after = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET password_hash = $1, updated_at = NOW()
            WHERE id = $2 AND tenant_id = $3
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(password_hash)
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        // User serialization skips the hash, so the audit values record the
        // change without leaking either hash.
        append_entry(
            &mut *tx,
            &NewAuditEntry::updated("user", id, &before, &after, &ctx.actor, ctx.tenant_id),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn assign_role(&self, id: Uuid, role_id: i32, ctx: &TenantContext) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let before = Self::require_user(&mut *tx, id, ctx.tenant_id).await?;

        let role_exists: Option<(i32,)> =
            sqlx::query_as("SELECT id FROM roles WHERE id = $1 AND tenant_id = $2")
                .bind(role_id)
                .bind(ctx.tenant_id)
                .fetch_optional(&mut *tx)
                .await?;
        if role_exists.is_none() {
            return Err(AppError::NotFound(format!("Role {} not found", role_id)));
        }

        let after = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET role_id = $1, updated_at = NOW()
            WHERE id = $2 AND tenant_id = $3
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(role_id)
        .bind(id)
        .bind(ctx.tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        append_entry(
            &mut *tx,
            &NewAuditEntry::updated("user", id, &before, &after, &ctx.actor, ctx.tenant_id),
        )
        .await?;

        tx.commit().await?;
        Ok(after)
    }

    async fn delete(&self, id: Uuid, ctx: &TenantContext) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let before = Self::require_user(&mut *tx, id, ctx.tenant_id).await?;

        sqlx::query("DELETE FROM users WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id)
            .execute(&mut *tx)
            .await?;

        append_entry(
            &mut *tx,
            &NewAuditEntry::deleted("user", id, &before, &ctx.actor, ctx.tenant_id),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn resolve_permissions(&self, user_id: Uuid, tenant_id: i32) -> Result<Vec<String>> {
        let codes: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT p.code
            FROM permissions p
            INNER JOIN role_permissions rp ON p.id = rp.permission_id
            INNER JOIN users u ON rp.role_id = u.role_id
            WHERE u.id = $1 AND u.tenant_id = $2 AND p.tenant_id = $2
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(codes.into_iter().map(|(code,)| code).collect())
    }
}
