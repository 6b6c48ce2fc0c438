//! User business logic

use crate::crypto;
use crate::domain::{ChangePasswordInput, CreateUserInput, TenantContext, UpdateUserInput, User};
use crate::error::{AppError, Result};
use crate::repository::user::NewUser;
use crate::repository::UserRepository;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct UserService<U: UserRepository> {
    repo: Arc<U>,
}

impl<U: UserRepository> UserService<U> {
    pub fn new(repo: Arc<U>) -> Self {
        Self { repo }
    }

    pub async fn create_user(&self, input: CreateUserInput, ctx: &TenantContext) -> Result<User> {
        input.validate()?;

        if self.repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Email {} is already registered",
                input.email
            )));
        }

        let new_user = NewUser {
            username: input.username,
            email: input.email,
            password_hash: crypto::hash_password(&input.password)?,
            role_id: input.role_id,
        };
        self.repo.create(&new_user, ctx).await
    }

    pub async fn get_user(&self, id: Uuid, tenant_id: i32) -> Result<User> {
        self.repo
            .find_by_id(id, tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    pub async fn list_users(
        &self,
        tenant_id: i32,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64)> {
        let limit = limit.clamp(1, 100);
        let offset = offset.max(0);
        let users = self.repo.find_all(tenant_id, limit, offset).await?;
        let total = self.repo.count(tenant_id).await?;
        Ok((users, total))
    }

    pub async fn update_user(
        &self,
        id: Uuid,
        input: UpdateUserInput,
        ctx: &TenantContext,
    ) -> Result<User> {
        input.validate()?;

        if let Some(existing) = self.repo.find_by_email(&input.email).await? {
            if existing.id != id {
                return Err(AppError::Conflict(format!(
                    "Email {} is already registered",
                    input.email
                )));
            }
        }

        self.repo.update_profile(id, &input, ctx).await
    }

    pub async fn change_password(
        &self,
        id: Uuid,
        input: ChangePasswordInput,
        ctx: &TenantContext,
    ) -> Result<()> {
        input.validate()?;

        let user = self.get_user(id, ctx.tenant_id).await?;
        if !crypto::verify_password(&user.password_hash, &input.old_password) {
            return Err(AppError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        let hash = crypto::hash_password(&input.new_password)?;
        self.repo.update_password(id, &hash, ctx).await
    }

    pub async fn assign_role(&self, id: Uuid, role_id: i32, ctx: &TenantContext) -> Result<User> {
        self.repo.assign_role(id, role_id, ctx).await
    }

    pub async fn delete_user(&self, id: Uuid, ctx: &TenantContext) -> Result<()> {
        self.repo.delete(id, ctx).await
    }

    /// Permission codes the user holds in the tenant, as a set for O(1)
    /// membership checks during enforcement.
    pub async fn resolve_permissions(
        &self,
        user_id: Uuid,
        tenant_id: i32,
    ) -> Result<HashSet<String>> {
        let codes = self.repo.resolve_permissions(user_id, tenant_id).await?;
        Ok(codes.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::user::MockUserRepository;
    use chrono::Utc;

    fn ctx() -> TenantContext {
        TenantContext::new(1, "tester")
    }

    fn stored_user(email: &str, password: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: email.to_string(),
            password_hash: crypto::hash_password(password).unwrap(),
            role_id: 1,
            tenant_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_email() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .returning(|_| Ok(Some(stored_user("alice@example.com", "irrelevant"))));

        let service = UserService::new(Arc::new(repo));
        let input = CreateUserInput {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "long-enough-password".to_string(),
            role_id: 1,
        };

        let err = service.create_user(input, &ctx()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email().returning(|_| Ok(None));
        repo.expect_create()
            .withf(|new_user, _| {
                new_user.password_hash.starts_with("$argon2")
                    && new_user.password_hash != "long-enough-password"
            })
            .returning(|new_user, ctx| {
                let now = Utc::now();
                Ok(User {
                    id: Uuid::new_v4(),
                    username: new_user.username.clone(),
                    email: new_user.email.clone(),
                    password_hash: new_user.password_hash.clone(),
                    role_id: new_user.role_id,
                    tenant_id: ctx.tenant_id,
                    created_at: now,
                    updated_at: now,
                })
            });

        let service = UserService::new(Arc::new(repo));
        let input = CreateUserInput {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "long-enough-password".to_string(),
            role_id: 1,
        };

        let user = service.create_user(input, &ctx()).await.unwrap();
        assert_eq!(user.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_change_password_rejects_wrong_old_password() {
        let user = stored_user("bob@example.com", "the-real-password");
        let user_id = user.id;
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .returning(move |_, _| Ok(Some(user.clone())));

        let service = UserService::new(Arc::new(repo));
        let input = ChangePasswordInput {
            old_password: "not-the-real-password".to_string(),
            new_password: "a-brand-new-password".to_string(),
        };

        let err = service
            .change_password(user_id, input, &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_resolve_permissions_empty_role_is_not_an_error() {
        let mut repo = MockUserRepository::new();
        repo.expect_resolve_permissions().returning(|_, _| Ok(vec![]));

        let service = UserService::new(Arc::new(repo));
        let perms = service
            .resolve_permissions(Uuid::new_v4(), 1)
            .await
            .unwrap();
        assert!(perms.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_permissions_deduplicates() {
        let mut repo = MockUserRepository::new();
        repo.expect_resolve_permissions().returning(|_, _| {
            Ok(vec![
                "USER_VIEW".to_string(),
                "USER_VIEW".to_string(),
                "ROLE_VIEW".to_string(),
            ])
        });

        let service = UserService::new(Arc::new(repo));
        let perms = service
            .resolve_permissions(Uuid::new_v4(), 1)
            .await
            .unwrap();
        assert_eq!(perms.len(), 2);
        assert!(perms.contains("USER_VIEW"));
        assert!(perms.contains("ROLE_VIEW"));
    }
}
