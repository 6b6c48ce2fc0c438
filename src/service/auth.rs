//! Authentication: login and token refresh

use crate::crypto;
use crate::domain::{MenuNode, User};
use crate::error::{AppError, Result};
use crate::jwt::{JwtManager, TokenKind};
use crate::repository::{MenuRepository, UserRepository};
use crate::service::menu::build_menu_tree;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshInput {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
    pub menus: Vec<MenuNode>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

pub struct AuthService<U: UserRepository, M: MenuRepository> {
    user_repo: Arc<U>,
    menu_repo: Arc<M>,
    jwt: Arc<JwtManager>,
}

impl<U: UserRepository, M: MenuRepository> AuthService<U, M> {
    pub fn new(user_repo: Arc<U>, menu_repo: Arc<M>, jwt: Arc<JwtManager>) -> Self {
        Self {
            user_repo,
            menu_repo,
            jwt,
        }
    }

    /// Authenticate by email and password, issuing both tokens and the
    /// user's navigation tree.
    ///
    /// Unknown email and wrong password produce the same error, so a caller
    /// cannot probe which emails are registered.
    pub async fn login(&self, input: LoginInput) -> Result<LoginResponse> {
        input.validate()?;

        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let user = self
            .user_repo
            .find_by_email(&input.email)
            .await?
            .ok_or_else(invalid)?;

        if !crypto::verify_password(&user.password_hash, &input.password) {
            return Err(invalid());
        }

        let access_token =
            self.jwt
                .issue_access_token(user.id, user.tenant_id, &user.username)?;
        let refresh_token =
            self.jwt
                .issue_refresh_token(user.id, user.tenant_id, &user.username)?;

        let menus = self.menu_repo.find_by_user(user.id, user.tenant_id).await?;

        tracing::info!(user_id = %user.id, tenant_id = user.tenant_id, "user logged in");

        Ok(LoginResponse {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.jwt.access_token_ttl(),
            user,
            menus: build_menu_tree(menus),
        })
    }

    /// Exchange a valid refresh token for a fresh access token.
    ///
    /// The user is re-read so a deleted account cannot keep minting access
    /// tokens from an old refresh token.
    pub async fn refresh(&self, input: RefreshInput) -> Result<RefreshResponse> {
        input.validate()?;

        let claims = self.jwt.validate(&input.refresh_token, TokenKind::Refresh)?;
        let user_id = claims.user_id()?;

        let user = self
            .user_repo
            .find_by_id(user_id, claims.tenant_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

        let access_token =
            self.jwt
                .issue_access_token(user.id, user.tenant_id, &user.username)?;

        Ok(RefreshResponse {
            access_token,
            token_type: "Bearer",
            expires_in: self.jwt.access_token_ttl(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::repository::menu::MockMenuRepository;
    use crate::repository::user::MockUserRepository;
    use chrono::Utc;
    use uuid::Uuid;

    fn jwt_manager() -> Arc<JwtManager> {
        Arc::new(JwtManager::new(JwtConfig {
            access_secret: "access-secret-for-testing-purposes-only".to_string(),
            refresh_secret: "refresh-secret-for-testing-purposes-only".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 604800,
        }))
    }

    fn stored_user(email: &str, password: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: email.to_string(),
            password_hash: crypto::hash_password(password).unwrap(),
            role_id: 1,
            tenant_id: 3,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_login_issues_both_tokens() {
        let user = stored_user("alice@example.com", "correct-password");
        let user_clone = user.clone();
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user_clone.clone())));
        let mut menu_repo = MockMenuRepository::new();
        menu_repo.expect_find_by_user().returning(|_, _| Ok(vec![]));

        let jwt = jwt_manager();
        let service = AuthService::new(Arc::new(user_repo), Arc::new(menu_repo), jwt.clone());

        let response = service
            .login(LoginInput {
                email: "alice@example.com".to_string(),
                password: "correct-password".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 3600);
        let claims = jwt
            .validate(&response.access_token, TokenKind::Access)
            .unwrap();
        assert_eq!(claims.tenant_id, 3);
        assert!(jwt
            .validate(&response.refresh_token, TokenKind::Refresh)
            .is_ok());
    }

    #[tokio::test]
    async fn test_login_error_is_indistinguishable() {
        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_email().returning(|email| {
            if email == "known@example.com" {
                Ok(Some(stored_user("known@example.com", "real-password")))
            } else {
                Ok(None)
            }
        });
        let menu_repo = MockMenuRepository::new();

        let service = AuthService::new(Arc::new(user_repo), Arc::new(menu_repo), jwt_manager());

        let unknown_email = service
            .login(LoginInput {
                email: "unknown@example.com".to_string(),
                password: "whatever".to_string(),
            })
            .await
            .unwrap_err();
        let wrong_password = service
            .login(LoginInput {
                email: "known@example.com".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(unknown_email.to_string(), wrong_password.to_string());
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let user_repo = MockUserRepository::new();
        let menu_repo = MockMenuRepository::new();
        let jwt = jwt_manager();
        let access = jwt.issue_access_token(Uuid::new_v4(), 1, "alice").unwrap();

        let service = AuthService::new(Arc::new(user_repo), Arc::new(menu_repo), jwt);
        let err = service
            .refresh(RefreshInput {
                refresh_token: access,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Jwt(_)));
    }

    #[tokio::test]
    async fn test_refresh_rejects_deleted_user() {
        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_id().returning(|_, _| Ok(None));
        let menu_repo = MockMenuRepository::new();
        let jwt = jwt_manager();
        let refresh = jwt.issue_refresh_token(Uuid::new_v4(), 1, "alice").unwrap();

        let service = AuthService::new(Arc::new(user_repo), Arc::new(menu_repo), jwt);
        let err = service
            .refresh(RefreshInput {
                refresh_token: refresh,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_refresh_issues_new_access_token() {
        let user = stored_user("alice@example.com", "pw-does-not-matter");
        let user_id = user.id;
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(user.clone())));
        let menu_repo = MockMenuRepository::new();
        let jwt = jwt_manager();
        let refresh = jwt.issue_refresh_token(user_id, 3, "alice").unwrap();

        let service =
            AuthService::new(Arc::new(user_repo), Arc::new(menu_repo), jwt.clone());
        let response = service
            .refresh(RefreshInput {
                refresh_token: refresh,
            })
            .await
            .unwrap();

        let claims = jwt
            .validate(&response.access_token, TokenKind::Access)
            .unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
    }
}
