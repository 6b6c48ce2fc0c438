//! JWT authentication middleware
//!
//! Validates the Bearer token on protected routes, re-reads the user so a
//! deleted account is rejected immediately, and resolves the user's
//! permission set once per request. Downstream layers and handlers read the
//! result from the [`CurrentUser`] request extension.

use crate::error::{AppError, Result};
use crate::jwt::{JwtManager, TokenKind};
use crate::repository::UserRepository;
use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated identity attached to the request after token validation
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub username: String,
    /// Tenant claimed by the token
    pub tenant_id: i32,
    /// Permission codes resolved through the user's role
    pub permissions: Arc<HashSet<String>>,
}

impl CurrentUser {
    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.contains(code)
    }
}

/// Shared state for the authentication middleware
pub struct AuthState<U: UserRepository> {
    pub jwt: Arc<JwtManager>,
    pub user_repo: Arc<U>,
}

impl<U: UserRepository> Clone for AuthState<U> {
    fn clone(&self) -> Self {
        Self {
            jwt: Arc::clone(&self.jwt),
            user_repo: Arc::clone(&self.user_repo),
        }
    }
}

impl<U: UserRepository> AuthState<U> {
    pub fn new(jwt: Arc<JwtManager>, user_repo: Arc<U>) -> Self {
        Self { jwt, user_repo }
    }
}

fn bearer_token(request: &Request<Body>) -> Result<&str> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?;

    let value = header.to_str().map_err(|_| {
        AppError::Unauthorized("Invalid authorization header encoding".to_string())
    })?;

    value.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized("Authorization header must use Bearer scheme".to_string())
    })
}

/// Authentication middleware for protected routes.
///
/// Rejects with 401 on a missing header, non-Bearer scheme, bad signature,
/// wrong token kind, expiry, or a user that no longer exists.
pub async fn authenticate<U: UserRepository>(
    State(state): State<AuthState<U>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(&request)?;
    let claims = state.jwt.validate(token, TokenKind::Access)?;
    let user_id = claims.user_id()?;

    let user = state
        .user_repo
        .find_by_id(user_id, claims.tenant_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

    let permissions = state
        .user_repo
        .resolve_permissions(user.id, user.tenant_id)
        .await?
        .into_iter()
        .collect::<HashSet<String>>();

    request.extensions_mut().insert(CurrentUser {
        user_id: user.id,
        username: user.username,
        tenant_id: user.tenant_id,
        permissions: Arc::new(permissions),
    });

    Ok(next.run(request).await)
}
