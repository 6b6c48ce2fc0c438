//! Permission enforcement middleware

use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

/// Reject the request unless the authenticated user holds the permission
/// code given as state.
///
/// The check is an exact, case-sensitive membership test against the set
/// resolved at authentication time. Layer per route with
/// `middleware::from_fn_with_state(codes::ROLE_CREATE, require_permission)`.
pub async fn require_permission(
    State(code): State<&'static str>,
    request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let current = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?;

    if !current.has_permission(code) {
        tracing::warn!(
            user_id = %current.user_id,
            tenant_id = current.tenant_id,
            permission = code,
            "permission denied"
        );
        return Err(AppError::Forbidden(format!(
            "Missing required permission: {}",
            code
        )));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rbac::codes;
    use axum::http::StatusCode;
    use axum::{middleware, routing::get, Router};
    use std::collections::HashSet;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn handler() -> &'static str {
        "ok"
    }

    fn inject_user_with(perms: &[&str]) -> CurrentUser {
        CurrentUser {
            user_id: Uuid::new_v4(),
            username: "alice".to_string(),
            tenant_id: 1,
            permissions: Arc::new(perms.iter().map(|p| p.to_string()).collect::<HashSet<_>>()),
        }
    }

    fn app(perms: &[&str]) -> Router {
        let current = inject_user_with(perms);
        Router::new()
            .route(
                "/roles",
                get(handler).route_layer(middleware::from_fn_with_state(
                    codes::ROLE_VIEW,
                    require_permission,
                )),
            )
            .layer(middleware::from_fn(
                move |mut request: Request<Body>, next: Next| {
                    let current = current.clone();
                    async move {
                        request.extensions_mut().insert(current);
                        next.run(request).await
                    }
                },
            ))
    }

    async fn get_roles(app: Router) -> StatusCode {
        app.oneshot(
            Request::builder()
                .uri("/roles")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
    }

    #[tokio::test]
    async fn test_holder_passes() {
        let status = get_roles(app(&[codes::ROLE_VIEW, codes::USER_VIEW])).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_non_holder_is_forbidden() {
        let status = get_roles(app(&[codes::USER_VIEW])).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_check_is_case_sensitive() {
        let status = get_roles(app(&["role_view"])).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let app = Router::new().route(
            "/roles",
            get(handler).route_layer(middleware::from_fn_with_state(
                codes::ROLE_VIEW,
                require_permission,
            )),
        );
        let status = get_roles(app).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
