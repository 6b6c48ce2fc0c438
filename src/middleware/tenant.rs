//! Tenant resolution middleware
//!
//! Runs after authentication. The token's tenant claim is authoritative; an
//! `X-Tenant-ID` header, when present, must agree with it. The resolved
//! [`TenantContext`] is attached as a request extension for handlers and
//! repositories.

use crate::domain::TenantContext;
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use axum::{body::Body, http::Request, middleware::Next, response::Response};

pub const TENANT_HEADER: &str = "X-Tenant-ID";

fn header_tenant(request: &Request<Body>) -> Result<Option<i32>> {
    let Some(value) = request.headers().get(TENANT_HEADER) else {
        return Ok(None);
    };

    let raw = value
        .to_str()
        .map_err(|_| AppError::TenantMalformed("non-ASCII header value".to_string()))?;
    let parsed: i32 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::TenantMalformed(raw.to_string()))?;
    if parsed <= 0 {
        return Err(AppError::TenantMalformed(raw.to_string()));
    }
    Ok(Some(parsed))
}

/// Bind the request to a tenant.
///
/// Fails closed: a malformed header or a header that disagrees with the
/// token's tenant claim rejects the request before any handler runs.
pub async fn bind_tenant(mut request: Request<Body>, next: Next) -> Result<Response> {
    let current = request
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or(AppError::TenantMissing)?;

    if let Some(requested) = header_tenant(&request)? {
        if requested != current.tenant_id {
            return Err(AppError::TenantMismatch);
        }
    }

    request
        .extensions_mut()
        .insert(TenantContext::new(current.tenant_id, current.username));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::{middleware, routing::get, Extension, Router};
    use std::collections::HashSet;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn tenant_echo(Extension(ctx): Extension<TenantContext>) -> String {
        ctx.tenant_id.to_string()
    }

    // Stands in for the authentication middleware in these tests
    async fn inject_user(mut request: Request<Body>, next: Next) -> Response {
        request.extensions_mut().insert(CurrentUser {
            user_id: Uuid::new_v4(),
            username: "alice".to_string(),
            tenant_id: 7,
            permissions: Arc::new(HashSet::new()),
        });
        next.run(request).await
    }

    fn app() -> Router {
        Router::new()
            .route("/ctx", get(tenant_echo))
            .layer(middleware::from_fn(bind_tenant))
            .layer(middleware::from_fn(inject_user))
    }

    async fn send(app: Router, header: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/ctx");
        if let Some(value) = header {
            builder = builder.header(TENANT_HEADER, value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_missing_header_falls_back_to_token_tenant() {
        let (status, body) = send(app(), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "7");
    }

    #[tokio::test]
    async fn test_matching_header_is_accepted() {
        let (status, body) = send(app(), Some("7")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "7");
    }

    #[tokio::test]
    async fn test_mismatched_header_is_rejected() {
        let (status, body) = send(app(), Some("8")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("tenant_mismatch"));
    }

    #[tokio::test]
    async fn test_malformed_header_is_rejected() {
        for value in ["abc", "-1", "0", "7.5", ""] {
            let (status, body) = send(app(), Some(value)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "value {:?}", value);
            assert!(body.contains("tenant_malformed"), "value {:?}", value);
        }
    }

    #[tokio::test]
    async fn test_unauthenticated_request_is_rejected() {
        // No inject_user layer, so no CurrentUser extension exists
        let app = Router::new()
            .route("/ctx", get(tenant_echo))
            .layer(middleware::from_fn(bind_tenant));

        let (status, body) = send(app, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("tenant_missing"));
    }
}
