//! Authentication API handlers

use crate::api::SuccessResponse;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::server::AppState;
use crate::service::auth::{LoginInput, RefreshInput};
use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde::Serialize;
use uuid::Uuid;

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<impl IntoResponse> {
    let response = state.auth_service.login(input).await?;
    Ok(Json(SuccessResponse::new(response)))
}

/// Exchange a refresh token for a new access token
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshInput>,
) -> Result<impl IntoResponse> {
    let response = state.auth_service.refresh(input).await?;
    Ok(Json(SuccessResponse::new(response)))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub username: String,
    pub tenant_id: i32,
    pub permissions: Vec<String>,
}

/// Identity and permissions of the authenticated caller
pub async fn me(Extension(current): Extension<CurrentUser>) -> Result<impl IntoResponse> {
    let mut permissions: Vec<String> = current.permissions.iter().cloned().collect();
    permissions.sort();

    Ok(Json(SuccessResponse::new(MeResponse {
        user_id: current.user_id,
        username: current.username,
        tenant_id: current.tenant_id,
        permissions,
    })))
}
