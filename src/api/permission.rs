//! Permission API handlers

use crate::api::{MessageResponse, SuccessResponse};
use crate::domain::{CreatePermissionInput, TenantContext, UpdatePermissionInput};
use crate::error::Result;
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};

pub async fn list_permissions(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
) -> Result<impl IntoResponse> {
    let permissions = state.rbac_service.list_permissions(ctx.tenant_id).await?;
    Ok(Json(SuccessResponse::new(permissions)))
}

pub async fn get_permission(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let permission = state
        .rbac_service
        .get_permission(id, ctx.tenant_id)
        .await?;
    Ok(Json(SuccessResponse::new(permission)))
}

pub async fn create_permission(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Json(input): Json<CreatePermissionInput>,
) -> Result<impl IntoResponse> {
    let permission = state.rbac_service.create_permission(input, &ctx).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(permission))))
}

pub async fn update_permission(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<i32>,
    Json(input): Json<UpdatePermissionInput>,
) -> Result<impl IntoResponse> {
    let permission = state
        .rbac_service
        .update_permission(id, input, &ctx)
        .await?;
    Ok(Json(SuccessResponse::new(permission)))
}

pub async fn delete_permission(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    state.rbac_service.delete_permission(id, &ctx).await?;
    Ok(Json(MessageResponse::new(
        "Permission deleted successfully",
    )))
}
