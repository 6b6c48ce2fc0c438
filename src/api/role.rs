//! Role API handlers, including permission and menu assignment

use crate::api::{MessageResponse, SuccessResponse};
use crate::domain::{AssignmentInput, CreateRoleInput, TenantContext, UpdateRoleInput};
use crate::error::Result;
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};

pub async fn list_roles(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
) -> Result<impl IntoResponse> {
    let roles = state.rbac_service.list_roles(ctx.tenant_id).await?;
    Ok(Json(SuccessResponse::new(roles)))
}

/// Get role by ID with its permissions
pub async fn get_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let role = state
        .rbac_service
        .get_role_with_permissions(id, ctx.tenant_id)
        .await?;
    Ok(Json(SuccessResponse::new(role)))
}

pub async fn create_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Json(input): Json<CreateRoleInput>,
) -> Result<impl IntoResponse> {
    let role = state.rbac_service.create_role(input, &ctx).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(role))))
}

pub async fn update_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<i32>,
    Json(input): Json<UpdateRoleInput>,
) -> Result<impl IntoResponse> {
    let role = state.rbac_service.update_role(id, input, &ctx).await?;
    Ok(Json(SuccessResponse::new(role)))
}

pub async fn delete_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    state.rbac_service.delete_role(id, &ctx).await?;
    Ok(Json(MessageResponse::new("Role deleted successfully")))
}

// ==================== Role-Permission ====================

pub async fn role_permissions(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let permissions = state
        .rbac_service
        .role_permissions(id, ctx.tenant_id)
        .await?;
    Ok(Json(SuccessResponse::new(permissions)))
}

/// Replace the role's permission set
pub async fn assign_permissions(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<i32>,
    Json(input): Json<AssignmentInput>,
) -> Result<impl IntoResponse> {
    let permissions = state
        .rbac_service
        .assign_permissions(id, input, &ctx)
        .await?;
    Ok(Json(SuccessResponse::new(permissions)))
}

/// Remove only the named permissions from the role
pub async fn remove_permissions(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<i32>,
    Json(input): Json<AssignmentInput>,
) -> Result<impl IntoResponse> {
    let permissions = state
        .rbac_service
        .remove_permissions(id, input, &ctx)
        .await?;
    Ok(Json(SuccessResponse::new(permissions)))
}

// ==================== Role-Menu ====================

pub async fn role_menus(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let menus = state.rbac_service.role_menus(id, ctx.tenant_id).await?;
    Ok(Json(SuccessResponse::new(menus)))
}

/// Replace the role's menu set
pub async fn assign_menus(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<i32>,
    Json(input): Json<AssignmentInput>,
) -> Result<impl IntoResponse> {
    let menus = state.rbac_service.assign_menus(id, input, &ctx).await?;
    Ok(Json(SuccessResponse::new(menus)))
}

/// Remove only the named menus from the role
pub async fn remove_menus(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<i32>,
    Json(input): Json<AssignmentInput>,
) -> Result<impl IntoResponse> {
    let menus = state.rbac_service.remove_menus(id, input, &ctx).await?;
    Ok(Json(SuccessResponse::new(menus)))
}
