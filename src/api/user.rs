//! User management API handlers

use crate::api::{MessageResponse, PaginatedResponse, PaginationQuery, SuccessResponse};
use crate::domain::{ChangePasswordInput, CreateUserInput, TenantContext, UpdateUserInput};
use crate::error::Result;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

pub async fn list_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<impl IntoResponse> {
    let (users, total) = state
        .user_service
        .list_users(ctx.tenant_id, pagination.limit(), pagination.offset())
        .await?;

    Ok(Json(PaginatedResponse {
        data: users,
        total,
        page: pagination.page.max(1),
        per_page: pagination.limit(),
    }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get_user(id, ctx.tenant_id).await?;
    Ok(Json(SuccessResponse::new(user)))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Json(input): Json<CreateUserInput>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.create_user(input, &ctx).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(user))))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.update_user(id, input, &ctx).await?;
    Ok(Json(SuccessResponse::new(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.user_service.delete_user(id, &ctx).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<ChangePasswordInput>,
) -> Result<impl IntoResponse> {
    state.user_service.change_password(id, input, &ctx).await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleInput {
    pub role_id: i32,
}

pub async fn assign_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<AssignRoleInput>,
) -> Result<impl IntoResponse> {
    let user = state
        .user_service
        .assign_role(id, input.role_id, &ctx)
        .await?;
    Ok(Json(SuccessResponse::new(user)))
}
