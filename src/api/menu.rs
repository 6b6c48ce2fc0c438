//! Menu API handlers

use crate::api::{MessageResponse, SuccessResponse};
use crate::domain::{CreateMenuInput, TenantContext, UpdateMenuInput};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};

/// Flat menu list for the tenant
pub async fn list_menus(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
) -> Result<impl IntoResponse> {
    let menus = state.menu_service.list_menus(ctx.tenant_id).await?;
    Ok(Json(SuccessResponse::new(menus)))
}

/// Full navigation tree for the tenant
pub async fn menu_tree(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
) -> Result<impl IntoResponse> {
    let tree = state.menu_service.menu_tree(ctx.tenant_id).await?;
    Ok(Json(SuccessResponse::new(tree)))
}

/// Navigation tree restricted to the caller's role
pub async fn my_menu_tree(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let tree = state
        .menu_service
        .user_menu_tree(current.user_id, current.tenant_id)
        .await?;
    Ok(Json(SuccessResponse::new(tree)))
}

pub async fn get_menu(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let menu = state.menu_service.get_menu(id, ctx.tenant_id).await?;
    Ok(Json(SuccessResponse::new(menu)))
}

pub async fn create_menu(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Json(input): Json<CreateMenuInput>,
) -> Result<impl IntoResponse> {
    let menu = state.menu_service.create_menu(input, &ctx).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(menu))))
}

pub async fn update_menu(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<i32>,
    Json(input): Json<UpdateMenuInput>,
) -> Result<impl IntoResponse> {
    let menu = state.menu_service.update_menu(id, input, &ctx).await?;
    Ok(Json(SuccessResponse::new(menu)))
}

pub async fn delete_menu(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    state.menu_service.delete_menu(id, &ctx).await?;
    Ok(Json(MessageResponse::new("Menu deleted successfully")))
}
