//! Audit trail API handlers

use crate::api::PaginatedResponse;
use crate::domain::{AuditQuery, TenantContext};
use crate::error::Result;
use crate::repository::AuditRepository;
use crate::server::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Extension, Json,
};

/// Query the tenant's audit trail, newest first
pub async fn list_audit_entries(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse> {
    let entries = state.audit_repo.find(ctx.tenant_id, &query).await?;
    let total = state.audit_repo.count(ctx.tenant_id, &query).await?;

    let per_page = query.effective_limit();
    let offset = query.effective_offset();

    Ok(Json(PaginatedResponse {
        data: entries,
        total,
        page: offset / per_page + 1,
        per_page,
    }))
}
