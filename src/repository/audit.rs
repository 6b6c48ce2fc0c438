//! Audit trail repository

use crate::domain::{AuditEntry, AuditQuery, NewAuditEntry};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::PgPool;

/// Append an audit entry through any executor.
///
/// Mutating repositories call this with their open transaction so the audit
/// write commits or rolls back with the mutation it describes.
pub(crate) async fn append_entry<'e, E>(executor: E, entry: &NewAuditEntry) -> Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO audit_log (entity_type, entity_id, action, before_value, after_value, actor, tenant_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        "#,
    )
    .bind(&entry.entity_type)
    .bind(&entry.entity_id)
    .bind(entry.action.as_str())
    .bind(&entry.before)
    .bind(&entry.after)
    .bind(&entry.actor)
    .bind(entry.tenant_id)
    .execute(executor)
    .await?;

    Ok(())
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Append one immutable entry. A failure here must fail the enclosing
    /// operation; audit is not best-effort.
    async fn record(&self, entry: &NewAuditEntry) -> Result<()>;
    /// Query the trail for one tenant, newest first
    async fn find(&self, tenant_id: i32, query: &AuditQuery) -> Result<Vec<AuditEntry>>;
    async fn count(&self, tenant_id: i32, query: &AuditQuery) -> Result<i64>;
}

pub struct AuditRepositoryImpl {
    pool: PgPool,
}

impl AuditRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(sql: &mut String, query: &AuditQuery, mut idx: usize) -> usize {
        if query.entity_type.is_some() {
            idx += 1;
            sql.push_str(&format!(" AND entity_type = ${}", idx));
        }
        if query.entity_id.is_some() {
            idx += 1;
            sql.push_str(&format!(" AND entity_id = ${}", idx));
        }
        if query.action.is_some() {
            idx += 1;
            sql.push_str(&format!(" AND action = ${}", idx));
        }
        if query.from_date.is_some() {
            idx += 1;
            sql.push_str(&format!(" AND created_at >= ${}", idx));
        }
        if query.to_date.is_some() {
            idx += 1;
            sql.push_str(&format!(" AND created_at <= ${}", idx));
        }
        idx
    }
}

#[async_trait]
impl AuditRepository for AuditRepositoryImpl {
    async fn record(&self, entry: &NewAuditEntry) -> Result<()> {
        append_entry(&self.pool, entry).await
    }

    async fn find(&self, tenant_id: i32, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        let mut sql = String::from(
            "SELECT id, entity_type, entity_id, action, before_value AS before, after_value AS after, actor, tenant_id, created_at \
             FROM audit_log WHERE tenant_id = $1",
        );
        let idx = Self::push_filters(&mut sql, query, 1);
        sql.push_str(&format!(
            " ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            idx + 1,
            idx + 2
        ));

        let mut query_builder = sqlx::query_as::<_, AuditEntry>(&sql).bind(tenant_id);
        if let Some(ref entity_type) = query.entity_type {
            query_builder = query_builder.bind(entity_type);
        }
        if let Some(ref entity_id) = query.entity_id {
            query_builder = query_builder.bind(entity_id);
        }
        if let Some(action) = query.action {
            query_builder = query_builder.bind(action.as_str());
        }
        if let Some(from_date) = query.from_date {
            query_builder = query_builder.bind(from_date);
        }
        if let Some(to_date) = query.to_date {
            query_builder = query_builder.bind(to_date);
        }

        query_builder = query_builder
            .bind(query.effective_limit())
            .bind(query.effective_offset());

        let entries = query_builder.fetch_all(&self.pool).await?;
        Ok(entries)
    }

    async fn count(&self, tenant_id: i32, query: &AuditQuery) -> Result<i64> {
        let mut sql = String::from("SELECT COUNT(*) FROM audit_log WHERE tenant_id = $1");
        Self::push_filters(&mut sql, query, 1);

        let mut query_builder = sqlx::query_as::<_, (i64,)>(&sql).bind(tenant_id);
        if let Some(ref entity_type) = query.entity_type {
            query_builder = query_builder.bind(entity_type);
        }
        if let Some(ref entity_id) = query.entity_id {
            query_builder = query_builder.bind(entity_id);
        }
        if let Some(action) = query.action {
            query_builder = query_builder.bind(action.as_str());
        }
        if let Some(from_date) = query.from_date {
            query_builder = query_builder.bind(from_date);
        }
        if let Some(to_date) = query.to_date {
            query_builder = query_builder.bind(to_date);
        }

        let (count,) = query_builder.fetch_one(&self.pool).await?;
        Ok(count)
    }
}
