//! Audit trail domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Action recorded by an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }
}

/// Immutable audit trail entry. Append-only, never mutated after write.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: String,
    /// One of `create`, `update`, `delete`
    pub action: String,
    /// Snapshot before the mutation; None for create
    pub before: Option<serde_json::Value>,
    /// Snapshot after the mutation; None for delete
    pub after: Option<serde_json::Value>,
    pub actor: String,
    pub tenant_id: i32,
    pub created_at: DateTime<Utc>,
}

/// Input for appending an audit entry
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub entity_type: String,
    pub entity_id: String,
    pub action: AuditAction,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub actor: String,
    pub tenant_id: i32,
}

impl NewAuditEntry {
    /// Entry for a created entity; no before-snapshot exists.
    pub fn created<T: Serialize>(
        entity_type: &str,
        entity_id: impl ToString,
        after: &T,
        actor: &str,
        tenant_id: i32,
    ) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action: AuditAction::Create,
            before: None,
            after: serde_json::to_value(after).ok(),
            actor: actor.to_string(),
            tenant_id,
        }
    }

    /// Entry for an updated entity with both snapshots.
    pub fn updated<T: Serialize, U: Serialize>(
        entity_type: &str,
        entity_id: impl ToString,
        before: &T,
        after: &U,
        actor: &str,
        tenant_id: i32,
    ) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action: AuditAction::Update,
            before: serde_json::to_value(before).ok(),
            after: serde_json::to_value(after).ok(),
            actor: actor.to_string(),
            tenant_id,
        }
    }

    /// Entry for a deleted entity; no after-snapshot exists.
    pub fn deleted<T: Serialize>(
        entity_type: &str,
        entity_id: impl ToString,
        before: &T,
        actor: &str,
        tenant_id: i32,
    ) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action: AuditAction::Delete,
            before: serde_json::to_value(before).ok(),
            after: None,
            actor: actor.to_string(),
            tenant_id,
        }
    }
}

/// Audit trail query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub action: Option<AuditAction>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl AuditQuery {
    /// Page size actually used: defaults to 50, clamped to 1..=100.
    /// Zero or negative values never reach the database.
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 100)
    }

    /// Offset actually used: defaults to 0, never negative.
    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_action_as_str() {
        assert_eq!(AuditAction::Create.as_str(), "create");
        assert_eq!(AuditAction::Update.as_str(), "update");
        assert_eq!(AuditAction::Delete.as_str(), "delete");
    }

    #[test]
    fn test_created_entry_has_no_before() {
        let entry = NewAuditEntry::created(
            "menu",
            42,
            &serde_json::json!({"name": "Reports"}),
            "alice",
            3,
        );
        assert_eq!(entry.action, AuditAction::Create);
        assert!(entry.before.is_none());
        assert!(entry.after.is_some());
        assert_eq!(entry.entity_id, "42");
        assert_eq!(entry.tenant_id, 3);
    }

    #[test]
    fn test_query_paging_defaults() {
        let query = AuditQuery::default();
        assert_eq!(query.effective_limit(), 50);
        assert_eq!(query.effective_offset(), 0);
    }

    #[test]
    fn test_query_paging_clamps_out_of_range_values() {
        let query = AuditQuery {
            limit: Some(-5),
            offset: Some(-10),
            ..AuditQuery::default()
        };
        assert_eq!(query.effective_limit(), 1);
        assert_eq!(query.effective_offset(), 0);

        let query = AuditQuery {
            limit: Some(10_000),
            offset: Some(200),
            ..AuditQuery::default()
        };
        assert_eq!(query.effective_limit(), 100);
        assert_eq!(query.effective_offset(), 200);
    }

    #[test]
    fn test_deleted_entry_has_no_after() {
        let entry = NewAuditEntry::deleted(
            "role",
            7,
            &serde_json::json!({"name": "Admin"}),
            "bob",
            1,
        );
        assert_eq!(entry.action, AuditAction::Delete);
        assert!(entry.before.is_some());
        assert!(entry.after.is_none());
    }
}
