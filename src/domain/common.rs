//! Shared domain types

use serde::{Deserialize, Serialize};

/// Per-request tenant context.
///
/// Established by the tenant resolution middleware after authentication and
/// consumed by every repository operation. All reads, writes and joins are
/// scoped to `tenant_id`; `actor` stamps mutations and audit entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: i32,
    pub actor: String,
}

impl TenantContext {
    pub fn new(tenant_id: i32, actor: impl Into<String>) -> Self {
        Self {
            tenant_id,
            actor: actor.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_context_new() {
        let ctx = TenantContext::new(7, "alice");
        assert_eq!(ctx.tenant_id, 7);
        assert_eq!(ctx.actor, "alice");
    }
}
