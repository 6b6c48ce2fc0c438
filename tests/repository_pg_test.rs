//! Repository tests against a real Postgres.
//!
//! These exercise the transactional paths that mocks cannot: replace-all
//! assignment, rollback on failure, and same-transaction audit writes.
//! They are ignored by default; run them with a database available:
//!
//! ```text
//! DATABASE_URL=postgres://... cargo test -- --ignored
//! ```

use sqlx::PgPool;
use vomo_core::domain::{
    AssignmentInput, CreateMenuInput, CreatePermissionInput, CreateRoleInput, TenantContext,
    UpdateMenuInput,
};
use vomo_core::error::AppError;
use vomo_core::repository::{
    menu::MenuRepositoryImpl, permission::PermissionRepositoryImpl, role::RoleRepositoryImpl,
    MenuRepository, PermissionRepository, RoleRepository,
};

fn ctx() -> TenantContext {
    TenantContext::new(1, "tester")
}

async fn seed_role(pool: &PgPool, name: &str) -> i32 {
    let repo = RoleRepositoryImpl::new(pool.clone());
    let input = CreateRoleInput {
        name: name.to_string(),
        description: None,
    };
    repo.create(&input, &ctx()).await.unwrap().id
}

async fn seed_permission(pool: &PgPool, code: &str) -> i32 {
    let repo = PermissionRepositoryImpl::new(pool.clone());
    let input = CreatePermissionInput {
        code: code.to_string(),
        name: code.to_string(),
        module: "administration".to_string(),
    };
    repo.create(&input, &ctx()).await.unwrap().id
}

async fn junction_permission_ids(pool: &PgPool, role_id: i32) -> Vec<i32> {
    let rows: Vec<(i32,)> = sqlx::query_as(
        "SELECT permission_id FROM role_permissions WHERE role_id = $1 ORDER BY permission_id",
    )
    .bind(role_id)
    .fetch_all(pool)
    .await
    .unwrap();
    rows.into_iter().map(|(id,)| id).collect()
}

async fn audit_count(pool: &PgPool, entity_type: &str, entity_id: &str) -> i64 {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM audit_log WHERE entity_type = $1 AND entity_id = $2")
            .bind(entity_type)
            .bind(entity_id)
            .fetch_one(pool)
            .await
            .unwrap();
    count
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres"]
async fn test_assign_permissions_replaces_the_whole_set(pool: PgPool) {
    let role_id = seed_role(&pool, "Editor").await;
    let a = seed_permission(&pool, "USER_VIEW").await;
    let b = seed_permission(&pool, "USER_UPDATE").await;
    let c = seed_permission(&pool, "USER_DELETE").await;
    let repo = RoleRepositoryImpl::new(pool.clone());

    repo.assign_permissions(role_id, &[a, b], &ctx())
        .await
        .unwrap();
    repo.assign_permissions(role_id, &[b, c], &ctx())
        .await
        .unwrap();

    let mut expected = vec![b, c];
    expected.sort_unstable();
    assert_eq!(junction_permission_ids(&pool, role_id).await, expected);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres"]
async fn test_assign_permissions_failure_rolls_back_prior_set(pool: PgPool) {
    let role_id = seed_role(&pool, "Editor").await;
    let a = seed_permission(&pool, "USER_VIEW").await;
    let b = seed_permission(&pool, "USER_UPDATE").await;
    let repo = RoleRepositoryImpl::new(pool.clone());

    repo.assign_permissions(role_id, &[a, b], &ctx())
        .await
        .unwrap();
    let audits_before = audit_count(&pool, "role_permissions", &role_id.to_string()).await;

    // 9999 violates the permissions FK mid-insert; the delete must roll back
    let result = repo.assign_permissions(role_id, &[a, 9999], &ctx()).await;
    assert!(result.is_err());

    let mut expected = vec![a, b];
    expected.sort_unstable();
    assert_eq!(junction_permission_ids(&pool, role_id).await, expected);
    assert_eq!(
        audit_count(&pool, "role_permissions", &role_id.to_string()).await,
        audits_before
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres"]
async fn test_assign_permissions_writes_audit_entry_on_commit(pool: PgPool) {
    let role_id = seed_role(&pool, "Editor").await;
    let a = seed_permission(&pool, "USER_VIEW").await;
    let repo = RoleRepositoryImpl::new(pool.clone());

    repo.assign_permissions(role_id, &[a], &ctx()).await.unwrap();

    assert_eq!(
        audit_count(&pool, "role_permissions", &role_id.to_string()).await,
        1
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres"]
async fn test_remove_permissions_deletes_only_named_rows(pool: PgPool) {
    let role_id = seed_role(&pool, "Editor").await;
    let a = seed_permission(&pool, "USER_VIEW").await;
    let b = seed_permission(&pool, "USER_UPDATE").await;
    let repo = RoleRepositoryImpl::new(pool.clone());

    repo.assign_permissions(role_id, &[a, b], &ctx())
        .await
        .unwrap();
    repo.remove_permissions(role_id, &[a], &ctx()).await.unwrap();

    assert_eq!(junction_permission_ids(&pool, role_id).await, vec![b]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres"]
async fn test_role_create_writes_audit_entry(pool: PgPool) {
    let role_id = seed_role(&pool, "Auditor").await;
    assert_eq!(audit_count(&pool, "role", &role_id.to_string()).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres"]
async fn test_menu_update_rejects_descendant_as_parent(pool: PgPool) {
    let repo = MenuRepositoryImpl::new(pool.clone());
    let make = |name: &str, parent_id: Option<i32>| CreateMenuInput {
        name: name.to_string(),
        url: format!("/{}", name),
        icon: "dot".to_string(),
        parent_id,
    };

    let root = repo.create(&make("root", None), &ctx()).await.unwrap();
    let child = repo
        .create(&make("child", Some(root.id)), &ctx())
        .await
        .unwrap();
    let grandchild = repo
        .create(&make("grandchild", Some(child.id)), &ctx())
        .await
        .unwrap();

    // Reparenting the root under its own grandchild would close a cycle
    let input = UpdateMenuInput {
        name: root.name.clone(),
        url: root.url.clone(),
        icon: root.icon.clone(),
        parent_id: Some(grandchild.id),
    };
    let err = repo.update(root.id, &input, &ctx()).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // The stored row is untouched
    let stored = repo.find_by_id(root.id, 1).await.unwrap().unwrap();
    assert_eq!(stored.parent_id, None);
}

// AssignmentInput is the service-level shape feeding these repo calls;
// keep its deserialization honest for the empty-clear case.
#[test]
fn test_assignment_input_accepts_empty_ids() {
    let input: AssignmentInput = serde_json::from_str(r#"{"ids": []}"#).unwrap();
    assert!(input.ids.is_empty());
}
