//! Menu business logic and navigation tree assembly

use crate::domain::{CreateMenuInput, Menu, MenuNode, TenantContext, UpdateMenuInput};
use crate::error::{AppError, Result};
use crate::repository::MenuRepository;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Assemble a navigation tree from flat menu rows.
///
/// Rows whose `parent_id` is absent, or points at an id not in the input,
/// become roots. Sibling order follows input order, so callers that want a
/// stable tree pass rows in a stable order. Every input row appears in the
/// output exactly once; rows trapped in a parent cycle are promoted to roots
/// rather than dropped.
pub fn build_menu_tree(menus: Vec<Menu>) -> Vec<MenuNode> {
    let ids: HashSet<i32> = menus.iter().map(|m| m.id).collect();

    // Bucket rows under their effective parent
    let mut buckets: HashMap<Option<i32>, Vec<Menu>> = HashMap::new();
    for menu in menus {
        let parent = match menu.parent_id {
            Some(p) if p != menu.id && ids.contains(&p) => Some(p),
            _ => None,
        };
        buckets.entry(parent).or_default().push(menu);
    }

    fn collect(parent: Option<i32>, buckets: &mut HashMap<Option<i32>, Vec<Menu>>) -> Vec<MenuNode> {
        let Some(rows) = buckets.remove(&parent) else {
            return Vec::new();
        };
        rows.into_iter()
            .map(|row| {
                let id = row.id;
                let mut node = MenuNode::from(row);
                node.children = collect(Some(id), buckets);
                node
            })
            .collect()
    }

    let mut roots = collect(None, &mut buckets);

    // Cycle members never hang off a root; surface them instead of losing them
    while !buckets.is_empty() {
        let mut stranded: Vec<i32> = buckets.keys().filter_map(|k| *k).collect();
        stranded.sort_unstable();
        let parent = stranded[0];
        let Some(rows) = buckets.remove(&Some(parent)) else {
            break;
        };
        for row in rows {
            let id = row.id;
            let mut node = MenuNode::from(row);
            node.children = collect(Some(id), &mut buckets);
            roots.push(node);
        }
    }

    roots
}

pub struct MenuService<M: MenuRepository> {
    repo: Arc<M>,
}

impl<M: MenuRepository> MenuService<M> {
    pub fn new(repo: Arc<M>) -> Self {
        Self { repo }
    }

    pub async fn create_menu(&self, input: CreateMenuInput, ctx: &TenantContext) -> Result<Menu> {
        input.validate()?;
        self.repo.create(&input, ctx).await
    }

    pub async fn get_menu(&self, id: i32, tenant_id: i32) -> Result<Menu> {
        self.repo
            .find_by_id(id, tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Menu {} not found", id)))
    }

    pub async fn list_menus(&self, tenant_id: i32) -> Result<Vec<Menu>> {
        self.repo.find_all(tenant_id).await
    }

    pub async fn update_menu(
        &self,
        id: i32,
        input: UpdateMenuInput,
        ctx: &TenantContext,
    ) -> Result<Menu> {
        input.validate()?;
        self.repo.update(id, &input, ctx).await
    }

    pub async fn delete_menu(&self, id: i32, ctx: &TenantContext) -> Result<()> {
        self.repo.delete(id, ctx).await
    }

    /// Full navigation tree for a tenant
    pub async fn menu_tree(&self, tenant_id: i32) -> Result<Vec<MenuNode>> {
        let menus = self.repo.find_all(tenant_id).await?;
        Ok(build_menu_tree(menus))
    }

    /// Navigation tree restricted to the menus a role can see
    pub async fn role_menu_tree(&self, role_id: i32, tenant_id: i32) -> Result<Vec<MenuNode>> {
        let menus = self.repo.find_by_role(role_id, tenant_id).await?;
        Ok(build_menu_tree(menus))
    }

    /// Navigation tree restricted to the menus a user's role can see
    pub async fn user_menu_tree(&self, user_id: Uuid, tenant_id: i32) -> Result<Vec<MenuNode>> {
        let menus = self.repo.find_by_user(user_id, tenant_id).await?;
        Ok(build_menu_tree(menus))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::menu::MockMenuRepository;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn menu(id: i32, parent_id: Option<i32>) -> Menu {
        let now = Utc::now();
        Menu {
            id,
            name: format!("menu-{}", id),
            url: format!("/menu/{}", id),
            icon: "dot".to_string(),
            parent_id,
            tenant_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_input_builds_empty_tree() {
        assert!(build_menu_tree(Vec::new()).is_empty());
    }

    #[test]
    fn test_flat_rows_become_roots_in_order() {
        let tree = build_menu_tree(vec![menu(1, None), menu(2, None), menu(3, None)]);
        let ids: Vec<i32> = tree.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(tree.iter().all(|n| n.children.is_empty()));
    }

    #[test]
    fn test_children_nest_under_parent() {
        let tree = build_menu_tree(vec![
            menu(1, None),
            menu(2, Some(1)),
            menu(3, Some(1)),
            menu(4, Some(2)),
        ]);

        assert_eq!(tree.len(), 1);
        let root = &tree[0];
        assert_eq!(root.id, 1);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].id, 2);
        assert_eq!(root.children[1].id, 3);
        assert_eq!(root.children[0].children[0].id, 4);
    }

    #[test]
    fn test_orphan_is_promoted_to_root() {
        let tree = build_menu_tree(vec![menu(1, None), menu(2, Some(1)), menu(3, Some(99))]);

        let root_ids: Vec<i32> = tree.iter().map(|n| n.id).collect();
        assert_eq!(root_ids, vec![1, 3]);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].id, 2);
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn test_self_parent_is_promoted_to_root() {
        let tree = build_menu_tree(vec![menu(7, Some(7))]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, 7);
    }

    #[test]
    fn test_cycle_members_are_not_dropped() {
        // 2 -> 3 -> 2 is unreachable from any root
        let tree = build_menu_tree(vec![menu(1, None), menu(2, Some(3)), menu(3, Some(2))]);

        let mut all_ids = Vec::new();
        fn walk(nodes: &[MenuNode], out: &mut Vec<i32>) {
            for node in nodes {
                out.push(node.id);
                walk(&node.children, out);
            }
        }
        walk(&tree, &mut all_ids);
        all_ids.sort_unstable();
        assert_eq!(all_ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_every_row_appears_exactly_once() {
        let tree = build_menu_tree(vec![
            menu(1, None),
            menu(2, Some(1)),
            menu(3, Some(2)),
            menu(4, None),
            menu(5, Some(4)),
        ]);

        let mut count = 0;
        fn walk(nodes: &[MenuNode], count: &mut usize) {
            for node in nodes {
                *count += 1;
                walk(&node.children, count);
            }
        }
        walk(&tree, &mut count);
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn test_user_menu_tree_uses_role_scoped_rows() {
        let user_id = Uuid::new_v4();
        let mut repo = MockMenuRepository::new();
        repo.expect_find_by_user()
            .withf(move |uid, tenant_id| *uid == user_id && *tenant_id == 1)
            .returning(|_, _| Ok(vec![menu_row(1, None), menu_row(2, Some(1))]));

        fn menu_row(id: i32, parent_id: Option<i32>) -> Menu {
            let now = Utc::now();
            Menu {
                id,
                name: format!("menu-{}", id),
                url: format!("/menu/{}", id),
                icon: "dot".to_string(),
                parent_id,
                tenant_id: 1,
                created_at: now,
                updated_at: now,
            }
        }

        let service = MenuService::new(Arc::new(repo));
        let tree = service.user_menu_tree(user_id, 1).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children.len(), 1);
    }

    #[tokio::test]
    async fn test_get_menu_not_found() {
        let mut repo = MockMenuRepository::new();
        repo.expect_find_by_id().returning(|_, _| Ok(None));

        let service = MenuService::new(Arc::new(repo));
        let err = service.get_menu(9, 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
