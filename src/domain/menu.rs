//! Menu domain model and navigation tree

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Menu entity, tenant-scoped.
///
/// `parent_id` forms a tree per tenant; a parent must belong to the same
/// tenant. Rows are flat in storage, the hierarchy is derived at read time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Menu {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub icon: String,
    pub parent_id: Option<i32>,
    pub tenant_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A node of the navigation tree built from flat menu rows.
///
/// Transient and request-scoped, never persisted. `children` is always
/// serialized, as an empty array when the node is a leaf.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MenuNode {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub icon: String,
    pub parent_id: Option<i32>,
    pub children: Vec<MenuNode>,
}

impl From<Menu> for MenuNode {
    fn from(menu: Menu) -> Self {
        Self {
            id: menu.id,
            name: menu.name,
            url: menu.url,
            icon: menu.icon,
            parent_id: menu.parent_id,
            children: Vec::new(),
        }
    }
}

/// Input for creating a menu
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMenuInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 255))]
    pub url: String,
    #[validate(length(max = 50))]
    pub icon: String,
    pub parent_id: Option<i32>,
}

/// Input for updating a menu
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateMenuInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 255))]
    pub url: String,
    #[validate(length(max = 50))]
    pub icon: String,
    pub parent_id: Option<i32>,
}
