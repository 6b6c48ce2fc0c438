//! Business logic layer

pub mod auth;
pub mod menu;
pub mod rbac;
pub mod user;

pub use auth::AuthService;
pub use menu::{build_menu_tree, MenuService};
pub use rbac::RbacService;
pub use user::UserService;
