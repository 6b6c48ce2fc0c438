//! Domain models

pub mod audit;
pub mod common;
pub mod menu;
pub mod rbac;
pub mod user;

pub use audit::*;
pub use common::*;
pub use menu::*;
pub use rbac::*;
pub use user::*;
