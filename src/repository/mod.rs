//! Data access layer (Repository pattern)

pub mod audit;
pub mod menu;
pub mod permission;
pub mod role;
pub mod user;

pub use audit::AuditRepository;
pub use menu::MenuRepository;
pub use permission::PermissionRepository;
pub use role::RoleRepository;
pub use user::UserRepository;

use sqlx::PgPool;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    pool: PgPool,
}

impl DbPool {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn inner(&self) -> &PgPool {
        &self.pool
    }
}

impl std::ops::Deref for DbPool {
    type Target = PgPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}
