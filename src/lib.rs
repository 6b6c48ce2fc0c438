//! Vomo Core - Multi-tenant RBAC service backend
//!
//! Token issuance and validation, tenant resolution, permission enforcement,
//! navigation menu trees, role/permission/menu assignment and an audit trail,
//! exposed over a REST API.

pub mod api;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod repository;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
