//! HTTP server setup and routing

use crate::api;
use crate::config::Config;
use crate::domain::rbac::codes;
use crate::jwt::JwtManager;
use crate::middleware::{authenticate, bind_tenant, require_permission, AuthState};
use crate::repository::{
    audit::AuditRepositoryImpl, menu::MenuRepositoryImpl, permission::PermissionRepositoryImpl,
    role::RoleRepositoryImpl, user::UserRepositoryImpl, DbPool,
};
use crate::service::{AuthService, MenuService, RbacService, UserService};
use anyhow::Result;
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: DbPool,
    pub jwt_manager: Arc<JwtManager>,
    pub user_repo: Arc<UserRepositoryImpl>,
    pub auth_service: Arc<AuthService<UserRepositoryImpl, MenuRepositoryImpl>>,
    pub user_service: Arc<UserService<UserRepositoryImpl>>,
    pub rbac_service: Arc<RbacService<RoleRepositoryImpl, PermissionRepositoryImpl>>,
    pub menu_service: Arc<MenuService<MenuRepositoryImpl>>,
    pub audit_repo: Arc<AuditRepositoryImpl>,
}

impl AppState {
    pub fn new(config: Config, pool: sqlx::PgPool) -> Self {
        let user_repo = Arc::new(UserRepositoryImpl::new(pool.clone()));
        let role_repo = Arc::new(RoleRepositoryImpl::new(pool.clone()));
        let permission_repo = Arc::new(PermissionRepositoryImpl::new(pool.clone()));
        let menu_repo = Arc::new(MenuRepositoryImpl::new(pool.clone()));
        let audit_repo = Arc::new(AuditRepositoryImpl::new(pool.clone()));

        let jwt_manager = Arc::new(JwtManager::new(config.jwt.clone()));

        let auth_service = Arc::new(AuthService::new(
            user_repo.clone(),
            menu_repo.clone(),
            jwt_manager.clone(),
        ));
        let user_service = Arc::new(UserService::new(user_repo.clone()));
        let rbac_service = Arc::new(RbacService::new(role_repo, permission_repo));
        let menu_service = Arc::new(MenuService::new(menu_repo));

        Self {
            config: Arc::new(config),
            db: DbPool::new(pool),
            jwt_manager,
            user_repo,
            auth_service,
            user_service,
            rbac_service,
            menu_service,
            audit_repo,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_state = AuthState::new(state.jwt_manager.clone(), state.user_repo.clone());

    // Routes reachable without a token
    let public = Router::new()
        .route("/health", get(api::health::health))
        .route("/api/v1/auth/login", post(api::auth::login))
        .route("/api/v1/auth/refresh", post(api::auth::refresh));

    // Everything below requires a valid access token and a resolved tenant
    let protected = Router::new()
        .route("/api/v1/auth/me", get(api::auth::me))
        .route("/api/v1/menus/my-tree", get(api::menu::my_menu_tree))
        // User endpoints
        .route(
            "/api/v1/users",
            get(api::user::list_users).route_layer(middleware::from_fn_with_state(codes::USER_VIEW, require_permission)),
        )
        .route(
            "/api/v1/users",
            post(api::user::create_user).route_layer(middleware::from_fn_with_state(codes::USER_CREATE, require_permission)),
        )
        .route(
            "/api/v1/users/{id}",
            get(api::user::get_user).route_layer(middleware::from_fn_with_state(codes::USER_VIEW, require_permission)),
        )
        .route(
            "/api/v1/users/{id}",
            put(api::user::update_user).route_layer(middleware::from_fn_with_state(codes::USER_UPDATE, require_permission)),
        )
        .route(
            "/api/v1/users/{id}",
            delete(api::user::delete_user).route_layer(middleware::from_fn_with_state(codes::USER_DELETE, require_permission)),
        )
        .route(
            "/api/v1/users/{id}/password",
            put(api::user::change_password).route_layer(middleware::from_fn_with_state(codes::USER_UPDATE, require_permission)),
        )
        .route(
            "/api/v1/users/{id}/role",
            put(api::user::assign_role).route_layer(middleware::from_fn_with_state(codes::USER_UPDATE, require_permission)),
        )
        // Role endpoints
        .route(
            "/api/v1/roles",
            get(api::role::list_roles).route_layer(middleware::from_fn_with_state(codes::ROLE_VIEW, require_permission)),
        )
        .route(
            "/api/v1/roles",
            post(api::role::create_role).route_layer(middleware::from_fn_with_state(codes::ROLE_CREATE, require_permission)),
        )
        .route(
            "/api/v1/roles/{id}",
            get(api::role::get_role).route_layer(middleware::from_fn_with_state(codes::ROLE_VIEW, require_permission)),
        )
        .route(
            "/api/v1/roles/{id}",
            put(api::role::update_role).route_layer(middleware::from_fn_with_state(codes::ROLE_UPDATE, require_permission)),
        )
        .route(
            "/api/v1/roles/{id}",
            delete(api::role::delete_role).route_layer(middleware::from_fn_with_state(codes::ROLE_DELETE, require_permission)),
        )
        .route(
            "/api/v1/roles/{id}/permissions",
            get(api::role::role_permissions).route_layer(middleware::from_fn_with_state(codes::ROLE_VIEW, require_permission)),
        )
        .route(
            "/api/v1/roles/{id}/permissions",
            put(api::role::assign_permissions).route_layer(middleware::from_fn_with_state(codes::ROLE_UPDATE, require_permission)),
        )
        .route(
            "/api/v1/roles/{id}/permissions",
            delete(api::role::remove_permissions).route_layer(middleware::from_fn_with_state(codes::ROLE_UPDATE, require_permission)),
        )
        .route(
            "/api/v1/roles/{id}/menus",
            get(api::role::role_menus).route_layer(middleware::from_fn_with_state(codes::ROLE_VIEW, require_permission)),
        )
        .route(
            "/api/v1/roles/{id}/menus",
            put(api::role::assign_menus).route_layer(middleware::from_fn_with_state(codes::ROLE_UPDATE, require_permission)),
        )
        .route(
            "/api/v1/roles/{id}/menus",
            delete(api::role::remove_menus).route_layer(middleware::from_fn_with_state(codes::ROLE_UPDATE, require_permission)),
        )
        // Permission endpoints
        .route(
            "/api/v1/permissions",
            get(api::permission::list_permissions).route_layer(middleware::from_fn_with_state(codes::PERMISSION_VIEW, require_permission)),
        )
        .route(
            "/api/v1/permissions",
            post(api::permission::create_permission)
                .route_layer(middleware::from_fn_with_state(codes::PERMISSION_CREATE, require_permission)),
        )
        .route(
            "/api/v1/permissions/{id}",
            get(api::permission::get_permission).route_layer(middleware::from_fn_with_state(codes::PERMISSION_VIEW, require_permission)),
        )
        .route(
            "/api/v1/permissions/{id}",
            put(api::permission::update_permission)
                .route_layer(middleware::from_fn_with_state(codes::PERMISSION_UPDATE, require_permission)),
        )
        .route(
            "/api/v1/permissions/{id}",
            delete(api::permission::delete_permission)
                .route_layer(middleware::from_fn_with_state(codes::PERMISSION_DELETE, require_permission)),
        )
        // Menu endpoints
        .route(
            "/api/v1/menus",
            get(api::menu::list_menus).route_layer(middleware::from_fn_with_state(codes::MENU_VIEW, require_permission)),
        )
        .route(
            "/api/v1/menus",
            post(api::menu::create_menu).route_layer(middleware::from_fn_with_state(codes::MENU_CREATE, require_permission)),
        )
        .route(
            "/api/v1/menus/tree",
            get(api::menu::menu_tree).route_layer(middleware::from_fn_with_state(codes::MENU_VIEW, require_permission)),
        )
        .route(
            "/api/v1/menus/{id}",
            get(api::menu::get_menu).route_layer(middleware::from_fn_with_state(codes::MENU_VIEW, require_permission)),
        )
        .route(
            "/api/v1/menus/{id}",
            put(api::menu::update_menu).route_layer(middleware::from_fn_with_state(codes::MENU_UPDATE, require_permission)),
        )
        .route(
            "/api/v1/menus/{id}",
            delete(api::menu::delete_menu).route_layer(middleware::from_fn_with_state(codes::MENU_DELETE, require_permission)),
        )
        // Audit trail
        .route(
            "/api/v1/audit",
            get(api::audit::list_audit_entries).route_layer(middleware::from_fn_with_state(codes::AUDIT_TRAIL_VIEW, require_permission)),
        )
        .layer(middleware::from_fn(bind_tenant))
        .layer(middleware::from_fn_with_state(auth_state, authenticate));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}

pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    info!("connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("migrations applied");

    let http_addr = config.http_addr();
    let state = AppState::new(config, pool);
    let app = build_router(state);

    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
