use crate::handlers::{account, health, rbac, session};
use crate::server::GatehouseServer;
use axum::routing::{delete, get, post, put};
use axum::Router;

/// Route path constants, kept in one place so policy permission lists can
/// reference the same literals.
pub mod paths {
    pub const HEALTH: &str = "/health";

    pub const SESSION: &str = "/v1/session";
    pub const SESSION_REFRESH: &str = "/v1/session/refresh_token";

    pub const USER: &str = "/v1/user";
    pub const USER_BY_ID: &str = "/v1/user/:id";
    pub const USER_REGISTER_CODE: &str = "/v1/user/register_code";
    pub const USER_PASSWORD: &str = "/v1/user/:id/password";
    pub const USER_PASSWORD_RESET_CODE: &str = "/v1/user/password/reset_code";
    pub const USER_PROFILE: &str = "/v1/user/:id/profile";
    pub const CURRENT_USER: &str = "/v1/current_user";

    pub const ROLE: &str = "/v1/role";
    pub const ROLE_BY_NAME: &str = "/v1/role/:name";
    pub const ROLE_USERS: &str = "/v1/role/:name/user";
    pub const ROLE_USER_BY_ID: &str = "/v1/role/:name/user/:id";
}

pub fn health_routes() -> Router<GatehouseServer> {
    Router::new().route(paths::HEALTH, get(health::health_check))
}

pub fn session_routes() -> Router<GatehouseServer> {
    Router::new()
        .route(paths::SESSION, post(session::login))
        .route(paths::SESSION, delete(session::logout))
        .route(paths::SESSION_REFRESH, get(session::refresh))
}

pub fn account_routes() -> Router<GatehouseServer> {
    Router::new()
        // open endpoints: registration and password recovery
        .route(paths::USER_REGISTER_CODE, post(account::create_register_code))
        .route(paths::USER, post(account::register_user))
        .route(paths::USER_PASSWORD_RESET_CODE, post(account::create_password_reset_code))
        .route(paths::USER_PASSWORD, put(account::reset_password))
        .route(paths::USER_BY_ID, get(account::get_user_by_id))
        // gated endpoints: handlers take `CurrentUser`
        .route(paths::CURRENT_USER, get(account::current_user))
        .route(paths::USER_PROFILE, put(account::update_profile))
        .route(paths::USER_BY_ID, delete(account::delete_user))
        .route(paths::USER, get(account::list_user))
}

pub fn rbac_routes() -> Router<GatehouseServer> {
    Router::new()
        .route(paths::ROLE, post(rbac::create_role))
        .route(paths::ROLE, get(rbac::list_role))
        .route(paths::ROLE_BY_NAME, delete(rbac::delete_role))
        .route(paths::ROLE_BY_NAME, get(rbac::get_role_by_name))
        .route(paths::ROLE_USERS, get(rbac::get_user_for_role))
        .route(paths::ROLE_USER_BY_ID, post(rbac::append_role_for_user))
        .route(paths::ROLE_USER_BY_ID, delete(rbac::delete_role_for_user))
}
