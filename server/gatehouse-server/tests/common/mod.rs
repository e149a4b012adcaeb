#![allow(dead_code)]

use auth_policy::{Enforcer, MemoryPolicyStore, Permission, PolicyStore, RoleManager, StaticGroup};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use cache_store::MemoryCodeCache;
use email_service::MemoryMailer;
use gatehouse_server::config::GatehouseConfig;
use gatehouse_server::db::MemoryAccountRepository;
use gatehouse_server::server::GatehouseServer;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub struct TestServer {
    pub server: GatehouseServer,
    pub mailer: Arc<MemoryMailer>,
}

fn perm(api: &str, method: &str) -> Permission {
    Permission::new(api, method)
}

/// Declared role groups for tests. Permission matching is exact-string,
/// so protected endpoints with parameterized paths are granted with the
/// literal paths the tests will actually hit.
pub fn test_groups() -> Vec<StaticGroup> {
    vec![
        StaticGroup {
            name: "admin".to_string(),
            apis: vec![
                perm("/v1/role", "POST"),
                perm("/v1/role", "GET"),
                perm("/v1/role/ops", "GET"),
                perm("/v1/role/ops", "DELETE"),
                perm("/v1/role/ops/user", "GET"),
                perm("/v1/role/ops/user/bob", "POST"),
                perm("/v1/role/ops/user/bob", "DELETE"),
                perm("/v1/user", "GET"),
                perm("/v1/current_user", "GET"),
            ],
            idapis: Vec::new(),
        },
        StaticGroup {
            name: "user".to_string(),
            apis: vec![perm("/v1/current_user", "GET")],
            idapis: vec![perm("/v1/user/:id", "GET"), perm("/v1/user/:id", "PUT")],
        },
    ]
}

pub fn test_config() -> GatehouseConfig {
    let mut config = GatehouseConfig::default();
    config.auth.secret_key = "test-secret".to_string();
    config.rbac.roles = test_groups();
    config
}

/// Assemble a server over in-memory backends and a capturing mailer.
pub async fn test_server() -> TestServer {
    let config = test_config();

    let repo = Arc::new(MemoryAccountRepository::new());
    let enforcer = Arc::new(
        Enforcer::new(PolicyStore::Memory(MemoryPolicyStore::new()))
            .await
            .expect("enforcer"),
    );
    let roles = RoleManager::new(enforcer);
    roles
        .apply_static_policy(&config.rbac.roles)
        .await
        .expect("seed roles");

    let mailer = Arc::new(MemoryMailer::new());
    let server = GatehouseServer::new(
        config,
        repo.clone(),
        repo,
        roles,
        Arc::new(MemoryCodeCache::new()),
        mailer.clone(),
    );
    TestServer { server, mailer }
}

/// Drive one request through the router and decode the JSON body.
pub async fn send(
    server: &GatehouseServer,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = server.router().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Walk the register-code + register flow; returns the new user id.
pub async fn register(ts: &TestServer, username: &str, email: &str, password: &str) -> String {
    let (status, _) = send(
        &ts.server,
        "POST",
        "/v1/user/register_code",
        None,
        Some(json!({ "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let code = ts
        .mailer
        .last()
        .expect("register code email")
        .context["code"]
        .as_str()
        .expect("code")
        .to_string();

    let (status, body) = send(
        &ts.server,
        "POST",
        "/v1/user",
        None,
        Some(json!({
            "username": username,
            "password": password,
            "confirm_password": password,
            "email": email,
            "register_code": code,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    body["id"].as_str().expect("user id").to_string()
}

pub async fn login(ts: &TestServer, username: &str, password: &str) -> String {
    let (status, body) = send(
        &ts.server,
        "POST",
        "/v1/session",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().expect("token").to_string()
}
