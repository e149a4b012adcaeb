mod common;

use axum::http::StatusCode;
use common::{login, register, send, test_server, TestServer};
use serde_json::json;

async fn admin_session(ts: &TestServer) -> String {
    register(ts, "root", "root@example.com", "secret-root").await;
    login(ts, "root", "secret-root").await
}

#[tokio::test]
async fn role_crud_over_http() {
    let ts = test_server().await;
    let token = admin_session(&ts).await;

    let (status, _) = send(
        &ts.server,
        "POST",
        "/v1/role",
        Some(&token),
        Some(json!({
            "role": "ops",
            "permissions": [
                {"api": "/v1/user", "method": "GET"},
                {"api": "/v1/role", "method": "GET"}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // identical re-creation changes nothing and says so
    let (status, body) = send(
        &ts.server,
        "POST",
        "/v1/role",
        Some(&token),
        Some(json!({
            "role": "ops",
            "permissions": [{"api": "/v1/user", "method": "GET"},
                            {"api": "/v1/role", "method": "GET"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "The role already has the permission");

    let (status, body) = send(&ts.server, "GET", "/v1/role/ops", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "ops");
    assert_eq!(body["permissions"].as_array().unwrap().len(), 2);

    let (status, _) = send(&ts.server, "DELETE", "/v1/role/ops", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&ts.server, "DELETE", "/v1/role/ops", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "The role does not exist");
}

#[tokio::test]
async fn role_names_are_validated() {
    let ts = test_server().await;
    let token = admin_session(&ts).await;

    for bad in ["", "not-alphanumeric!", "averyverylongrolenameover20"] {
        let (status, _) = send(
            &ts.server,
            "POST",
            "/v1/role",
            Some(&token),
            Some(json!({
                "role": bad,
                "permissions": [{"api": "/v1/user", "method": "GET"}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted role name {bad:?}");
    }
}

#[tokio::test]
async fn role_listing_pages_over_declared_roles() {
    let ts = test_server().await;
    let token = admin_session(&ts).await;

    // the two seeded groups plus twenty more
    for i in 0..20 {
        let (status, _) = send(
            &ts.server,
            "POST",
            "/v1/role",
            Some(&token),
            Some(json!({
                "role": format!("team{i:02}"),
                "permissions": [{"api": "/v1/user", "method": "GET"}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &ts.server,
        "GET",
        "/v1/role?page=1&page_size=16",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 22);
    assert_eq!(body["roles"].as_array().unwrap().len(), 16);

    let (_, body) = send(
        &ts.server,
        "GET",
        "/v1/role?page=2&page_size=16",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["total_count"], 22);
    assert_eq!(body["roles"].as_array().unwrap().len(), 6);

    // the identity-named private roles of registered users never appear
    for role in body["roles"].as_array().unwrap() {
        assert!(uuid::Uuid::parse_str(role["name"].as_str().unwrap()).is_err());
    }
}

#[tokio::test]
async fn role_assignment_over_http() {
    let ts = test_server().await;
    let token = admin_session(&ts).await;

    let (status, _) = send(
        &ts.server,
        "POST",
        "/v1/role",
        Some(&token),
        Some(json!({
            "role": "ops",
            "permissions": [{"api": "/v1/user", "method": "GET"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // nobody holds it yet
    let (status, _) = send(&ts.server, "GET", "/v1/role/ops/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &ts.server,
        "POST",
        "/v1/role/ops/user/bob",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ts.server.roles.has_role_for_user("bob", "ops"));

    // appending an already-held role replies OK and changes nothing
    let (status, _) = send(
        &ts.server,
        "POST",
        "/v1/role/ops/user/bob",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ts.server.roles.get_role_for_user("bob"), vec!["ops"]);

    let (status, body) = send(&ts.server, "GET", "/v1/role/ops/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["bob"]));

    let (status, _) = send(
        &ts.server,
        "DELETE",
        "/v1/role/ops/user/bob",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // removing an assignment that is not held is a 400-class signal
    let (status, body) = send(
        &ts.server,
        "DELETE",
        "/v1/role/ops/user/bob",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "The user does not have the role");
}

#[tokio::test]
async fn assigning_an_unknown_role_is_rejected() {
    let ts = test_server().await;
    let token = admin_session(&ts).await;

    let (status, body) = send(
        &ts.server,
        "POST",
        "/v1/role/ops/user/bob",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "The role does not exist");
}

#[tokio::test]
async fn rbac_endpoints_require_a_permitted_caller() {
    let ts = test_server().await;
    admin_session(&ts).await;
    register(&ts, "bob", "bob@example.com", "secret-two").await;
    let token = login(&ts, "bob", "secret-two").await;

    // unauthenticated
    let (status, _) = send(&ts.server, "GET", "/v1/role", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // authenticated but unprivileged
    let (status, _) = send(&ts.server, "GET", "/v1/role", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
