mod common;

use axum::http::StatusCode;
use common::{login, register, send, test_server};
use serde_json::json;

#[tokio::test]
async fn first_user_is_admin_later_users_are_not() {
    let ts = test_server().await;

    let first = register(&ts, "alice", "alice@example.com", "secret-one").await;
    assert_eq!(ts.server.roles.get_role_for_user(&first), vec!["admin"]);

    let second = register(&ts, "bob", "bob@example.com", "secret-two").await;
    assert_eq!(ts.server.roles.get_role_for_user(&second), vec!["user"]);

    // the private identity role carries the identity-scoped permissions,
    // authored with the literal parameterized path
    assert!(ts
        .server
        .roles
        .validate(&second, &auth_policy::Permission::new("/v1/user/:id", "GET")));
    // ...which, with exact-string matching, does not authorize the
    // resolved path
    assert!(!ts.server.roles.validate(
        &second,
        &auth_policy::Permission::new(&format!("/v1/user/{second}"), "GET")
    ));
}

#[tokio::test]
async fn register_code_is_consumed_once() {
    let ts = test_server().await;
    register(&ts, "alice", "alice@example.com", "secret-one").await;

    let code = ts.mailer.last().unwrap().context["code"]
        .as_str()
        .unwrap()
        .to_string();

    // the code was deleted by the successful registration
    let (status, body) = send(
        &ts.server,
        "POST",
        "/v1/user",
        None,
        Some(json!({
            "username": "alice2",
            "password": "secret-one",
            "confirm_password": "secret-one",
            "email": "alice@example.com",
            "register_code": code,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Register code is invalid");
}

#[tokio::test]
async fn register_code_rejects_known_email() {
    let ts = test_server().await;
    register(&ts, "alice", "alice@example.com", "secret-one").await;

    let (status, body) = send(
        &ts.server,
        "POST",
        "/v1/user/register_code",
        None,
        Some(json!({ "email": "alice@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "The email already exists");
}

#[tokio::test]
async fn register_validates_the_form() {
    let ts = test_server().await;

    // mismatched confirmation
    let (_, _) = send(
        &ts.server,
        "POST",
        "/v1/user/register_code",
        None,
        Some(json!({ "email": "carol@example.com" })),
    )
    .await;
    let code = ts.mailer.last().unwrap().context["code"]
        .as_str()
        .unwrap()
        .to_string();
    let (status, body) = send(
        &ts.server,
        "POST",
        "/v1/user",
        None,
        Some(json!({
            "username": "carol",
            "password": "one",
            "confirm_password": "two",
            "email": "carol@example.com",
            "register_code": code,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Password and confirm password does not match");

    // malformed code shape never reaches the cache
    let (status, _) = send(
        &ts.server,
        "POST",
        "/v1/user",
        None,
        Some(json!({
            "username": "carol",
            "password": "one",
            "confirm_password": "one",
            "email": "carol@example.com",
            "register_code": "abc",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_and_authenticated_request() {
    let ts = test_server().await;
    register(&ts, "alice", "alice@example.com", "secret-one").await;

    let token = login(&ts, "alice", "secret-one").await;
    let (status, _) = send(&ts.server, "GET", "/v1/current_user", Some(&token), None).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);

    // email works as the login name too
    let token = login(&ts, "alice@example.com", "secret-one").await;
    let (status, _) = send(&ts.server, "GET", "/v1/current_user", Some(&token), None).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);

    // bad credentials are a 401 and never say which field was wrong
    let (status, body) = send(
        &ts.server,
        "POST",
        "/v1/session",
        None,
        Some(json!({ "username": "alice", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authentication failed");
}

#[tokio::test]
async fn missing_token_is_401_missing_permission_is_403() {
    let ts = test_server().await;
    register(&ts, "alice", "alice@example.com", "secret-one").await;
    let bob = register(&ts, "bob", "bob@example.com", "secret-two").await;

    // no token at all
    let (status, _) = send(&ts.server, "GET", "/v1/user", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // bob is authenticated but his role does not cover /v1/user
    let token = login(&ts, "bob", "secret-two").await;
    let (status, _) = send(&ts.server, "GET", "/v1/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // revoking bob's only role flips his allowed endpoint from 200-class
    // to 403 while the token is still cryptographically valid
    let (status, _) = send(&ts.server, "GET", "/v1/current_user", Some(&token), None).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    ts.server.roles.del_role_for_user(&bob, "user").await.unwrap();
    let (status, _) = send(&ts.server, "GET", "/v1/current_user", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn refresh_issues_a_working_token() {
    let ts = test_server().await;
    register(&ts, "alice", "alice@example.com", "secret-one").await;
    let token = login(&ts, "alice", "secret-one").await;

    let (status, body) = send(
        &ts.server,
        "GET",
        "/v1/session/refresh_token",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let refreshed = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(&ts.server, "GET", "/v1/current_user", Some(&refreshed), None).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);

    // refresh without a token is an authentication failure
    let (status, _) = send(&ts.server, "GET", "/v1/session/refresh_token", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_reset_with_code_is_single_use() {
    let ts = test_server().await;
    let id = register(&ts, "alice", "alice@example.com", "secret-one").await;

    let (status, body) = send(
        &ts.server,
        "POST",
        "/v1/user/password/reset_code",
        None,
        Some(json!({ "email": "alice@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());

    let code = ts.mailer.last().unwrap().context["code"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, _) = send(
        &ts.server,
        "PUT",
        &format!("/v1/user/{id}/password"),
        None,
        Some(json!({
            "reset_code": code,
            "new_password": "secret-two",
            "confirm_password": "secret-two",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // new password works, old one does not
    login(&ts, "alice", "secret-two").await;
    let (status, _) = send(
        &ts.server,
        "POST",
        "/v1/session",
        None,
        Some(json!({ "username": "alice", "password": "secret-one" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // the code was consumed
    let (status, body) = send(
        &ts.server,
        "PUT",
        &format!("/v1/user/{id}/password"),
        None,
        Some(json!({
            "reset_code": code,
            "new_password": "secret-three",
            "confirm_password": "secret-three",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Reset code is invalid");
}

#[tokio::test]
async fn password_reset_with_old_password() {
    let ts = test_server().await;
    let id = register(&ts, "alice", "alice@example.com", "secret-one").await;

    let (status, _) = send(
        &ts.server,
        "PUT",
        &format!("/v1/user/{id}/password"),
        None,
        Some(json!({
            "old_password": "secret-one",
            "new_password": "secret-two",
            "confirm_password": "secret-two",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    login(&ts, "alice", "secret-two").await;

    let (status, body) = send(
        &ts.server,
        "PUT",
        &format!("/v1/user/{id}/password"),
        None,
        Some(json!({
            "old_password": "wrong",
            "new_password": "secret-three",
            "confirm_password": "secret-three",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Old password incorrect");
}

#[tokio::test]
async fn reset_code_for_unknown_email_is_404() {
    let ts = test_server().await;
    let (status, _) = send(
        &ts.server,
        "POST",
        "/v1/user/password/reset_code",
        None,
        Some(json!({ "email": "ghost@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_listing_pages_and_attaches_roles() {
    let ts = test_server().await;
    register(&ts, "alice", "alice@example.com", "secret-one").await;
    register(&ts, "bob", "bob@example.com", "secret-two").await;
    register(&ts, "carol", "carol@example.com", "secret-three").await;

    let token = login(&ts, "alice", "secret-one").await;
    let (status, body) = send(
        &ts.server,
        "GET",
        "/v1/user?page=1&page_size=2",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page_count"], 2);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
    assert_eq!(body["users"][0]["roles"], "admin");
    // password hashes never serialize
    assert!(body["users"][0].get("password_hash").is_none());

    let (_, body) = send(
        &ts.server,
        "GET",
        "/v1/user?page=2&page_size=2",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["users"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn public_user_lookup_carries_roles() {
    let ts = test_server().await;
    let id = register(&ts, "alice", "alice@example.com", "secret-one").await;

    let (status, body) = send(&ts.server, "GET", &format!("/v1/user/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["roles"], "admin");

    let (status, _) = send(&ts.server, "GET", "/v1/user/unknown", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleted_user_loses_access_immediately() {
    let ts = test_server().await;
    let alice = register(&ts, "alice", "alice@example.com", "secret-one").await;
    let bob = register(&ts, "bob", "bob@example.com", "secret-two").await;
    let token = login(&ts, "bob", "secret-two").await;

    let (status, _) = send(&ts.server, "GET", "/v1/current_user", Some(&token), None).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);

    // exact-string matching means a delete permission must be granted for
    // the literal resolved path
    let admin_token = login(&ts, "alice", "secret-one").await;
    let cleanup = auth_policy::Role::new("cleanup")
        .with_permission(auth_policy::Permission::new(&format!("/v1/user/{bob}"), "DELETE"));
    ts.server.roles.create_role(&cleanup).await.unwrap();
    ts.server
        .roles
        .add_role_for_user(&alice, "cleanup")
        .await
        .unwrap();

    let (status, body) = send(
        &ts.server,
        "DELETE",
        &format!("/v1/user/{bob}"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], bob.as_str());

    // bob's token is still signed and unexpired, but his subject is gone:
    // authentication fails, not a server error
    let (status, _) = send(&ts.server, "GET", "/v1/current_user", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
