//! Registration, login and bearer-token handling over HTTP.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::{StatusCode, header};
use serde_json::json;

use bazaar_integration_tests::TestApp;

#[tokio::test]
async fn test_register_login_scenario() {
    let app = TestApp::new().await;

    let register = app
        .post(
            "/api/auth/register",
            None,
            json!({"name": "A", "email": "a@x.com", "password": "secret1"}),
        )
        .await;
    // One-character names are rejected.
    assert_eq!(register.status, StatusCode::BAD_REQUEST);

    let register = app
        .post(
            "/api/auth/register",
            None,
            json!({"name": "Ann", "email": "a@x.com", "password": "secret1"}),
        )
        .await;
    assert_eq!(register.status, StatusCode::OK);
    assert_eq!(register.body["user"]["email"], "a@x.com");
    assert_eq!(register.body["user"]["role"], "customer");
    assert!(register.body["user"].get("password_hash").is_none());

    let duplicate = app
        .post(
            "/api/auth/register",
            None,
            json!({"name": "Ann", "email": "a@x.com", "password": "secret1"}),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.detail(), Some("User with this email already exists"));

    let wrong = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "a@x.com", "password": "wrong"}),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.detail(), Some("Incorrect email or password"));

    let login = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "a@x.com", "password": "secret1"}),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let token = login.body["token"].as_str().unwrap();

    let me = app.get("/api/auth/me", Some(token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["id"], register.body["user"]["id"]);
    assert_eq!(me.body["name"], "Ann");
}

#[tokio::test]
async fn test_unknown_email_is_indistinguishable_from_wrong_password() {
    let app = TestApp::new().await;
    app.register("Ann", "a@x.com").await;

    let unknown = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "nobody@x.com", "password": "secret1"}),
        )
        .await;
    let wrong = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "a@x.com", "password": "secret2"}),
        )
        .await;

    assert_eq!(unknown.status, wrong.status);
    assert_eq!(unknown.body, wrong.body);
}

#[tokio::test]
async fn test_protected_routes_require_a_valid_token() {
    let app = TestApp::new().await;
    let token = app.register("Ann", "a@x.com").await;

    for uri in ["/api/auth/me", "/api/cart", "/api/orders"] {
        let missing = app.get(uri, None).await;
        assert_eq!(missing.status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(
            missing.headers.get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );

        let garbage = app.get(uri, Some("not-a-token")).await;
        assert_eq!(garbage.status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(garbage.detail(), Some("Could not validate credentials"));
    }

    let mut tampered = token.clone();
    tampered.push('x');
    let response = app.get("/api/auth/me", Some(&tampered)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_requires_auth_and_is_stateless() {
    let app = TestApp::new().await;
    let token = app.register("Ann", "a@x.com").await;

    let anonymous = app.post("/api/auth/logout", None, json!({})).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let logout = app.post("/api/auth/logout", Some(&token), json!({})).await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.body["message"], "Logged out successfully");

    // Tokens carry no server-side state, so the token still resolves.
    let me = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_body_is_a_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .post("/api/auth/register", None, json!({"email": "a@x.com"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.detail().is_some());

    let response = app
        .post(
            "/api/auth/register",
            None,
            json!({"name": "Ann", "email": "not-an-email", "password": "secret1"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.detail(), Some("Invalid email address"));
}
