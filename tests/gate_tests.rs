//! Tests for the authorization gate as mounted on real routes.
//!
//! `/api/v1/auth/profile` uses the required gate, `/api/v1/auth/session`
//! uses the optional one.

mod common;

use axum::http::StatusCode;
use common::{bearer, create_test_app, create_test_app_with, short_lived_config};
use modernblog::jwt::{TokenConfig, TokenManager};

#[tokio::test]
async fn test_required_gate_rejects_bad_headers() {
    let app = create_test_app().await;
    let registered = app.register("alice", "alice@example.com", "secret123").await;
    let refresh = bearer(registered["refresh_token"].as_str().unwrap());
    let access = registered["access_token"].as_str().unwrap();
    let lowercase_scheme = format!("bearer {}", access);
    let extra_part = format!("Bearer {} extra", access);

    let cases: [Option<&str>; 7] = [
        None,
        Some(""),
        Some("Token abc"),
        Some("Bearer"),
        Some(refresh.as_str()),
        Some(lowercase_scheme.as_str()),
        Some(extra_part.as_str()),
    ];

    for case in cases {
        let (status, body) = app.get_with_auth("/api/v1/auth/profile", case).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "header {case:?}");
        // Every failure looks the same to the client.
        assert_eq!(body, serde_json::json!({"error": "Unauthorized"}));
    }
}

#[tokio::test]
async fn test_required_gate_accepts_access_token() {
    let app = create_test_app().await;
    let registered = app.register("alice", "alice@example.com", "secret123").await;
    let access = bearer(registered["access_token"].as_str().unwrap());

    let (status, body) = app.get_with_auth("/api/v1/auth/profile", Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], registered["user"]["id"]);
    assert_eq!(body["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_required_gate_rejects_expired_access_token() {
    let app = create_test_app_with(short_lived_config(1, 60), 1000, 1000).await;
    let registered = app.register("alice", "alice@example.com", "secret123").await;
    let access = bearer(registered["access_token"].as_str().unwrap());

    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

    let (status, _) = app.get_with_auth("/api/v1/auth/profile", Some(&access)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The refresh token outlives the access token and yields a working one.
    let (status, body) = app
        .post_json(
            "/api/v1/auth/refresh",
            serde_json::json!({"refresh_token": registered["refresh_token"]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let renewed = bearer(body["access_token"].as_str().unwrap());
    let (status, _) = app.get_with_auth("/api/v1/auth/profile", Some(&renewed)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_required_gate_rejects_foreign_signature() {
    let app = create_test_app().await;
    let foreign = TokenManager::new(TokenConfig::new(b"some-other-service-secret".to_vec())).unwrap();
    let pair = foreign
        .issue_token_pair(uuid::Uuid::new_v4(), "mallory", "mallory@example.com")
        .unwrap();

    let (status, _) = app
        .get_with_auth("/api/v1/auth/profile", Some(&bearer(&pair.access_token)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_optional_gate_attaches_identity_for_access_token() {
    let app = create_test_app().await;
    let registered = app.register("bob", "bob@example.com", "secret123").await;
    let access = bearer(registered["access_token"].as_str().unwrap());

    let (status, body) = app.get_with_auth("/api/v1/auth/session", Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["username"], "bob");
    assert_eq!(body["user_id"], registered["user"]["id"]);
}

#[tokio::test]
async fn test_optional_gate_never_rejects() {
    let app = create_test_app().await;
    let registered = app.register("bob", "bob@example.com", "secret123").await;
    let refresh = bearer(registered["refresh_token"].as_str().unwrap());

    let cases: [Option<&str>; 6] = [
        None,
        Some(""),
        Some("Token abc"),
        Some("Bearer"),
        Some("Bearer not.a.token"),
        Some(refresh.as_str()),
    ];

    for case in cases {
        let (status, body) = app.get_with_auth("/api/v1/auth/session", case).await;
        assert_eq!(status, StatusCode::OK, "header {case:?}");
        assert_eq!(body["authenticated"], false, "header {case:?}");
        assert!(body.get("user_id").is_none());
    }
}

#[tokio::test]
async fn test_tokens_from_independent_managers_do_not_cross() {
    let first = create_test_app().await;
    let second = create_test_app_with(
        TokenConfig::new(b"second-instance-secret-with-enough-length".to_vec()),
        1000,
        1000,
    )
    .await;

    let registered = first.register("carol", "carol@example.com", "secret123").await;
    let access = bearer(registered["access_token"].as_str().unwrap());

    let (status, _) = first.get_with_auth("/api/v1/auth/session", Some(&access)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = second.get_with_auth("/api/v1/auth/session", Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], false);
}
